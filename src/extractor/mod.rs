//! Metadata extraction for uploaded container archives.
//!
//! The archives are zip containers produced by slicers; the entries we
//! care about are small text/XML files plus a pre-rendered thumbnail.
//! Extraction is a total function over the raw bytes: a corrupt archive
//! or a missing entry degrades to `None` fields, never to an error.

use crate::models::PrintFileMetadata;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::io::{Cursor, Read};

const SLICE_INFO_PATH: &str = "Metadata/slice_info.config";
const PROJECT_SETTINGS_PATH: &str = "Metadata/project_settings.config";
const MODEL_SETTINGS_PATH: &str = "Metadata/model_settings.config";
const MODEL_PATH: &str = "3D/3dmodel.model";

/// Probed in order; the first entry present wins.
const THUMBNAIL_CANDIDATES: [&str; 4] = [
    "Metadata/plate_1.png",
    "Metadata/thumbnail.png",
    "thumbnail.png",
    "3D/Thumbnails/thumbnail.png",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedContent {
    pub metadata: PrintFileMetadata,
    pub thumbnail: Option<Thumbnail>,
}

/// Slicers disagree on config syntax, so one pattern per key has to
/// tolerate `key = value`, `key: value` and `key="..." value="..."`
/// shapes. The capture stops at the first character that cannot belong
/// to a bare scalar.
static KEY_PATTERNS: Lazy<HashMap<&'static str, Regex>> = Lazy::new(|| {
    let keys = [
        "prediction",
        "weight",
        "filament_length",
        "filament_type",
        "layer_count",
        "printer_settings_id",
        "nozzle_diameter",
        "curr_bed_type",
    ];
    keys.into_iter()
        .map(|key| {
            let pattern = format!(
                r#"(?mi)\b{key}\b\s*"?\s*(?:value\s*=\s*)?"?\s*[:=]?\s*"?([A-Za-z0-9_.+-]+)"#
            );
            (key, Regex::new(&pattern).unwrap_or_else(|e| panic!("bad pattern for {key}: {e}")))
        })
        .collect()
});

/// Free-text values (profile names contain spaces) capture the rest of
/// the line instead of a bare scalar.
static PRINT_PROFILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?mi)\bdefault_print_profile\b\s*"?\s*(?:value\s*=\s*)?"?\s*[:=]?\s*"?(.+)"#)
        .unwrap_or_else(|e| panic!("bad print profile pattern: {e}"))
});

static OBJECT_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<object[\s>]").unwrap_or_else(|e| panic!("bad object pattern: {e}"))
});

static OBJECT_WITH_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<object[^>]*\bid\s*="#)
        .unwrap_or_else(|e| panic!("bad object id pattern: {e}"))
});

/// Extracts print metadata and a thumbnail from a container archive.
pub fn extract(bytes: &[u8]) -> ExtractedContent {
    let Some(entries) = unpack(bytes) else {
        return ExtractedContent::default();
    };

    let slice_info = text_entry(&entries, SLICE_INFO_PATH);
    let project_settings = text_entry(&entries, PROJECT_SETTINGS_PATH);

    let metadata = PrintFileMetadata {
        print_time_seconds: scalar(slice_info.as_deref(), "prediction"),
        filament_weight_grams: scalar(slice_info.as_deref(), "weight"),
        filament_length_meters: scalar(slice_info.as_deref(), "filament_length"),
        filament_type: scalar(slice_info.as_deref(), "filament_type"),
        layer_count: scalar(slice_info.as_deref(), "layer_count"),
        printer_model_id: scalar(project_settings.as_deref(), "printer_settings_id"),
        nozzle_diameter: scalar(project_settings.as_deref(), "nozzle_diameter"),
        curr_bed_type: scalar(project_settings.as_deref(), "curr_bed_type"),
        default_print_profile: print_profile(project_settings.as_deref()),
        object_count: object_count(&entries),
    };

    let thumbnail = THUMBNAIL_CANDIDATES.iter().find_map(|path| {
        entries.get(*path).map(|bytes| Thumbnail {
            bytes: bytes.clone(),
            content_type: "image/png",
        })
    });

    ExtractedContent {
        metadata,
        thumbnail,
    }
}

/// Unzips into path -> bytes. `None` when the archive itself is
/// unreadable; individually corrupt entries are skipped.
fn unpack(bytes: &[u8]) -> Option<HashMap<String, Vec<u8>>> {
    let mut archive = match zip::ZipArchive::new(Cursor::new(bytes)) {
        Ok(archive) => archive,
        Err(e) => {
            tracing::warn!(error = %e, "container archive is not a readable zip");
            return None;
        }
    };

    let mut entries = HashMap::new();
    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping unreadable archive entry");
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let mut buf = Vec::with_capacity(entry.size() as usize);
        if let Err(e) = entry.read_to_end(&mut buf) {
            tracing::warn!(entry = %name, error = %e, "skipping truncated archive entry");
            continue;
        }
        entries.insert(name, buf);
    }
    Some(entries)
}

fn text_entry(entries: &HashMap<String, Vec<u8>>, path: &str) -> Option<String> {
    entries
        .get(path)
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
}

fn scalar<T: std::str::FromStr>(text: Option<&str>, key: &str) -> Option<T> {
    let text = text?;
    let pattern = KEY_PATTERNS.get(key)?;
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn print_profile(text: Option<&str>) -> Option<String> {
    let captured = PRINT_PROFILE.captures(text?)?.get(1)?.as_str();
    let trimmed = captured
        .trim_end()
        .trim_end_matches(['"', '/', '>', ',', ';'])
        .trim_end();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Plate layouts and the model document can disagree on object count
/// (unsliced plates, helper geometry); the larger of the two is the one
/// users expect to see.
fn object_count(entries: &HashMap<String, Vec<u8>>) -> Option<i32> {
    let from_settings = text_entry(entries, MODEL_SETTINGS_PATH)
        .map(|text| OBJECT_MARKER.find_iter(&text).count());
    let from_model =
        text_entry(entries, MODEL_PATH).map(|text| OBJECT_WITH_ID.find_iter(&text).count());

    // Neither source file present means "unknown", not zero; a present
    // but empty file is a confirmed zero.
    let count = from_settings.into_iter().chain(from_model).max()?;
    Some(count as i32)
}
