use fleet_events_service::extractor;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

fn build_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (path, bytes) in entries {
        writer.start_file(*path, FileOptions::default()).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A representative slicer archive with every metadata source populated.
fn full_archive() -> Vec<u8> {
    let slice_info = br#"<?xml version="1.0" encoding="UTF-8"?>
<config>
  <metadata key="prediction" value="9240"/>
  <metadata key="weight" value="45.67"/>
  <metadata key="filament_length" value="15.3"/>
  <metadata key="filament_type" value="PETG"/>
  <metadata key="layer_count" value="418"/>
</config>
"#;
    let project_settings = br#"{
  "printer_settings_id": "X1C-0.4",
  "nozzle_diameter": "0.4",
  "curr_bed_type": "cool_plate",
  "default_print_profile": "0.16mm Optimal @X1C",
  "unrelated": "ignored"
}
"#;
    let model_settings =
        br#"<config><object id="1"/><object id="2"/></config>"#;
    let model = br#"<model><resources>
<object id="1" type="model"/>
<object id="2" type="model"/>
<object id="3" type="model"/>
</resources></model>"#;

    build_archive(&[
        ("Metadata/slice_info.config", slice_info.as_slice()),
        ("Metadata/project_settings.config", project_settings.as_slice()),
        ("Metadata/model_settings.config", model_settings.as_slice()),
        ("3D/3dmodel.model", model.as_slice()),
        ("Metadata/plate_1.png", b"\x89PNG fake".as_slice()),
    ])
}

#[test]
fn full_archive_yields_every_field() {
    let extracted = extractor::extract(&full_archive());
    let meta = &extracted.metadata;

    assert_eq!(meta.print_time_seconds, Some(9240));
    assert_eq!(meta.filament_weight_grams, Some(45.67));
    assert_eq!(meta.filament_length_meters, Some(15.3));
    assert_eq!(meta.filament_type.as_deref(), Some("PETG"));
    assert_eq!(meta.layer_count, Some(418));
    assert_eq!(meta.printer_model_id.as_deref(), Some("X1C-0.4"));
    assert_eq!(meta.nozzle_diameter, Some(0.4));
    assert_eq!(meta.curr_bed_type.as_deref(), Some("cool_plate"));
    assert_eq!(
        meta.default_print_profile.as_deref(),
        Some("0.16mm Optimal @X1C")
    );
    // Model document lists three objects, plate settings only two.
    assert_eq!(meta.object_count, Some(3));

    let thumbnail = extracted.thumbnail.expect("thumbnail present");
    assert_eq!(thumbnail.bytes, b"\x89PNG fake");
    assert_eq!(thumbnail.content_type, "image/png");
}

#[test]
fn extraction_is_idempotent_over_the_same_bytes() {
    let archive = full_archive();
    assert_eq!(extractor::extract(&archive), extractor::extract(&archive));
}

#[test]
fn empty_archive_yields_all_null_metadata() {
    let archive = build_archive(&[("README.txt", b"nothing to see".as_slice())]);
    let extracted = extractor::extract(&archive);

    assert_eq!(extracted.metadata, Default::default());
    assert!(extracted.thumbnail.is_none());
}

#[test]
fn truncated_archive_degrades_instead_of_failing() {
    let mut archive = full_archive();
    archive.truncate(archive.len() / 3);

    // Whatever survives truncation must still come back as a value, not
    // an error; a fully unreadable archive is simply all-null.
    let _ = extractor::extract(&archive);
    let garbage = extractor::extract(b"\x00\x01\x02\x03");
    assert_eq!(garbage.metadata, Default::default());
    assert!(garbage.thumbnail.is_none());
}
