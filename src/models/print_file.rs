use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata extracted from an uploaded container archive.
///
/// Every field is independently nullable: `None` means the pattern was
/// absent from the archive, which is distinct from a confirmed zero.
/// Field names match the persisted/returned column names exactly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrintFileMetadata {
    pub print_time_seconds: Option<i64>,
    pub filament_weight_grams: Option<f64>,
    pub filament_length_meters: Option<f64>,
    pub filament_type: Option<String>,
    pub printer_model_id: Option<String>,
    pub nozzle_diameter: Option<f64>,
    pub layer_count: Option<i32>,
    pub curr_bed_type: Option<String>,
    pub default_print_profile: Option<String>,
    pub object_count: Option<i32>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PrintFile {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub storage_key: String,
    pub thumbnail_key: Option<String>,
}
