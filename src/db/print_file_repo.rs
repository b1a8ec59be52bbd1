/// Print file repository - file records and their extracted metadata.
use crate::error::AppResult;
use crate::models::{PrintFile, PrintFileMetadata};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn get(pool: &PgPool, file_id: Uuid) -> AppResult<Option<PrintFile>> {
    let file = sqlx::query_as::<_, PrintFile>(
        "SELECT id, tenant_id, storage_key, thumbnail_key FROM print_files WHERE id = $1",
    )
    .bind(file_id)
    .fetch_optional(pool)
    .await?;

    Ok(file)
}

/// Overwrites the extracted metadata on the file record. Re-running the
/// extractor for the same file is a pure overwrite, never a merge.
pub async fn store_metadata(
    pool: &PgPool,
    file_id: Uuid,
    metadata: &PrintFileMetadata,
    thumbnail_key: Option<&str>,
) -> AppResult<()> {
    sqlx::query(
        "UPDATE print_files SET \
            print_time_seconds = $2, \
            filament_weight_grams = $3, \
            filament_length_meters = $4, \
            filament_type = $5, \
            printer_model_id = $6, \
            nozzle_diameter = $7, \
            layer_count = $8, \
            curr_bed_type = $9, \
            default_print_profile = $10, \
            object_count = $11, \
            thumbnail_key = $12 \
         WHERE id = $1",
    )
    .bind(file_id)
    .bind(metadata.print_time_seconds)
    .bind(metadata.filament_weight_grams)
    .bind(metadata.filament_length_meters)
    .bind(metadata.filament_type.as_deref())
    .bind(metadata.printer_model_id.as_deref())
    .bind(metadata.nozzle_diameter)
    .bind(metadata.layer_count)
    .bind(metadata.curr_bed_type.as_deref())
    .bind(metadata.default_print_profile.as_deref())
    .bind(metadata.object_count)
    .bind(thumbnail_key)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn delete(pool: &PgPool, file_id: Uuid) -> AppResult<()> {
    sqlx::query("DELETE FROM print_files WHERE id = $1")
        .bind(file_id)
        .execute(pool)
        .await?;

    Ok(())
}
