/// Printer status repository - current-status table written by the
/// print-events consumer and read to warm tenant broadcast caches.
use crate::error::AppResult;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn upsert_status(
    pool: &PgPool,
    tenant_id: Uuid,
    printer_id: &str,
    frame: &serde_json::Value,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO printer_statuses (tenant_id, printer_id, status, updated_at) \
         VALUES ($1, $2, $3, now()) \
         ON CONFLICT (tenant_id, printer_id) \
         DO UPDATE SET status = EXCLUDED.status, updated_at = now()",
    )
    .bind(tenant_id)
    .bind(printer_id)
    .bind(frame)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn latest_statuses(
    pool: &PgPool,
    tenant_id: Uuid,
) -> AppResult<Vec<(String, serde_json::Value)>> {
    let rows = sqlx::query_as::<_, (String, serde_json::Value)>(
        "SELECT printer_id, status FROM printer_statuses WHERE tenant_id = $1",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn append_job_event(
    pool: &PgPool,
    tenant_id: Uuid,
    job_id: &str,
    payload: &serde_json::Value,
) -> AppResult<()> {
    sqlx::query("INSERT INTO job_events (tenant_id, job_id, payload) VALUES ($1, $2, $3)")
        .bind(tenant_id)
        .bind(job_id)
        .bind(payload)
        .execute(pool)
        .await?;

    Ok(())
}
