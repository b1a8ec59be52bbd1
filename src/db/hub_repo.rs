/// Hub repository - reads hub records and flips the online flag.
use crate::error::AppResult;
use crate::models::Hub;
use sqlx::PgPool;

pub async fn get(pool: &PgPool, hub_id: &str) -> AppResult<Option<Hub>> {
    let hub = sqlx::query_as::<_, Hub>(
        "SELECT id, tenant_id, secret_hash, is_online, claimed_at, last_seen_at \
         FROM hubs WHERE id = $1",
    )
    .bind(hub_id)
    .fetch_optional(pool)
    .await?;

    Ok(hub)
}

pub async fn set_online(pool: &PgPool, hub_id: &str, online: bool) -> AppResult<()> {
    sqlx::query("UPDATE hubs SET is_online = $2, last_seen_at = now() WHERE id = $1")
        .bind(hub_id)
        .bind(online)
        .execute(pool)
        .await?;

    Ok(())
}
