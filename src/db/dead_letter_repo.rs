/// Dead letter repository - durable log of permanently failed messages.
use crate::error::AppResult;
use crate::queue::DeadLetterMessage;
use sqlx::PgPool;

pub async fn insert(pool: &PgPool, msg: &DeadLetterMessage) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO dead_letters (original_queue, payload, reason, attempts) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(&msg.original_queue)
    .bind(&msg.payload)
    .bind(&msg.reason)
    .bind(msg.attempts as i32)
    .execute(pool)
    .await?;

    Ok(())
}
