pub mod dead_letter_repo;
pub mod hub_repo;
pub mod print_file_repo;
pub mod printer_repo;

use crate::error::AppError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub async fn init_pool(database_url: &str) -> Result<PgPool, AppError> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|e| AppError::Database(format!("connect: {e}")))
}
