use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod services;

pub async fn init_pool(database_url: &str) -> sqlx::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}
