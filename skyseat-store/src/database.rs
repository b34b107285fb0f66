use skyseat_core::repository::StoreError;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

/// Postgres-backed inventory store. Multi-row commits run in a single
/// transaction and counter updates are relative (`available_seats + $n`), so
/// concurrent cancellations never lose an increment.
#[derive(Clone)]
pub struct PgInventoryStore {
    pub(crate) pool: Pool<Postgres>,
}

impl PgInventoryStore {
    pub fn new(db: &DbClient) -> Self {
        Self { pool: db.pool.clone() }
    }
}

pub(crate) fn backend(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate(db.message().to_string()),
        _ => StoreError::Backend(e.to_string()),
    }
}

pub(crate) fn corrupt(column: &str, value: &str) -> StoreError {
    StoreError::Backend(format!("unexpected {} value in database: {}", column, value))
}
