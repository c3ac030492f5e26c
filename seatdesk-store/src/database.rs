use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::{error, info};

use seatdesk_core::BookingError;

use crate::app_config::DatabaseConfig;

/// Explicitly constructed pool handle. Cloning shares the pool.
#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(&config.url)
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

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

pub(crate) const EXCLUSION_VIOLATION: &str = "23P01";
pub(crate) const FOREIGN_KEY_VIOLATION: &str = "23503";

/// SQLSTATE of a database-side error, if there is one.
pub(crate) fn sql_state(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

/// Anything the ledger cannot classify is a transient storage failure.
pub(crate) fn storage_error(err: sqlx::Error) -> BookingError {
    error!("Storage error: {}", err);
    BookingError::StorageUnavailable(err.to_string())
}
