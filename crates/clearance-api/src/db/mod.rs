//! # Database Persistence Layer
//!
//! Optional Postgres write-through for shipment aggregates via SQLx.
//!
//! When `DATABASE_URL` is set, every committed mutation is upserted to the
//! `shipments` table and the in-memory repository is hydrated from it on
//! startup. When absent, the API runs in-memory only.
//!
//! The in-memory repository stays authoritative for version checks. The
//! table only ever moves forward: an upsert carrying an older version than
//! the stored row is ignored.

pub mod shipments;

use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;

/// Failures writing or reading persisted shipments.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Query or connection failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The aggregate could not be encoded or decoded.
    #[error("aggregate serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A numeric column does not fit the aggregate's type.
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: i128 },

    /// A stored status string is not a known status.
    #[error("unknown stored status: {0}")]
    UnknownStatus(String),
}

/// Initialize the connection pool and run migrations.
///
/// Returns `None` if `url` is `None` (in-memory-only mode).
pub async fn init_pool(url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = url else {
        tracing::warn!("DATABASE_URL not set, running in-memory only; state will not survive restarts");
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    Ok(Some(pool))
}
