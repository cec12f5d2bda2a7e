//! Shipment persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `shipments` table.
//! Lifecycle rules are enforced by the engine, not in SQL.

use chrono::{DateTime, Utc};
use clearance_core::{ShipmentId, Timestamp};
use clearance_state::{Shipment, ShipmentStatus};
use sqlx::PgPool;

use super::PersistenceError;

fn to_i64(field: &'static str, value: u64) -> Result<i64, PersistenceError> {
    i64::try_from(value).map_err(|_| PersistenceError::OutOfRange {
        field,
        value: i128::from(value),
    })
}

fn to_u64(field: &'static str, value: i64) -> Result<u64, PersistenceError> {
    u64::try_from(value).map_err(|_| PersistenceError::OutOfRange {
        field,
        value: i128::from(value),
    })
}

/// Insert or advance a shipment row. Returns `false` when the stored row
/// already has the same or a newer version.
pub async fn upsert(pool: &PgPool, shipment: &Shipment) -> Result<bool, PersistenceError> {
    let id = to_i64("id", shipment.id.get())?;
    let version = to_i64("version", shipment.version)?;
    let aggregate = serde_json::to_value(shipment)?;
    let created_at: DateTime<Utc> = *shipment.created_at.as_datetime();
    let updated_at: DateTime<Utc> = *shipment.updated_at.as_datetime();

    let result = sqlx::query(
        "INSERT INTO shipments (id, status, version, owner_account, receiver_email, aggregate, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (id) DO UPDATE SET
             status = EXCLUDED.status,
             version = EXCLUDED.version,
             owner_account = EXCLUDED.owner_account,
             receiver_email = EXCLUDED.receiver_email,
             aggregate = EXCLUDED.aggregate,
             updated_at = EXCLUDED.updated_at
         WHERE shipments.version < EXCLUDED.version",
    )
    .bind(id)
    .bind(shipment.status.as_str())
    .bind(version)
    .bind(&shipment.owner_account)
    .bind(shipment.receiver.email.as_str())
    .bind(&aggregate)
    .bind(created_at)
    .bind(updated_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load every shipment, for hydrating the in-memory repository on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Shipment>, PersistenceError> {
    let rows = sqlx::query_as::<_, ShipmentRow>(
        "SELECT id, status, version, aggregate, updated_at FROM shipments ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ShipmentRow::into_shipment).collect()
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct ShipmentRow {
    id: i64,
    status: String,
    version: i64,
    aggregate: serde_json::Value,
    updated_at: DateTime<Utc>,
}

impl ShipmentRow {
    /// Decode the aggregate. The scalar columns win over the JSON copy if
    /// they ever disagree.
    fn into_shipment(self) -> Result<Shipment, PersistenceError> {
        let mut shipment: Shipment = serde_json::from_value(self.aggregate)?;
        shipment.id = ShipmentId(to_u64("id", self.id)?);
        shipment.version = to_u64("version", self.version)?;
        shipment.status = ShipmentStatus::from_name(&self.status)
            .ok_or(PersistenceError::UnknownStatus(self.status))?;
        shipment.updated_at = Timestamp::from_utc(self.updated_at);
        Ok(shipment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_conversion_rejects_overflow() {
        assert_eq!(to_i64("version", 7).unwrap(), 7);
        assert!(matches!(
            to_i64("version", u64::MAX),
            Err(PersistenceError::OutOfRange { field: "version", .. })
        ));
        assert!(to_u64("id", -1).is_err());
    }
}
