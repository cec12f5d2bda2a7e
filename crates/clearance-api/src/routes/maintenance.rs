//! # Maintenance API
//!
//! - **POST `/v1/maintenance/enforce-timeouts`**: sweep every live shipment
//!   and abort those whose payment window has closed (agency)
//! - **POST `/v1/shipments/:id/enforce-timeouts`**: the same for one shipment
//! - **GET `/v1/maintenance/metrics`**: request totals as JSON (the full
//!   Prometheus exposition is at `/metrics`)
//!
//! The binary runs the sweep on an interval; these endpoints let an
//! operator trigger it.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use clearance_core::{Role, ShipmentId};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::shipment_id;
use crate::middleware::metrics::MetricsSnapshot;
use crate::state::AppState;

/// Result of a sweep.
#[derive(Debug, Serialize, ToSchema)]
pub struct SweepResponse {
    /// Shipments aborted by this sweep.
    #[schema(value_type = Vec<u64>)]
    pub aborted: Vec<ShipmentId>,
}

fn require_agency(caller: &CallerIdentity) -> Result<(), AppError> {
    if caller.session.role != Role::Agency {
        return Err(AppError::Forbidden(
            "only the agency may run maintenance".to_string(),
        ));
    }
    Ok(())
}

/// Build the maintenance router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/maintenance/enforce-timeouts", post(enforce_all))
        .route("/v1/shipments/:id/enforce-timeouts", post(enforce_one))
        .route("/v1/maintenance/metrics", get(metrics))
}

/// POST /v1/maintenance/enforce-timeouts
#[utoipa::path(
    post,
    path = "/v1/maintenance/enforce-timeouts",
    responses(
        (status = 200, description = "Sweep finished", body = SweepResponse),
        (status = 403, description = "Caller is not agency", body = crate::error::ErrorBody),
    ),
    tag = "maintenance"
)]
pub async fn enforce_all(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<SweepResponse>, AppError> {
    require_agency(&caller)?;
    let aborted = state.engine.enforce_all_timeouts();
    state.persist_all(&aborted).await;
    tracing::info!(officer = %caller.session.subject, count = aborted.len(), "manual timeout sweep");
    Ok(Json(SweepResponse { aborted }))
}

/// POST /v1/shipments/:id/enforce-timeouts
#[utoipa::path(
    post,
    path = "/v1/shipments/{id}/enforce-timeouts",
    params(("id" = u64, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "Checked; `aborted` is empty if still payable", body = SweepResponse),
        (status = 403, description = "Caller is not agency", body = crate::error::ErrorBody),
        (status = 404, description = "Shipment not found", body = crate::error::ErrorBody),
    ),
    tag = "maintenance"
)]
pub async fn enforce_one(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<SweepResponse>, AppError> {
    require_agency(&caller)?;
    let id = shipment_id(&id)?;
    let aborted: Vec<ShipmentId> = state
        .engine
        .enforce_timeouts(id)?
        .map(|s| s.id)
        .into_iter()
        .collect();
    state.persist_all(&aborted).await;
    Ok(Json(SweepResponse { aborted }))
}

/// GET /v1/maintenance/metrics
#[utoipa::path(
    get,
    path = "/v1/maintenance/metrics",
    responses(
        (status = 200, description = "Request counters", body = MetricsSnapshot),
    ),
    tag = "maintenance"
)]
pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
