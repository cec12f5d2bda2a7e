//! # Transition API
//!
//! One endpoint per target status:
//!
//! ```text
//! PUT /v1/shipments/:id/status-hs-approved
//! PUT /v1/shipments/:id/status-document-uploaded
//! ...
//! PUT /v1/shipments/:id/status-aborted
//! ```
//!
//! The body is optional. It carries whatever evidence the edge needs: a
//! reason, a classification for HS approval, a requirement batch for a
//! documents hold, or the gateway callback for a paid edge. The engine
//! picks the rule from the shipment's current status and the target.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::put;
use axum::{Json, Router};
use clearance_state::{
    Classification, DocumentRequest, GatewayCallback, ShipmentStatus, TransitionEvidence,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{json_or_default, shipment_id};
use crate::routes::shipments::ShipmentResponse;
use crate::state::AppState;

/// Evidence for a transition. Every field is optional.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct TransitionRequest {
    /// Recorded on the status event; also the hold reason for a documents hold.
    pub reason: Option<String>,
    /// New classification for HS approval or correction.
    #[schema(value_type = Option<Object>)]
    pub classification: Option<Classification>,
    /// Requirements to open with a documents hold.
    #[schema(value_type = Vec<Object>)]
    pub document_requests: Vec<DocumentRequest>,
    /// Gateway callback for payment-gated edges.
    #[schema(value_type = Option<Object>)]
    pub payment: Option<GatewayCallback>,
}

impl From<TransitionRequest> for TransitionEvidence {
    fn from(req: TransitionRequest) -> Self {
        Self {
            reason: req.reason,
            classification: req.classification,
            document_requests: req.document_requests,
            payment: req.payment,
        }
    }
}

/// Statuses that can be requested over HTTP. `Created` is only ever the
/// result of booking.
pub fn requestable_statuses() -> impl Iterator<Item = ShipmentStatus> {
    ShipmentStatus::ALL
        .into_iter()
        .filter(|s| *s != ShipmentStatus::Created)
}

/// Build the transition router: one `PUT` route per requestable status.
pub fn router() -> Router<AppState> {
    let mut router = Router::new();
    for target in requestable_statuses() {
        let path = format!("/v1/shipments/:id/status-{}", target.slug());
        router = router.route(
            &path,
            put(
                move |state: State<AppState>,
                      caller: CallerIdentity,
                      Path(id): Path<String>,
                      body: Bytes| async move {
                    transition(state, caller, id, target, body).await
                },
            ),
        );
    }
    router
}

/// PUT /v1/shipments/:id/status-{target}: request a transition.
#[utoipa::path(
    put,
    path = "/v1/shipments/{id}/status-{target}",
    params(
        ("id" = u64, Path, description = "Shipment id"),
        ("target" = String, Path, description = "Target status slug, e.g. `hs-approved`"),
    ),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Transition committed", body = ShipmentResponse),
        (status = 402, description = "Gateway signature did not verify", body = crate::error::ErrorBody),
        (status = 403, description = "Caller may not take this edge", body = crate::error::ErrorBody),
        (status = 409, description = "No such edge, or a concurrent write won", body = crate::error::ErrorBody),
        (status = 410, description = "Payment window closed; shipment aborted", body = crate::error::ErrorBody),
        (status = 422, description = "A gate is not satisfied", body = crate::error::ErrorBody),
    ),
    tag = "transitions"
)]
pub async fn transition(
    State(state): State<AppState>,
    caller: CallerIdentity,
    id: String,
    target: ShipmentStatus,
    body: Bytes,
) -> Result<Json<ShipmentResponse>, AppError> {
    let id = shipment_id(&id)?;
    let req: TransitionRequest = json_or_default(&body)?;
    let result = state
        .engine
        .request_transition(&caller.session, id, target, req.into());
    // A closed payment window aborts the shipment even though the request fails.
    state.persist(id).await?;
    Ok(Json(result?.into()))
}
