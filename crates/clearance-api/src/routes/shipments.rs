//! # Shipment API
//!
//! - **POST `/v1/shipments`**: book a shipment (senders)
//! - **GET `/v1/shipments`**: list shipments visible to the caller
//! - **GET `/v1/shipments/:id`**: snapshot with the caller's timeline
//! - **GET `/v1/shipments/:id/view`**: snapshot plus clock-derived facts
//! - **GET `/v1/shipments/:id/timeline`**: status history
//! - **PUT `/v1/shipments/:id/parties`**: correct contact details (agency)
//! - **GET `/v1/transitions`**: the lifecycle graph

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use clearance_core::{DutyMode, Party};
use clearance_state::{
    Classification, Goods, Shipment, ShipmentDraft, ShipmentStatus, ShipmentView, StatusEvent, TransitionRule,
    TRANSITIONS,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, shipment_id, Validate};
use crate::state::AppState;

// -- Request / Response types ---------------------------------------------------

/// Request to book a shipment.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateShipmentRequest {
    #[schema(value_type = Object)]
    pub sender: Party,
    #[schema(value_type = Object)]
    pub receiver: Party,
    /// `DDP` (sender pays duty) or `DAP` (receiver pays).
    #[schema(value_type = String)]
    pub duty_mode: DutyMode,
    #[schema(value_type = Object)]
    pub goods: Goods,
    /// Proposed origin and destination HS codes.
    #[schema(value_type = Object)]
    pub classification: Classification,
}

impl CreateShipmentRequest {
    fn into_draft(self) -> ShipmentDraft {
        ShipmentDraft {
            sender: self.sender,
            receiver: self.receiver,
            duty_mode: self.duty_mode,
            goods: self.goods,
            classification: self.classification,
        }
    }
}

impl Validate for CreateShipmentRequest {
    fn validate(&self) -> Result<(), String> {
        self.sender.validate().map_err(|e| format!("sender: {e}"))?;
        self.receiver.validate().map_err(|e| format!("receiver: {e}"))?;
        self.goods.validate().map_err(|e| format!("goods: {e}"))
    }
}

/// Request to correct party details. Omitted parties stay unchanged.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CorrectPartiesRequest {
    #[schema(value_type = Option<Object>)]
    pub sender: Option<Party>,
    #[schema(value_type = Option<Object>)]
    pub receiver: Option<Party>,
}

impl Validate for CorrectPartiesRequest {
    fn validate(&self) -> Result<(), String> {
        if self.sender.is_none() && self.receiver.is_none() {
            return Err("at least one of sender or receiver is required".to_string());
        }
        Ok(())
    }
}

/// A shipment aggregate.
#[derive(Debug, Serialize, ToSchema)]
pub struct ShipmentResponse {
    #[schema(value_type = Object)]
    pub shipment: Shipment,
}

impl From<Shipment> for ShipmentResponse {
    fn from(shipment: Shipment) -> Self {
        Self { shipment }
    }
}

/// Shipments visible to the caller.
#[derive(Debug, Serialize, ToSchema)]
pub struct ShipmentListResponse {
    #[schema(value_type = Vec<Object>)]
    pub shipments: Vec<Shipment>,
    pub count: usize,
}

/// A shipment with derived facts.
#[derive(Debug, Serialize, ToSchema)]
pub struct ShipmentViewResponse {
    #[schema(value_type = Object)]
    pub view: ShipmentView,
}

/// Status history as the caller may see it.
#[derive(Debug, Serialize, ToSchema)]
pub struct TimelineResponse {
    #[schema(value_type = Vec<Object>)]
    pub events: Vec<StatusEvent>,
}

/// One edge of the lifecycle graph.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransitionEntry {
    #[schema(value_type = String)]
    pub from: ShipmentStatus,
    #[schema(value_type = String)]
    pub to: ShipmentStatus,
    /// Endpoint that requests this edge.
    pub endpoint: String,
    #[schema(value_type = Object)]
    pub rule: TransitionRule,
}

/// The lifecycle graph.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransitionTableResponse {
    pub transitions: Vec<TransitionEntry>,
}

// -- Router -------------------------------------------------------------------

/// Build the shipment router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/shipments", post(create_shipment).get(list_shipments))
        .route("/v1/shipments/:id", get(get_shipment))
        .route("/v1/shipments/:id/view", get(view_shipment))
        .route("/v1/shipments/:id/timeline", get(get_timeline))
        .route("/v1/shipments/:id/parties", put(correct_parties))
        .route("/v1/transitions", get(list_transitions))
}

// -- Handlers -----------------------------------------------------------------

/// POST /v1/shipments: book a shipment.
#[utoipa::path(
    post,
    path = "/v1/shipments",
    request_body = CreateShipmentRequest,
    responses(
        (status = 201, description = "Shipment created", body = ShipmentResponse),
        (status = 403, description = "Caller is not a sender", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid draft", body = crate::error::ErrorBody),
    ),
    tag = "shipments"
)]
pub async fn create_shipment(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateShipmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ShipmentResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let shipment = state.engine.create_shipment(&caller.session, req.into_draft())?;
    state.persist(shipment.id).await?;
    Ok((StatusCode::CREATED, Json(shipment.into())))
}

/// GET /v1/shipments: list visible shipments.
#[utoipa::path(
    get,
    path = "/v1/shipments",
    responses(
        (status = 200, description = "Visible shipments", body = ShipmentListResponse),
    ),
    tag = "shipments"
)]
pub async fn list_shipments(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Json<ShipmentListResponse> {
    let shipments = state.engine.list(&caller.session);
    Json(ShipmentListResponse {
        count: shipments.len(),
        shipments,
    })
}

/// GET /v1/shipments/:id: fetch one shipment.
#[utoipa::path(
    get,
    path = "/v1/shipments/{id}",
    params(("id" = u64, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "Shipment found", body = ShipmentResponse),
        (status = 403, description = "Caller is not a party", body = crate::error::ErrorBody),
        (status = 404, description = "Shipment not found", body = crate::error::ErrorBody),
    ),
    tag = "shipments"
)]
pub async fn get_shipment(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<ShipmentResponse>, AppError> {
    let id = shipment_id(&id)?;
    Ok(Json(state.engine.get(&caller.session, id)?.into()))
}

/// GET /v1/shipments/:id/view: shipment with payment window and next steps.
///
/// Reading never enforces timeouts; an overdue window reports `abort_due`.
#[utoipa::path(
    get,
    path = "/v1/shipments/{id}/view",
    params(("id" = u64, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "Derived view", body = ShipmentViewResponse),
        (status = 404, description = "Shipment not found", body = crate::error::ErrorBody),
    ),
    tag = "shipments"
)]
pub async fn view_shipment(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<ShipmentViewResponse>, AppError> {
    let id = shipment_id(&id)?;
    let view = state.engine.view(&caller.session, id)?;
    Ok(Json(ShipmentViewResponse { view }))
}

/// GET /v1/shipments/:id/timeline: status history.
#[utoipa::path(
    get,
    path = "/v1/shipments/{id}/timeline",
    params(("id" = u64, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "Status events", body = TimelineResponse),
        (status = 404, description = "Shipment not found", body = crate::error::ErrorBody),
    ),
    tag = "shipments"
)]
pub async fn get_timeline(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<TimelineResponse>, AppError> {
    let id = shipment_id(&id)?;
    let events = state.engine.timeline(&caller.session, id)?;
    Ok(Json(TimelineResponse { events }))
}

/// PUT /v1/shipments/:id/parties: correct sender or receiver details.
#[utoipa::path(
    put,
    path = "/v1/shipments/{id}/parties",
    params(("id" = u64, Path, description = "Shipment id")),
    request_body = CorrectPartiesRequest,
    responses(
        (status = 200, description = "Parties updated", body = ShipmentResponse),
        (status = 403, description = "Caller is not agency", body = crate::error::ErrorBody),
        (status = 409, description = "Shipment is terminal", body = crate::error::ErrorBody),
    ),
    tag = "shipments"
)]
pub async fn correct_parties(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<CorrectPartiesRequest>, JsonRejection>,
) -> Result<Json<ShipmentResponse>, AppError> {
    let id = shipment_id(&id)?;
    let req = extract_validated_json(body)?;
    let shipment = state
        .engine
        .correct_parties(&caller.session, id, req.sender, req.receiver)?;
    state.persist(id).await?;
    Ok(Json(shipment.into()))
}

/// GET /v1/transitions: every legal edge with its actor and gates.
#[utoipa::path(
    get,
    path = "/v1/transitions",
    responses(
        (status = 200, description = "Lifecycle graph", body = TransitionTableResponse),
    ),
    tag = "shipments"
)]
pub async fn list_transitions() -> Json<TransitionTableResponse> {
    let transitions = TRANSITIONS
        .iter()
        .map(|rule| TransitionEntry {
            from: rule.from,
            to: rule.to,
            endpoint: format!("PUT /v1/shipments/{{id}}/status-{}", rule.to.slug()),
            rule: *rule,
        })
        .collect();
    Json(TransitionTableResponse { transitions })
}
