//! # Quote and Charge API
//!
//! - **GET `/v1/shipments/:id/quotes/shipping`**: shipping cost as of now
//! - **GET `/v1/shipments/:id/quotes/duty`**: duty, GST and fine as of now
//! - **GET `/v1/shipments/:id/charges`**: assessed return or destruction charges
//! - **POST `/v1/shipments/:id/charges`**: enter the charge sheet (agency)
//!
//! Quotes are computed from the clock on every read and never change the
//! shipment, even past the cancellation cutoff.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use clearance_fees::{ChargeLine, ChargeSheet, DutyAssessment, FeeAssessment};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, shipment_id, Validate};
use crate::routes::shipments::ShipmentResponse;
use crate::state::AppState;

/// Shipping assessment.
#[derive(Debug, Serialize, ToSchema)]
pub struct ShippingQuoteResponse {
    #[schema(value_type = Object)]
    pub quote: FeeAssessment,
}

/// Duty assessment.
#[derive(Debug, Serialize, ToSchema)]
pub struct DutyQuoteResponse {
    #[schema(value_type = Object)]
    pub quote: DutyAssessment,
}

/// Assessed charges, if any.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChargesResponse {
    #[schema(value_type = Option<Object>)]
    pub charges: Option<ChargeSheet>,
}

/// Itemized return or destruction charges.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssessChargesRequest {
    #[schema(value_type = Vec<Object>)]
    pub lines: Vec<ChargeLine>,
}

impl Validate for AssessChargesRequest {
    fn validate(&self) -> Result<(), String> {
        if self.lines.is_empty() {
            return Err("lines must not be empty".to_string());
        }
        Ok(())
    }
}

/// Build the quote router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/shipments/:id/quotes/shipping", get(quote_shipping))
        .route("/v1/shipments/:id/quotes/duty", get(quote_duty))
        .route(
            "/v1/shipments/:id/charges",
            get(get_charges).post(assess_charges),
        )
}

/// GET /v1/shipments/:id/quotes/shipping
#[utoipa::path(
    get,
    path = "/v1/shipments/{id}/quotes/shipping",
    params(("id" = u64, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "Shipping assessment", body = ShippingQuoteResponse),
        (status = 404, description = "Shipment not found", body = crate::error::ErrorBody),
    ),
    tag = "quotes"
)]
pub async fn quote_shipping(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<ShippingQuoteResponse>, AppError> {
    let id = shipment_id(&id)?;
    let quote = state.engine.quote_shipping(&caller.session, id)?;
    Ok(Json(ShippingQuoteResponse { quote }))
}

/// GET /v1/shipments/:id/quotes/duty
#[utoipa::path(
    get,
    path = "/v1/shipments/{id}/quotes/duty",
    params(("id" = u64, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "Duty assessment", body = DutyQuoteResponse),
        (status = 404, description = "Shipment not found", body = crate::error::ErrorBody),
    ),
    tag = "quotes"
)]
pub async fn quote_duty(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<DutyQuoteResponse>, AppError> {
    let id = shipment_id(&id)?;
    let quote = state.engine.quote_duty(&caller.session, id)?;
    Ok(Json(DutyQuoteResponse { quote }))
}

/// GET /v1/shipments/:id/charges
#[utoipa::path(
    get,
    path = "/v1/shipments/{id}/charges",
    params(("id" = u64, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "Assessed charges", body = ChargesResponse),
        (status = 404, description = "Shipment not found", body = crate::error::ErrorBody),
    ),
    tag = "quotes"
)]
pub async fn get_charges(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<ChargesResponse>, AppError> {
    let id = shipment_id(&id)?;
    let charges = state.engine.quote_charges(&caller.session, id)?;
    Ok(Json(ChargesResponse { charges }))
}

/// POST /v1/shipments/:id/charges: enter the charge sheet once.
#[utoipa::path(
    post,
    path = "/v1/shipments/{id}/charges",
    params(("id" = u64, Path, description = "Shipment id")),
    request_body = AssessChargesRequest,
    responses(
        (status = 200, description = "Charges assessed", body = ShipmentResponse),
        (status = 403, description = "Caller is not agency", body = crate::error::ErrorBody),
        (status = 409, description = "Charges already assessed", body = crate::error::ErrorBody),
        (status = 422, description = "Not in a return or destruction request, or invalid lines", body = crate::error::ErrorBody),
    ),
    tag = "quotes"
)]
pub async fn assess_charges(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<AssessChargesRequest>, JsonRejection>,
) -> Result<Json<ShipmentResponse>, AppError> {
    let id = shipment_id(&id)?;
    let req = extract_validated_json(body)?;
    let shipment = state
        .engine
        .assess_charges(&caller.session, id, req.lines)?;
    state.persist(id).await?;
    Ok(Json(shipment.into()))
}
