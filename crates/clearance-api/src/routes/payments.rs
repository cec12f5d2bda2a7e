//! # Payment API
//!
//! - **POST `/v1/shipments/:id/payments/orders`**: open a checkout for the
//!   payment due in the current status
//! - **POST `/v1/shipments/:id/payments/confirm`**: verify the gateway
//!   callback and take the transition it pays for
//! - **GET `/v1/shipments/:id/payments`**: orders and confirmed records
//!
//! Confirming the same callback twice returns the current shipment without
//! a second record.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use clearance_ports::GatewayOrder;
use clearance_state::{GatewayCallback, PaymentKind, PaymentOrder, PaymentRecord};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, shipment_id, Validate};
use crate::routes::shipments::ShipmentResponse;
use crate::state::AppState;

// -- Request / Response types ---------------------------------------------------

/// Request to open a checkout.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    /// `shipping`, `duty`, `return_charges` or `destruction_charges`.
    #[schema(value_type = String)]
    pub kind: PaymentKind,
}

/// Callback fields posted back by the gateway's checkout.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmPaymentRequest {
    pub order_id: String,
    pub payment_id: String,
    /// Hex HMAC-SHA256 over `order_id|payment_id`.
    pub signature: String,
}

impl Validate for ConfirmPaymentRequest {
    fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("order_id", &self.order_id),
            ("payment_id", &self.payment_id),
            ("signature", &self.signature),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} must not be empty"));
            }
        }
        Ok(())
    }
}

impl From<ConfirmPaymentRequest> for GatewayCallback {
    fn from(req: ConfirmPaymentRequest) -> Self {
        Self {
            order_id: req.order_id,
            payment_id: req.payment_id,
            signature: req.signature,
        }
    }
}

/// An opened checkout.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    /// Amount breakdown as stored on the shipment.
    #[schema(value_type = Object)]
    pub order: PaymentOrder,
    /// What the client passes to the checkout widget.
    #[schema(value_type = Object)]
    pub gateway_order: GatewayOrder,
}

/// Payment ledger of a shipment.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentsResponse {
    #[schema(value_type = Vec<Object>)]
    pub orders: Vec<PaymentOrder>,
    #[schema(value_type = Vec<Object>)]
    pub records: Vec<PaymentRecord>,
}

// -- Router -------------------------------------------------------------------

/// Build the payment router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/shipments/:id/payments", get(list_payments))
        .route("/v1/shipments/:id/payments/orders", post(create_order))
        .route("/v1/shipments/:id/payments/confirm", post(confirm_payment))
}

// -- Handlers -----------------------------------------------------------------

/// POST /v1/shipments/:id/payments/orders: open a checkout.
#[utoipa::path(
    post,
    path = "/v1/shipments/{id}/payments/orders",
    params(("id" = u64, Path, description = "Shipment id")),
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Checkout opened", body = CheckoutResponse),
        (status = 403, description = "Caller does not pay this kind", body = crate::error::ErrorBody),
        (status = 409, description = "Not due now, or already paid", body = crate::error::ErrorBody),
        (status = 410, description = "Payment window closed; shipment aborted", body = crate::error::ErrorBody),
        (status = 502, description = "Gateway failure", body = crate::error::ErrorBody),
    ),
    tag = "payments"
)]
pub async fn create_order(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    let id = shipment_id(&id)?;
    let req = extract_json(body)?;
    let result = state
        .engine
        .create_payment_order(&caller.session, id, req.kind);
    // Orders and aborts both change the aggregate.
    state.persist(id).await?;
    let checkout = result?;
    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order: checkout.order,
            gateway_order: checkout.gateway_order,
        }),
    ))
}

/// POST /v1/shipments/:id/payments/confirm: verify a gateway callback.
#[utoipa::path(
    post,
    path = "/v1/shipments/{id}/payments/confirm",
    params(("id" = u64, Path, description = "Shipment id")),
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 200, description = "Payment recorded and transition taken", body = ShipmentResponse),
        (status = 402, description = "Signature did not verify", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown order", body = crate::error::ErrorBody),
        (status = 409, description = "A different payment is already recorded", body = crate::error::ErrorBody),
        (status = 410, description = "Payment window closed; shipment aborted", body = crate::error::ErrorBody),
    ),
    tag = "payments"
)]
pub async fn confirm_payment(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<ConfirmPaymentRequest>, JsonRejection>,
) -> Result<Json<ShipmentResponse>, AppError> {
    let id = shipment_id(&id)?;
    let req = extract_validated_json(body)?;
    let result = state
        .engine
        .confirm_payment(&caller.session, id, req.into());
    state.persist(id).await?;
    Ok(Json(result?.into()))
}

/// GET /v1/shipments/:id/payments: orders and records.
#[utoipa::path(
    get,
    path = "/v1/shipments/{id}/payments",
    params(("id" = u64, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "Payment ledger", body = PaymentsResponse),
        (status = 404, description = "Shipment not found", body = crate::error::ErrorBody),
    ),
    tag = "payments"
)]
pub async fn list_payments(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<PaymentsResponse>, AppError> {
    let id = shipment_id(&id)?;
    let shipment = state.engine.get(&caller.session, id)?;
    Ok(Json(PaymentsResponse {
        orders: shipment.payments.orders().to_vec(),
        records: shipment.payments.records().to_vec(),
    }))
}
