//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Clearance API",
        version = "0.3.0",
        description = "Cross-border parcel clearance: shipment lifecycle, documents, payments with late-fee escalation, and duty quotes.",
        license(name = "BUSL-1.1")
    ),
    paths(
        // Shipments
        crate::routes::shipments::create_shipment,
        crate::routes::shipments::list_shipments,
        crate::routes::shipments::get_shipment,
        crate::routes::shipments::view_shipment,
        crate::routes::shipments::get_timeline,
        crate::routes::shipments::correct_parties,
        crate::routes::shipments::list_transitions,
        // Transitions
        crate::routes::transitions::transition,
        // Documents
        crate::routes::documents::create_requirements,
        crate::routes::documents::list_documents,
        crate::routes::documents::submit_document,
        crate::routes::documents::withdraw_document,
        crate::routes::documents::document_url,
        // Payments
        crate::routes::payments::create_order,
        crate::routes::payments::confirm_payment,
        crate::routes::payments::list_payments,
        // Quotes and charges
        crate::routes::quotes::quote_shipping,
        crate::routes::quotes::quote_duty,
        crate::routes::quotes::get_charges,
        crate::routes::quotes::assess_charges,
        // Maintenance
        crate::routes::maintenance::enforce_all,
        crate::routes::maintenance::enforce_one,
        crate::routes::maintenance::metrics,
    ),
    components(schemas(
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // Shipment DTOs
        crate::routes::shipments::CreateShipmentRequest,
        crate::routes::shipments::CorrectPartiesRequest,
        crate::routes::shipments::ShipmentResponse,
        crate::routes::shipments::ShipmentListResponse,
        crate::routes::shipments::ShipmentViewResponse,
        crate::routes::shipments::TimelineResponse,
        crate::routes::shipments::TransitionEntry,
        crate::routes::shipments::TransitionTableResponse,
        // Transition DTOs
        crate::routes::transitions::TransitionRequest,
        // Document DTOs
        crate::routes::documents::CreateRequirementsRequest,
        crate::routes::documents::DocumentsResponse,
        crate::routes::documents::SubmissionResponse,
        crate::routes::documents::DocumentUrlResponse,
        // Payment DTOs
        crate::routes::payments::CreateOrderRequest,
        crate::routes::payments::ConfirmPaymentRequest,
        crate::routes::payments::CheckoutResponse,
        crate::routes::payments::PaymentsResponse,
        // Quote DTOs
        crate::routes::quotes::ShippingQuoteResponse,
        crate::routes::quotes::DutyQuoteResponse,
        crate::routes::quotes::ChargesResponse,
        crate::routes::quotes::AssessChargesRequest,
        // Maintenance DTOs
        crate::routes::maintenance::SweepResponse,
        crate::middleware::metrics::MetricsSnapshot,
    )),
    tags(
        (name = "shipments", description = "Booking, reads and corrections"),
        (name = "transitions", description = "Lifecycle transitions, one endpoint per target status"),
        (name = "documents", description = "Document requirements and submissions"),
        (name = "payments", description = "Gateway checkout and confirmation"),
        (name = "quotes", description = "Shipping, duty and charge quotes"),
        (name = "maintenance", description = "Timeout enforcement and counters"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
