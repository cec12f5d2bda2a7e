//! # Document API
//!
//! - **POST `/v1/shipments/:id/documents/requirements`**: add the batch for
//!   the current documents hold (agency)
//! - **GET `/v1/shipments/:id/documents`**: requirements, submissions, and
//!   what is still outstanding
//! - **PUT `/v1/shipments/:id/documents/:name`**: upload raw bytes against an
//!   open requirement (sender or receiver)
//! - **DELETE `/v1/shipments/:id/documents/:name`**: withdraw while the hold
//!   is open
//! - **GET `/v1/shipments/:id/documents/:name/url`**: signed download URL
//!
//! Signed URLs point at `/v1/files/*reference`, which [`files_router`]
//! serves without a bearer token; the signature is the credential.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use clearance_ports::{DocumentReference, SignedUrl};
use clearance_state::{
    DocumentCycle, DocumentRequest, DocumentRequirement, DocumentSubmission,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, shipment_id, Validate};
use crate::routes::shipments::ShipmentResponse;
use crate::state::AppState;

// -- Request / Response types ---------------------------------------------------

/// Requirement batch for the current hold.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRequirementsRequest {
    #[schema(value_type = Vec<Object>)]
    pub requests: Vec<DocumentRequest>,
}

impl Validate for CreateRequirementsRequest {
    fn validate(&self) -> Result<(), String> {
        if self.requests.is_empty() {
            return Err("requests must not be empty".to_string());
        }
        Ok(())
    }
}

/// Document state of a shipment.
#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentsResponse {
    #[schema(value_type = Option<Object>)]
    pub current_cycle: Option<DocumentCycle>,
    #[schema(value_type = Vec<Object>)]
    pub requirements: Vec<DocumentRequirement>,
    #[schema(value_type = Vec<Object>)]
    pub submissions: Vec<DocumentSubmission>,
    #[schema(value_type = Vec<Object>)]
    pub outstanding: Vec<DocumentRequirement>,
}

/// A stored submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionResponse {
    #[schema(value_type = Object)]
    pub submission: DocumentSubmission,
}

/// Time-limited download link.
#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentUrlResponse {
    pub url: String,
    #[schema(value_type = String)]
    pub expires_at: clearance_core::Timestamp,
}

impl From<SignedUrl> for DocumentUrlResponse {
    fn from(signed: SignedUrl) -> Self {
        Self {
            url: signed.url,
            expires_at: signed.expires_at,
        }
    }
}

/// Query parameters of a signed URL.
#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: i64,
    pub signature: String,
}

// -- Routers ------------------------------------------------------------------

/// Authenticated document routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/shipments/:id/documents/requirements",
            post(create_requirements),
        )
        .route("/v1/shipments/:id/documents", get(list_documents))
        .route(
            "/v1/shipments/:id/documents/:name",
            put(submit_document).delete(withdraw_document),
        )
        .route("/v1/shipments/:id/documents/:name/url", get(document_url))
}

/// Signed download routes, mounted outside the auth middleware.
pub fn files_router() -> Router<AppState> {
    Router::new().route("/v1/files/*reference", get(download))
}

// -- Handlers -----------------------------------------------------------------

/// POST /v1/shipments/:id/documents/requirements: request documents.
#[utoipa::path(
    post,
    path = "/v1/shipments/{id}/documents/requirements",
    params(("id" = u64, Path, description = "Shipment id")),
    request_body = CreateRequirementsRequest,
    responses(
        (status = 200, description = "Requirements created", body = ShipmentResponse),
        (status = 403, description = "Caller is not agency", body = crate::error::ErrorBody),
        (status = 409, description = "Batch already created for this hold", body = crate::error::ErrorBody),
        (status = 422, description = "No open documents hold", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub async fn create_requirements(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<CreateRequirementsRequest>, JsonRejection>,
) -> Result<Json<ShipmentResponse>, AppError> {
    let id = shipment_id(&id)?;
    let req = extract_validated_json(body)?;
    let shipment = state
        .engine
        .create_requirements(&caller.session, id, req.requests)?;
    state.persist(id).await?;
    Ok(Json(shipment.into()))
}

/// GET /v1/shipments/:id/documents: document state.
#[utoipa::path(
    get,
    path = "/v1/shipments/{id}/documents",
    params(("id" = u64, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "Document state", body = DocumentsResponse),
        (status = 404, description = "Shipment not found", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub async fn list_documents(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<DocumentsResponse>, AppError> {
    let id = shipment_id(&id)?;
    let shipment = state.engine.get(&caller.session, id)?;
    let ledger = &shipment.documents;
    Ok(Json(DocumentsResponse {
        current_cycle: ledger.current_cycle().copied(),
        requirements: ledger.requirements().to_vec(),
        submissions: ledger.submissions().to_vec(),
        outstanding: ledger.outstanding().into_iter().cloned().collect(),
    }))
}

/// PUT /v1/shipments/:id/documents/:name: upload a document.
#[utoipa::path(
    put,
    path = "/v1/shipments/{id}/documents/{name}",
    params(
        ("id" = u64, Path, description = "Shipment id"),
        ("name" = String, Path, description = "Requirement name"),
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "Document stored", body = SubmissionResponse),
        (status = 403, description = "Requested from the other party", body = crate::error::ErrorBody),
        (status = 404, description = "No open requirement by that name", body = crate::error::ErrorBody),
        (status = 409, description = "Already submitted", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub async fn submit_document(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((id, name)): Path<(String, String)>,
    body: Bytes,
) -> Result<(StatusCode, Json<SubmissionResponse>), AppError> {
    let id = shipment_id(&id)?;
    let submission = state
        .engine
        .submit_document(&caller.session, id, &name, &body)?;
    state.persist(id).await?;
    Ok((StatusCode::CREATED, Json(SubmissionResponse { submission })))
}

/// DELETE /v1/shipments/:id/documents/:name: withdraw a submission.
#[utoipa::path(
    delete,
    path = "/v1/shipments/{id}/documents/{name}",
    params(
        ("id" = u64, Path, description = "Shipment id"),
        ("name" = String, Path, description = "Requirement name"),
    ),
    responses(
        (status = 200, description = "Submission withdrawn", body = ShipmentResponse),
        (status = 404, description = "Nothing submitted under that name", body = crate::error::ErrorBody),
        (status = 409, description = "The hold has closed", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub async fn withdraw_document(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((id, name)): Path<(String, String)>,
) -> Result<Json<ShipmentResponse>, AppError> {
    let id = shipment_id(&id)?;
    let shipment = state.engine.withdraw_document(&caller.session, id, &name)?;
    state.persist(id).await?;
    Ok(Json(shipment.into()))
}

/// GET /v1/shipments/:id/documents/:name/url: signed download URL.
#[utoipa::path(
    get,
    path = "/v1/shipments/{id}/documents/{name}/url",
    params(
        ("id" = u64, Path, description = "Shipment id"),
        ("name" = String, Path, description = "Requirement name"),
    ),
    responses(
        (status = 200, description = "Signed URL", body = DocumentUrlResponse),
        (status = 404, description = "Nothing submitted under that name", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub async fn document_url(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((id, name)): Path<(String, String)>,
) -> Result<Json<DocumentUrlResponse>, AppError> {
    let id = shipment_id(&id)?;
    let signed = state.engine.document_url(&caller.session, id, &name)?;
    Ok(Json(signed.into()))
}

/// GET /v1/files/*reference: serve a stored object behind a signed URL.
pub async fn download(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    Query(query): Query<SignedQuery>,
) -> Result<Response, AppError> {
    let reference = reference.trim_start_matches('/');
    if !state
        .documents
        .verify_signature(reference, query.expires, &query.signature)
    {
        tracing::warn!(reference, "rejected document download: bad or expired signature");
        return Err(AppError::Forbidden("invalid or expired document link".into()));
    }
    let bytes = state
        .documents
        .read(&DocumentReference(reference.to_string()))
        .ok_or_else(|| AppError::NotFound(format!("document {reference}")))?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes.as_ref().clone(),
    )
        .into_response())
}
