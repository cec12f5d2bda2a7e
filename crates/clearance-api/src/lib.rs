//! # clearance-api: Axum API for the Clearance Engine
//!
//! HTTP surface over [`clearance_state::ClearanceEngine`]. Handlers turn the
//! bearer token into a `Session`, call the engine, write the result through
//! to Postgres when configured, and map engine errors to status codes.
//!
//! ## API Surface
//!
//! | Prefix                               | Module                    |
//! |--------------------------------------|---------------------------|
//! | `/v1/shipments`, `/v1/transitions`   | [`routes::shipments`]     |
//! | `/v1/shipments/:id/status-*`         | [`routes::transitions`]   |
//! | `/v1/shipments/:id/documents/*`      | [`routes::documents`]     |
//! | `/v1/shipments/:id/payments/*`       | [`routes::payments`]      |
//! | `/v1/shipments/:id/quotes/*`, `charges` | [`routes::quotes`]     |
//! | `/v1/maintenance/*`                  | [`routes::maintenance`]   |
//! | `/v1/files/*` (signed, no token)     | [`routes::documents`]     |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Generated via utoipa derive macros, served at `/openapi.json`.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes, `/metrics` and signed file downloads are mounted outside
/// the auth middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = state.metrics.clone();

    let api = Router::new()
        .merge(routes::shipments::router())
        .merge(routes::transitions::router())
        .merge(routes::documents::router())
        .merge(routes::payments::router())
        .merge(routes::quotes::router())
        .merge(routes::maintenance::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(metrics))
        .with_state(state.clone());

    let public = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(prometheus_metrics))
        .merge(routes::documents::files_router())
        .with_state(state);

    Router::new().merge(public).merge(api)
}

/// Liveness probe: 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Prometheus text exposition. The shipment gauge is refreshed from the
/// repository on each scrape.
async fn prometheus_metrics(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<String, error::AppError> {
    state
        .metrics
        .observe_shipments(&state.engine.repository().list());
    state.metrics.gather_and_encode().map_err(error::AppError::Internal)
}

/// Readiness probe: 200 once the database (if any) answers.
async fn readiness(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<&'static str, error::AppError> {
    if let Some(pool) = &state.db_pool {
        sqlx::query("SELECT 1")
            .execute(pool)
            .await
            .map_err(|e| error::AppError::Internal(format!("database not ready: {e}")))?;
    }
    Ok("ready")
}
