//! # Request/Response Tracing
//!
//! `tower_http::trace::TraceLayer` with spans carrying method and path.

use axum::extract::Request;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Span constructor for one request.
pub type SpanFn = fn(&Request) -> tracing::Span;

fn make_span(request: &Request) -> tracing::Span {
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
    )
}

/// Build the trace layer for the clearance API.
pub fn layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, SpanFn> {
    TraceLayer::new_for_http()
        .make_span_with(make_span as SpanFn)
        .on_response(DefaultOnResponse::new().level(Level::INFO))
}
