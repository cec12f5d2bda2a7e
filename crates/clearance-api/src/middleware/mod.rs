//! # Middleware
//!
//! - `metrics` — Prometheus request counters and latency histogram.
//! - `tracing_layer` — `tower_http` request spans.

pub mod metrics;
pub mod tracing_layer;
