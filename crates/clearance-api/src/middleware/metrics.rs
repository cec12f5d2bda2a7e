//! # Prometheus Metrics
//!
//! Request counters and a latency histogram recorded by middleware, plus a
//! per-status shipment gauge refreshed on each `/metrics` scrape.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use clearance_state::{Shipment, ShipmentStatus};
use prometheus::core::Collector;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};
use serde::Serialize;
use utoipa::ToSchema;

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,
    shipments: IntGaugeVec,
}

/// Point-in-time request totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub client_errors: u64,
    pub server_errors: u64,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl ApiMetrics {
    /// Fresh registry with every collector registered.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("clearance_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "clearance_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )?;
        let http_errors_total = IntCounterVec::new(
            Opts::new(
                "clearance_http_errors_total",
                "Total HTTP errors (4xx and 5xx)",
            ),
            &["method", "path", "status"],
        )?;
        let shipments = IntGaugeVec::new(
            Opts::new("clearance_shipments", "Shipments by current status"),
            &["status"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_errors_total.clone()))?;
        registry.register(Box::new(shipments.clone()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                shipments,
            }),
        })
    }

    /// Request totals summed across labels.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut snapshot = MetricsSnapshot {
            requests: 0,
            client_errors: 0,
            server_errors: 0,
        };
        for family in self.inner.http_requests_total.collect() {
            for metric in family.get_metric() {
                let count = metric.get_counter().get_value() as u64;
                snapshot.requests += count;
                let status = metric
                    .get_label()
                    .iter()
                    .find(|l| l.get_name() == "status")
                    .map(|l| l.get_value());
                match status.and_then(|s| s.chars().next()) {
                    Some('4') => snapshot.client_errors += count,
                    Some('5') => snapshot.server_errors += count,
                    _ => {}
                }
            }
        }
        snapshot
    }

    /// Reset the shipment gauge to the statuses in `shipments`.
    pub fn observe_shipments<'a>(&self, shipments: impl IntoIterator<Item = &'a Shipment>) {
        let gauge = &self.inner.shipments;
        for status in ShipmentStatus::ALL {
            gauge.with_label_values(&[status.as_str()]).set(0);
        }
        for shipment in shipments {
            gauge.with_label_values(&[shipment.status.as_str()]).inc();
        }
    }

    /// Gather every collector in Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
        if status.starts_with('4') || status.starts_with('5') {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status])
                .inc();
        }
    }
}

/// Replace shipment ids and document names with placeholders so label
/// cardinality stays bounded.
fn normalize_path(path: &str) -> String {
    let mut out = Vec::new();
    let mut after_documents = false;
    for segment in path.split('/') {
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            out.push(":id");
        } else if after_documents && segment != "requirements" && segment != "url" {
            out.push(":name");
        } else {
            out.push(segment);
        }
        after_documents = segment == "documents";
    }
    out.join("/")
}

/// Record method, normalized path, status and latency for every request.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let status = response.status().as_u16();
        m.record_request(&method, &path, status, start.elapsed().as_secs_f64());
    }

    response
}
