//! # Notifier
//!
//! Best-effort messages to parties. A failed notification never fails the
//! operation that triggered it; callers log and continue.

use std::sync::atomic::{AtomicBool, Ordering};

use clearance_core::ShipmentId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// A message that was handed to a notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Recipient address.
    pub to: String,
    /// Shipment the message concerns.
    pub shipment_id: ShipmentId,
    /// Message body.
    pub message: String,
}

/// Outbound notification channel.
pub trait Notifier: Send + Sync {
    /// Deliver `message` to `to`. Returns `false` when delivery failed.
    fn notify(&self, to: &str, shipment_id: ShipmentId, message: &str) -> bool;

    /// Human-readable name of this implementation.
    fn notifier_name(&self) -> &str;
}

/// Writes notifications to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, to: &str, shipment_id: ShipmentId, message: &str) -> bool {
        tracing::info!(%shipment_id, to, message, "notification");
        true
    }

    fn notifier_name(&self) -> &str {
        "LogNotifier"
    }
}

/// Keeps every notification in memory. Can be switched to fail.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of delivered notifications.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    /// Notifications delivered to `to`.
    pub fn sent_to(&self, to: &str) -> Vec<Notification> {
        self.sent
            .lock()
            .iter()
            .filter(|n| n.to == to)
            .cloned()
            .collect()
    }

    /// Make subsequent deliveries fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, to: &str, shipment_id: ShipmentId, message: &str) -> bool {
        if self.failing.load(Ordering::SeqCst) {
            return false;
        }
        self.sent.lock().push(Notification {
            to: to.to_string(),
            shipment_id,
            message: message.to_string(),
        });
        true
    }

    fn notifier_name(&self) -> &str {
        "RecordingNotifier"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn recording_notifier_records() {
        let n = RecordingNotifier::new();
        assert!(n.notify("a@example.com", ShipmentId(1), "hello"));
        assert!(n.notify("b@example.com", ShipmentId(1), "world"));
        assert_eq!(n.sent().len(), 2);
        assert_eq!(n.sent_to("a@example.com")[0].message, "hello");
    }

    #[test]
    fn failing_notifier_drops() {
        let n = RecordingNotifier::new();
        n.set_failing(true);
        assert!(!n.notify("a@example.com", ShipmentId(1), "hello"));
        assert!(n.sent().is_empty());
        n.set_failing(false);
        assert!(n.notify("a@example.com", ShipmentId(1), "hello"));
    }

    #[test]
    fn log_notifier_always_succeeds() {
        assert!(LogNotifier.notify("a@example.com", ShipmentId(2), "x"));
    }

    #[test]
    fn notifier_trait_behind_arc() {
        let n: Arc<dyn Notifier> = Arc::new(RecordingNotifier::new());
        assert_eq!(n.notifier_name(), "RecordingNotifier");
    }
}
