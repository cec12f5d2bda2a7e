//! # Change Bus
//!
//! Row-change events for live views. Every committed mutation publishes one
//! event; subscribers may filter to a single shipment. Slow subscribers
//! drop events rather than stall publishers.

use clearance_core::ShipmentId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Which collection changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    /// Shipment rows.
    Shipments,
    /// Document requirements and submissions.
    Documents,
    /// Payment orders and records.
    Payments,
}

/// What happened to the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    /// New row.
    Insert,
    /// Changed row.
    Update,
    /// Removed row.
    Delete,
}

/// One published change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Shipment the row belongs to.
    pub shipment_id: ShipmentId,
    /// Collection that changed.
    pub table: ChangeTable,
    /// Kind of change.
    pub event: ChangeKind,
    /// Row snapshot after the change.
    pub row: serde_json::Value,
    /// Shipment version after the change.
    pub version: u64,
}

/// Publisher side of the change feed.
pub trait ChangeBus: Send + Sync {
    /// Publish an event. Never blocks and never fails the caller.
    fn publish(&self, event: ChangeEvent);
}

/// In-process change bus backed by a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastChangeBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for BroadcastChangeBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl BroadcastChangeBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to all events, or to one shipment's events.
    pub fn subscribe(&self, shipment: Option<ShipmentId>) -> ChangeSubscription {
        ChangeSubscription {
            receiver: self.sender.subscribe(),
            shipment,
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl ChangeBus for BroadcastChangeBus {
    fn publish(&self, event: ChangeEvent) {
        // Err only means nobody is listening.
        let _ = self.sender.send(event);
    }
}

/// Receiving side of a [`BroadcastChangeBus`].
#[derive(Debug)]
pub struct ChangeSubscription {
    receiver: broadcast::Receiver<ChangeEvent>,
    shipment: Option<ShipmentId>,
}

impl ChangeSubscription {
    fn wanted(&self, event: &ChangeEvent) -> bool {
        self.shipment.map_or(true, |id| id == event.shipment_id)
    }

    /// Next buffered matching event, if any, without waiting.
    pub fn try_next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.wanted(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "change subscriber lagged");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }

    /// Wait for the next matching event. `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.wanted(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "change subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn event(id: u64, version: u64) -> ChangeEvent {
        ChangeEvent {
            shipment_id: ShipmentId(id),
            table: ChangeTable::Shipments,
            event: ChangeKind::Update,
            row: serde_json::json!({ "id": id }),
            version,
        }
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = BroadcastChangeBus::new(4);
        bus.publish(event(1, 1));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn filtered_subscription_skips_other_shipments() {
        let bus = BroadcastChangeBus::new(8);
        let mut all = bus.subscribe(None);
        let mut only_two = bus.subscribe(Some(ShipmentId(2)));
        bus.publish(event(1, 1));
        bus.publish(event(2, 5));

        assert_eq!(all.try_next().unwrap().shipment_id, ShipmentId(1));
        assert_eq!(all.try_next().unwrap().shipment_id, ShipmentId(2));
        assert!(all.try_next().is_none());

        let got = only_two.try_next().unwrap();
        assert_eq!(got.version, 5);
        assert!(only_two.try_next().is_none());
    }

    #[test]
    fn lagged_subscriber_recovers() {
        let bus = BroadcastChangeBus::new(2);
        let mut sub = bus.subscribe(None);
        for v in 0..5 {
            bus.publish(event(1, v));
        }
        let first = sub.try_next().unwrap();
        assert!(first.version >= 3);
    }

    #[tokio::test]
    async fn async_recv_delivers() {
        let bus = BroadcastChangeBus::default();
        let mut sub = bus.subscribe(Some(ShipmentId(7)));
        let publisher = bus.clone();
        tokio::spawn(async move {
            publisher.publish(event(6, 1));
            publisher.publish(event(7, 2));
        });
        let got = sub.recv().await.unwrap();
        assert_eq!(got.shipment_id, ShipmentId(7));
    }

    #[test]
    fn event_serializes_uppercase_kind() {
        let json = serde_json::to_value(event(3, 9)).unwrap();
        assert_eq!(json["event"], "UPDATE");
        assert_eq!(json["table"], "shipments");
        assert_eq!(json["shipment_id"], 3);
    }

    #[test]
    fn bus_trait_behind_arc() {
        let bus: Arc<dyn ChangeBus> = Arc::new(BroadcastChangeBus::new(1));
        bus.publish(event(1, 1));
    }
}
