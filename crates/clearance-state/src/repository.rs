//! # Shipment Repository
//!
//! Versioned storage for shipment aggregates. Writes are conditional on the
//! version the writer read, so two writers racing from the same snapshot
//! get exactly one success.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use clearance_core::ShipmentId;
use parking_lot::RwLock;

use crate::error::ClearanceError;
use crate::shipment::Shipment;

/// Storage for shipment aggregates.
pub trait ShipmentRepository: Send + Sync {
    /// Reserve a fresh identifier.
    fn next_id(&self) -> ShipmentId;

    /// Store a new shipment. Fails if the id is taken.
    fn insert(&self, shipment: Shipment) -> Result<(), ClearanceError>;

    /// Current snapshot.
    fn get(&self, id: ShipmentId) -> Option<Shipment>;

    /// Every shipment, ordered by id.
    fn list(&self) -> Vec<Shipment>;

    /// Replace the stored shipment if its version is still `expected_version`.
    fn compare_and_swap(&self, expected_version: u64, shipment: Shipment)
        -> Result<(), ClearanceError>;
}

/// Process-local repository.
#[derive(Debug)]
pub struct InMemoryShipmentRepository {
    shipments: RwLock<BTreeMap<ShipmentId, Shipment>>,
    next_id: AtomicU64,
}

impl Default for InMemoryShipmentRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryShipmentRepository {
    /// Empty repository; ids start at 1.
    pub fn new() -> Self {
        Self {
            shipments: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Load persisted shipments, e.g. from the database at startup.
    pub fn hydrate(&self, shipments: impl IntoIterator<Item = Shipment>) -> usize {
        let mut map = self.shipments.write();
        let mut count = 0;
        for shipment in shipments {
            self.next_id
                .fetch_max(shipment.id.get() + 1, Ordering::SeqCst);
            map.insert(shipment.id, shipment);
            count += 1;
        }
        count
    }

    /// Number of stored shipments.
    pub fn len(&self) -> usize {
        self.shipments.read().len()
    }

    /// Whether the repository is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ShipmentRepository for InMemoryShipmentRepository {
    fn next_id(&self) -> ShipmentId {
        ShipmentId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn insert(&self, shipment: Shipment) -> Result<(), ClearanceError> {
        let mut map = self.shipments.write();
        if map.contains_key(&shipment.id) {
            return Err(ClearanceError::StaleState {
                id: shipment.id,
                expected: 0,
            });
        }
        map.insert(shipment.id, shipment);
        Ok(())
    }

    fn get(&self, id: ShipmentId) -> Option<Shipment> {
        self.shipments.read().get(&id).cloned()
    }

    fn list(&self) -> Vec<Shipment> {
        self.shipments.read().values().cloned().collect()
    }

    fn compare_and_swap(
        &self,
        expected_version: u64,
        shipment: Shipment,
    ) -> Result<(), ClearanceError> {
        let mut map = self.shipments.write();
        let stored = map
            .get_mut(&shipment.id)
            .ok_or(ClearanceError::NotFound { id: shipment.id })?;
        if stored.version != expected_version {
            return Err(ClearanceError::StaleState {
                id: shipment.id,
                expected: expected_version,
            });
        }
        *stored = shipment;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipment::fixtures::draft;
    use clearance_core::{DutyMode, Timestamp};
    use std::sync::Arc;

    fn shipment(repo: &InMemoryShipmentRepository) -> Shipment {
        Shipment::new(
            repo.next_id(),
            "acct-1",
            draft(DutyMode::Ddp),
            Timestamp::parse("2026-01-01T00:00:00Z").unwrap(),
        )
    }

    #[test]
    fn ids_are_sequential() {
        let repo = InMemoryShipmentRepository::new();
        assert_eq!(repo.next_id(), ShipmentId(1));
        assert_eq!(repo.next_id(), ShipmentId(2));
    }

    #[test]
    fn insert_twice_rejected() {
        let repo = InMemoryShipmentRepository::new();
        let s = shipment(&repo);
        repo.insert(s.clone()).unwrap();
        assert!(repo.insert(s).is_err());
    }

    #[test]
    fn cas_detects_stale_writer() {
        let repo = InMemoryShipmentRepository::new();
        let s = shipment(&repo);
        repo.insert(s.clone()).unwrap();

        let mut a = s.clone();
        a.version = 2;
        let mut b = s.clone();
        b.version = 2;
        repo.compare_and_swap(1, a).unwrap();
        let err = repo.compare_and_swap(1, b).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(repo.get(s.id).unwrap().version, 2);
    }

    #[test]
    fn cas_on_missing_is_not_found() {
        let repo = InMemoryShipmentRepository::new();
        let s = shipment(&repo);
        assert!(matches!(
            repo.compare_and_swap(1, s),
            Err(ClearanceError::NotFound { .. })
        ));
    }

    #[test]
    fn hydrate_advances_ids() {
        let source = InMemoryShipmentRepository::new();
        let mut s = shipment(&source);
        s.id = ShipmentId(41);
        let repo = InMemoryShipmentRepository::new();
        assert_eq!(repo.hydrate(vec![s]), 1);
        assert_eq!(repo.next_id(), ShipmentId(42));
        assert_eq!(repo.list().len(), 1);
    }

    #[test]
    fn repository_trait_behind_arc() {
        let repo: Arc<dyn ShipmentRepository> = Arc::new(InMemoryShipmentRepository::new());
        assert!(repo.list().is_empty());
    }
}
