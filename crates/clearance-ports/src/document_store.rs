//! # Document Store
//!
//! Object storage for uploaded clearance documents. Every upload gets its
//! own object under `shipments/{id}/{document}/{upload}`, so a later round
//! asking for the same document never replaces an earlier one.
//! Reads go through short-lived signed URLs rather than raw bytes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use clearance_core::{Clock, DocumentName, ShipmentId, Timestamp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::PortError;
use crate::{hmac_hex, signatures_match};

/// Opaque storage reference returned by [`DocumentStore::put_document`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentReference(pub String);

impl DocumentReference {
    /// Borrow the reference string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Time-limited download URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUrl {
    /// The URL to fetch.
    pub url: String,
    /// When the URL stops working.
    pub expires_at: Timestamp,
}

/// Storage backend for clearance documents.
pub trait DocumentStore: Send + Sync {
    /// Store `bytes` as a new object for `(shipment_id, name)`.
    fn put_document(
        &self,
        shipment_id: ShipmentId,
        name: &DocumentName,
        bytes: &[u8],
    ) -> Result<DocumentReference, PortError>;

    /// Mint a signed download URL for a stored object.
    fn get_document(&self, reference: &DocumentReference) -> Result<SignedUrl, PortError>;

    /// Delete one stored object. Deleting a missing object succeeds.
    fn delete_document(&self, reference: &DocumentReference) -> Result<(), PortError>;

    /// Human-readable name of this implementation.
    fn store_name(&self) -> &str;
}

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Arc<Vec<u8>>,
    sha256: String,
    stored_at: Timestamp,
}

/// Process-local document store with HMAC-signed URLs.
///
/// URLs have the form `{base_url}/{reference}?expires={epoch}&signature={hex}`
/// where the signature covers `reference|expires`.
pub struct InMemoryDocumentStore {
    objects: RwLock<HashMap<DocumentReference, StoredObject>>,
    signing_key: Zeroizing<Vec<u8>>,
    base_url: String,
    url_ttl_secs: i64,
    max_bytes: usize,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("objects", &self.objects.read().len())
            .field("signing_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("url_ttl_secs", &self.url_ttl_secs)
            .finish()
    }
}

impl InMemoryDocumentStore {
    /// Default URL lifetime: fifteen minutes.
    pub const DEFAULT_TTL_SECS: i64 = 900;

    /// Default per-object size cap: 10 MiB.
    pub const DEFAULT_MAX_BYTES: usize = 10 * 1024 * 1024;

    /// Create a store signing URLs with `signing_key`.
    pub fn new(
        base_url: impl Into<String>,
        signing_key: impl Into<Vec<u8>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            signing_key: Zeroizing::new(signing_key.into()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            url_ttl_secs: Self::DEFAULT_TTL_SECS,
            max_bytes: Self::DEFAULT_MAX_BYTES,
            clock,
        }
    }

    /// Override the URL lifetime.
    pub fn with_ttl_secs(mut self, ttl: i64) -> Self {
        self.url_ttl_secs = ttl;
        self
    }

    /// Override the per-object size cap.
    pub fn with_max_bytes(mut self, max: usize) -> Self {
        self.max_bytes = max;
        self
    }

    /// Fresh storage key for one upload of a document.
    pub fn reference_for(shipment_id: ShipmentId, name: &DocumentName) -> DocumentReference {
        DocumentReference(format!(
            "shipments/{}/{}/{}",
            shipment_id,
            name.slug(),
            uuid::Uuid::new_v4().simple()
        ))
    }

    /// Raw bytes of a stored object.
    pub fn read(&self, reference: &DocumentReference) -> Option<Arc<Vec<u8>>> {
        self.objects.read().get(reference).map(|o| Arc::clone(&o.bytes))
    }

    /// Hex SHA-256 of a stored object.
    pub fn digest(&self, reference: &DocumentReference) -> Option<String> {
        self.objects.read().get(reference).map(|o| o.sha256.clone())
    }

    /// When an object was last written.
    pub fn stored_at(&self, reference: &DocumentReference) -> Option<Timestamp> {
        self.objects.read().get(reference).map(|o| o.stored_at)
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check a signed URL's parameters against the current time.
    pub fn verify_signature(&self, reference: &str, expires: i64, signature: &str) -> bool {
        if self.clock.now().epoch_secs() > expires {
            return false;
        }
        match self.sign(reference, expires) {
            Ok(expected) => signatures_match(signature, &expected),
            Err(_) => false,
        }
    }

    fn sign(&self, reference: &str, expires: i64) -> Result<String, PortError> {
        hmac_hex(&self.signing_key, format!("{reference}|{expires}").as_bytes())
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn put_document(
        &self,
        shipment_id: ShipmentId,
        name: &DocumentName,
        bytes: &[u8],
    ) -> Result<DocumentReference, PortError> {
        if bytes.is_empty() {
            return Err(PortError::Storage {
                reason: "document is empty".to_string(),
            });
        }
        if bytes.len() > self.max_bytes {
            return Err(PortError::Storage {
                reason: format!(
                    "document is {} bytes, limit is {}",
                    bytes.len(),
                    self.max_bytes
                ),
            });
        }
        let reference = Self::reference_for(shipment_id, name);
        let object = StoredObject {
            bytes: Arc::new(bytes.to_vec()),
            sha256: hex::encode(Sha256::digest(bytes)),
            stored_at: self.clock.now(),
        };
        self.objects.write().insert(reference.clone(), object);
        tracing::debug!(%shipment_id, document = %name, %reference, size = bytes.len(), "document stored");
        Ok(reference)
    }

    fn get_document(&self, reference: &DocumentReference) -> Result<SignedUrl, PortError> {
        if !self.objects.read().contains_key(reference) {
            return Err(PortError::NotFound {
                reference: reference.0.clone(),
            });
        }
        let expires_at = self.clock.now().plus_secs(self.url_ttl_secs);
        let expires = expires_at.epoch_secs();
        let signature = self.sign(reference.as_str(), expires)?;
        Ok(SignedUrl {
            url: format!(
                "{}/{}?expires={}&signature={}",
                self.base_url, reference, expires, signature
            ),
            expires_at,
        })
    }

    fn delete_document(&self, reference: &DocumentReference) -> Result<(), PortError> {
        if self.objects.write().remove(reference).is_some() {
            tracing::debug!(%reference, "document deleted");
        }
        Ok(())
    }

    fn store_name(&self) -> &str {
        "InMemoryDocumentStore"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearance_core::ManualClock;

    fn clock() -> ManualClock {
        ManualClock::new(Timestamp::parse("2026-02-01T09:00:00Z").unwrap())
    }

    fn store(clock: &ManualClock) -> InMemoryDocumentStore {
        InMemoryDocumentStore::new(
            "https://docs.local/",
            b"url-signing-key".to_vec(),
            Arc::new(clock.clone()),
        )
    }

    fn invoice() -> DocumentName {
        DocumentName::new("Commercial Invoice").unwrap()
    }

    #[test]
    fn put_then_read() {
        let clock = clock();
        let store = store(&clock);
        let reference = store.put_document(ShipmentId(9), &invoice(), b"%PDF-1.7").unwrap();
        assert!(reference.as_str().starts_with("shipments/9/commercial-invoice/"));
        assert_eq!(store.read(&reference).unwrap().as_slice(), b"%PDF-1.7");
        assert_eq!(store.digest(&reference).unwrap().len(), 64);
    }

    #[test]
    fn uploads_of_same_name_are_kept_apart() {
        let clock = clock();
        let store = store(&clock);
        let first = store.put_document(ShipmentId(1), &invoice(), b"v1").unwrap();
        let second = store.put_document(ShipmentId(1), &invoice(), b"v2").unwrap();
        assert_ne!(first, second);
        assert_eq!(store.len(), 2);
        assert_eq!(store.read(&first).unwrap().as_slice(), b"v1");
        assert_eq!(store.read(&second).unwrap().as_slice(), b"v2");

        store.delete_document(&first).unwrap();
        assert!(store.read(&first).is_none());
        assert_eq!(store.read(&second).unwrap().as_slice(), b"v2");
    }

    #[test]
    fn empty_and_oversized_rejected() {
        let clock = clock();
        let store = store(&clock).with_max_bytes(4);
        assert!(store.put_document(ShipmentId(1), &invoice(), b"").is_err());
        assert!(store.put_document(ShipmentId(1), &invoice(), b"12345").is_err());
    }

    #[test]
    fn signed_url_verifies_until_expiry() {
        let clock = clock();
        let store = store(&clock).with_ttl_secs(60);
        let reference = store.put_document(ShipmentId(3), &invoice(), b"data").unwrap();
        let signed = store.get_document(&reference).unwrap();
        assert!(signed
            .url
            .starts_with(&format!("https://docs.local/{reference}?expires=")));

        let signature = signed.url.rsplit("signature=").next().unwrap();
        let expires = signed.expires_at.epoch_secs();
        assert!(store.verify_signature(reference.as_str(), expires, signature));
        assert!(!store.verify_signature("shipments/3/other", expires, signature));

        clock.advance_secs(61);
        assert!(!store.verify_signature(reference.as_str(), expires, signature));
    }

    #[test]
    fn get_missing_is_not_found() {
        let clock = clock();
        let store = store(&clock);
        let err = store
            .get_document(&DocumentReference("shipments/1/nope".into()))
            .unwrap_err();
        assert!(matches!(err, PortError::NotFound { .. }));
    }

    #[test]
    fn delete_is_idempotent() {
        let clock = clock();
        let store = store(&clock);
        let reference = store.put_document(ShipmentId(1), &invoice(), b"x").unwrap();
        store.delete_document(&reference).unwrap();
        store.delete_document(&reference).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn debug_redacts_key() {
        let clock = clock();
        let rendered = format!("{:?}", store(&clock));
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("url-signing-key"));
    }

    #[test]
    fn store_trait_is_object_safe() {
        let clock = clock();
        let store: Arc<dyn DocumentStore> = Arc::new(store(&clock));
        assert_eq!(store.store_name(), "InMemoryDocumentStore");
    }
}
