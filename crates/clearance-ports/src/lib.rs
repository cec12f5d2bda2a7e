//! # clearance-ports — External Collaborators
//!
//! The clearance engine talks to four things it does not own:
//!
//! | Port | Trait | Local implementation |
//! |------|-------|----------------------|
//! | Document storage | [`DocumentStore`] | [`InMemoryDocumentStore`] |
//! | Payment gateway | [`PaymentGateway`] | [`HmacPaymentGateway`] |
//! | Email / notification | [`Notifier`] | [`LogNotifier`], [`RecordingNotifier`] |
//! | Change notification | [`ChangeBus`] | [`BroadcastChangeBus`] |
//!
//! ## Architecture
//!
//! Every trait is synchronous, `Send + Sync`, and object-safe so the
//! engine can hold `Arc<dyn Trait>` and tests can swap implementations.
//! Production deployments implement the traits against their vendor APIs.

pub mod change_bus;
pub mod document_store;
pub mod error;
pub mod notifier;
pub mod payment;

pub use change_bus::{
    BroadcastChangeBus, ChangeBus, ChangeEvent, ChangeKind, ChangeSubscription, ChangeTable,
};
pub use document_store::{DocumentReference, DocumentStore, InMemoryDocumentStore, SignedUrl};
pub use error::PortError;
pub use notifier::{LogNotifier, Notification, Notifier, RecordingNotifier};
pub use payment::{sign_with_secret, GatewayOrder, HmacPaymentGateway, PaymentGateway};

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `message` under `key`.
pub(crate) fn hmac_hex(key: &[u8], message: &[u8]) -> Result<String, PortError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).map_err(|e| PortError::Configuration {
        reason: format!("invalid HMAC key: {e}"),
    })?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time comparison of two hex signatures.
pub(crate) fn signatures_match(provided: &str, expected: &str) -> bool {
    use subtle::ConstantTimeEq;
    let provided = provided.trim().to_ascii_lowercase();
    if provided.len() != expected.len() {
        return false;
    }
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_hex_matches_rfc4231_case_2() {
        let digest = hmac_hex(b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            digest,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn signatures_match_ignores_case() {
        assert!(signatures_match("ABCDEF", "abcdef"));
        assert!(!signatures_match("abcde", "abcdef"));
        assert!(!signatures_match("abcdee", "abcdef"));
    }
}
