//! # Payment Gateway
//!
//! Order creation and callback verification for hosted-checkout gateways.
//! The gateway signs `order_id|payment_id` with the merchant secret and the
//! client echoes the signature back; verification recomputes it.

use std::fmt;

use clearance_core::{Amount, ShipmentId, DEFAULT_CURRENCY};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::PortError;
use crate::{hmac_hex, signatures_match};

/// Order handed to the client to start checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    /// Gateway-assigned order identifier.
    pub order_id: String,
    /// Amount to collect.
    pub amount: Amount,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Merchant receipt reference.
    pub receipt: String,
    /// Public key id the client passes to the checkout widget.
    pub key_id: String,
}

/// Hosted payment gateway.
pub trait PaymentGateway: Send + Sync {
    /// Register an order for `amount`.
    fn create_order(
        &self,
        amount: Amount,
        shipment_id: ShipmentId,
        reference_tag: &str,
    ) -> Result<GatewayOrder, PortError>;

    /// Whether `signature` is the gateway's signature over the pair.
    fn verify(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;

    /// Human-readable name of this implementation.
    fn gateway_name(&self) -> &str;
}

/// Gateway that signs callbacks with HMAC-SHA256 under a shared secret.
pub struct HmacPaymentGateway {
    key_id: String,
    secret: Zeroizing<Vec<u8>>,
    currency: String,
}

impl fmt::Debug for HmacPaymentGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacPaymentGateway")
            .field("key_id", &self.key_id)
            .field("secret", &"[REDACTED]")
            .field("currency", &self.currency)
            .finish()
    }
}

impl HmacPaymentGateway {
    /// Create a gateway for merchant `key_id`.
    pub fn new(key_id: impl Into<String>, secret: impl Into<Vec<u8>>) -> Result<Self, PortError> {
        let secret = Zeroizing::new(secret.into());
        if secret.is_empty() {
            return Err(PortError::Configuration {
                reason: "gateway secret must not be empty".to_string(),
            });
        }
        Ok(Self {
            key_id: key_id.into(),
            secret,
            currency: DEFAULT_CURRENCY.to_string(),
        })
    }

    /// Override the collection currency.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Merchant key id.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Signature the gateway would send for a completed payment.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> Result<String, PortError> {
        sign_with_secret(&self.secret, order_id, payment_id)
    }
}

/// Compute a callback signature without constructing a gateway.
pub fn sign_with_secret(secret: &[u8], order_id: &str, payment_id: &str) -> Result<String, PortError> {
    hmac_hex(secret, format!("{order_id}|{payment_id}").as_bytes())
}

impl PaymentGateway for HmacPaymentGateway {
    fn create_order(
        &self,
        amount: Amount,
        shipment_id: ShipmentId,
        reference_tag: &str,
    ) -> Result<GatewayOrder, PortError> {
        if amount <= Amount::ZERO {
            return Err(PortError::Gateway {
                reason: format!("order amount must be positive, got {amount}"),
            });
        }
        let order_id = format!("order_{}", uuid::Uuid::new_v4().simple());
        tracing::info!(%shipment_id, %order_id, %amount, reference_tag, "gateway order created");
        Ok(GatewayOrder {
            order_id,
            amount,
            currency: self.currency.clone(),
            receipt: format!("shipment_{shipment_id}_{reference_tag}"),
            key_id: self.key_id.clone(),
        })
    }

    fn verify(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        if order_id.is_empty() || payment_id.is_empty() {
            return false;
        }
        match self.sign(order_id, payment_id) {
            Ok(expected) => signatures_match(signature, &expected),
            Err(_) => false,
        }
    }

    fn gateway_name(&self) -> &str {
        "HmacPaymentGateway"
    }
}
