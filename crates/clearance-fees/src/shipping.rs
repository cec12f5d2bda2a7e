//! # Shipping Tariff
//!
//! Base shipping cost before escalation: a flat fee plus a per-kilogram
//! rate on chargeable weight. Chargeable weight rounds up to the next
//! whole kilogram with a one-kilogram minimum.

use clearance_core::Amount;
use serde::{Deserialize, Serialize};

use crate::error::FeeError;

/// Flat-plus-weight shipping tariff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingTariff {
    /// Charged once per shipment.
    pub base_fee: Amount,
    /// Charged per chargeable kilogram.
    pub per_kg: Amount,
}

impl Default for ShippingTariff {
    fn default() -> Self {
        Self {
            base_fee: Amount::from_minor(50_000),
            per_kg: Amount::from_minor(25_000),
        }
    }
}

impl ShippingTariff {
    /// Reject negative parameters.
    pub fn validate(&self) -> Result<(), FeeError> {
        if self.base_fee.is_negative() || self.per_kg.is_negative() {
            return Err(FeeError::InvalidTariff {
                reason: "base_fee and per_kg must not be negative".to_string(),
            });
        }
        Ok(())
    }

    /// Whole kilograms charged for `weight_grams`.
    pub fn chargeable_kg(weight_grams: u64) -> u64 {
        weight_grams.div_ceil(1_000).max(1)
    }

    /// Base shipping cost for a parcel.
    pub fn quote(&self, weight_grams: u64) -> Result<Amount, FeeError> {
        let kg = i64::try_from(Self::chargeable_kg(weight_grams))
            .map_err(|_| FeeError::Overflow { what: "weight" })?;
        self.per_kg
            .minor()
            .checked_mul(kg)
            .and_then(|w| w.checked_add(self.base_fee.minor()))
            .map(Amount::from_minor)
            .ok_or(FeeError::Overflow { what: "shipping cost" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chargeable_weight_rounds_up() {
        assert_eq!(ShippingTariff::chargeable_kg(0), 1);
        assert_eq!(ShippingTariff::chargeable_kg(1), 1);
        assert_eq!(ShippingTariff::chargeable_kg(1_000), 1);
        assert_eq!(ShippingTariff::chargeable_kg(1_001), 2);
        assert_eq!(ShippingTariff::chargeable_kg(12_500), 13);
    }

    #[test]
    fn default_tariff_quote() {
        // 500.00 + 3 × 250.00
        let cost = ShippingTariff::default().quote(2_400).unwrap();
        assert_eq!(cost, Amount::from_minor(125_000));
    }

    #[test]
    fn overflow_reported() {
        let tariff = ShippingTariff {
            base_fee: Amount::ZERO,
            per_kg: Amount::from_minor(i64::MAX),
        };
        assert!(tariff.quote(5_000).is_err());
    }

    #[test]
    fn negative_tariff_rejected() {
        let tariff = ShippingTariff {
            base_fee: Amount::from_minor(-1),
            ..ShippingTariff::default()
        };
        assert!(tariff.validate().is_err());
    }
}
