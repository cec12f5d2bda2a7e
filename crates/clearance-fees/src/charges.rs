//! # Return & Destruction Charges
//!
//! When a parcel stuck in import clearance is sent back or destroyed, the
//! agency enters a sheet of named line items once. The total is flat; no
//! escalation applies.

use std::collections::HashSet;
use std::fmt;

use clearance_core::Amount;
use serde::{Deserialize, Serialize};

use crate::error::FeeError;

/// Which outcome the charges settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeKind {
    /// Return to sender.
    Return,
    /// Destruction under customs supervision.
    Destruction,
}

impl ChargeKind {
    /// Return the string representation of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Return => "return",
            Self::Destruction => "destruction",
        }
    }
}

impl fmt::Display for ChargeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named charge line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeItem {
    /// Return freight (RTO).
    ReturnFreight,
    /// Handling at origin and destination for the return leg.
    ReturnHandling,
    /// Storage or warehousing while held.
    Storage,
    /// Destination customs fees.
    DestinationCustoms,
    /// Re-export documentation.
    ReexportDocumentation,
    /// Demurrage or detention.
    Demurrage,
    /// Destruction fee.
    DestructionFee,
    /// Customs supervision of destruction.
    CustomsSupervision,
    /// Environmental or hazardous-material disposal.
    EnvironmentalHazard,
    /// Anything else levied locally.
    OtherLocal,
}

impl ChargeItem {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ReturnFreight => "Return Freight (RTO Freight)",
            Self::ReturnHandling => "Return Handling Fee",
            Self::Storage => "Storage / Warehousing",
            Self::DestinationCustoms => "Destination Customs Fees",
            Self::ReexportDocumentation => "Re-export Documentation Fee",
            Self::Demurrage => "Demurrage / Detention",
            Self::DestructionFee => "Destruction Fee",
            Self::CustomsSupervision => "Customs Supervision Fee",
            Self::EnvironmentalHazard => "Environmental / Hazard Fee",
            Self::OtherLocal => "Other Local Charges",
        }
    }

    /// Whether this line may appear on a sheet of `kind`.
    pub fn applies_to(&self, kind: ChargeKind) -> bool {
        match self {
            Self::Storage | Self::OtherLocal => true,
            Self::ReturnFreight
            | Self::ReturnHandling
            | Self::DestinationCustoms
            | Self::ReexportDocumentation
            | Self::Demurrage => kind == ChargeKind::Return,
            Self::DestructionFee | Self::CustomsSupervision | Self::EnvironmentalHazard => {
                kind == ChargeKind::Destruction
            }
        }
    }
}

/// One line of a charge sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeLine {
    /// Which charge.
    pub item: ChargeItem,
    /// Amount levied.
    pub amount: Amount,
}

/// Validated itemized charges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeSheet {
    kind: ChargeKind,
    lines: Vec<ChargeLine>,
    total: Amount,
}

impl ChargeSheet {
    /// Validate and total a sheet.
    ///
    /// Every line must be non-negative, applicable to `kind`, and appear
    /// once. The total must be positive.
    pub fn new(kind: ChargeKind, lines: Vec<ChargeLine>) -> Result<Self, FeeError> {
        let mut seen = HashSet::new();
        let mut total = Amount::ZERO;
        for line in &lines {
            if line.amount.is_negative() {
                return Err(FeeError::InvalidCharges {
                    reason: format!("{} must not be negative", line.item.label()),
                });
            }
            if !line.item.applies_to(kind) {
                return Err(FeeError::InvalidCharges {
                    reason: format!("{} does not apply to {kind} charges", line.item.label()),
                });
            }
            if !seen.insert(line.item) {
                return Err(FeeError::InvalidCharges {
                    reason: format!("{} listed more than once", line.item.label()),
                });
            }
            total = total
                .checked_add(line.amount)
                .ok_or(FeeError::Overflow { what: "charge total" })?;
        }
        if total <= Amount::ZERO {
            return Err(FeeError::InvalidCharges {
                reason: "total charges must be positive".to_string(),
            });
        }
        Ok(Self { kind, lines, total })
    }

    /// Which outcome these charges settle.
    pub fn kind(&self) -> ChargeKind {
        self.kind
    }

    /// The line items as entered.
    pub fn lines(&self) -> &[ChargeLine] {
        &self.lines
    }

    /// Sum of all lines.
    pub fn total(&self) -> Amount {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(item: ChargeItem, minor: i64) -> ChargeLine {
        ChargeLine {
            item,
            amount: Amount::from_minor(minor),
        }
    }

    #[test]
    fn return_sheet_totals_lines() {
        let sheet = ChargeSheet::new(
            ChargeKind::Return,
            vec![
                line(ChargeItem::ReturnFreight, 250_000),
                line(ChargeItem::Storage, 30_000),
                line(ChargeItem::ReexportDocumentation, 5_000),
            ],
        )
        .unwrap();
        assert_eq!(sheet.total(), Amount::from_minor(285_000));
        assert_eq!(sheet.lines().len(), 3);
        assert_eq!(sheet.kind(), ChargeKind::Return);
    }

    #[test]
    fn destruction_rejects_return_only_items() {
        let err = ChargeSheet::new(
            ChargeKind::Destruction,
            vec![line(ChargeItem::ReturnFreight, 1_000)],
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not apply"));
    }

    #[test]
    fn duplicate_items_rejected() {
        let err = ChargeSheet::new(
            ChargeKind::Destruction,
            vec![
                line(ChargeItem::DestructionFee, 1_000),
                line(ChargeItem::DestructionFee, 2_000),
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn negative_and_zero_totals_rejected() {
        assert!(ChargeSheet::new(
            ChargeKind::Return,
            vec![line(ChargeItem::Storage, -1)]
        )
        .is_err());
        assert!(ChargeSheet::new(ChargeKind::Return, vec![line(ChargeItem::Storage, 0)]).is_err());
        assert!(ChargeSheet::new(ChargeKind::Return, vec![]).is_err());
    }

    #[test]
    fn shared_items_apply_to_both() {
        for kind in [ChargeKind::Return, ChargeKind::Destruction] {
            assert!(ChargeItem::Storage.applies_to(kind));
            assert!(ChargeItem::OtherLocal.applies_to(kind));
        }
    }

    #[test]
    fn sheet_serializes_total() {
        let sheet = ChargeSheet::new(
            ChargeKind::Destruction,
            vec![line(ChargeItem::CustomsSupervision, 12_500)],
        )
        .unwrap();
        let json = serde_json::to_value(&sheet).unwrap();
        assert_eq!(json["kind"], "destruction");
        assert_eq!(json["total"], 12_500);
        assert_eq!(json["lines"][0]["item"], "customs_supervision");
    }
}
