//! # Engine Configuration
//!
//! Fee schedules, window anchors, tariff, duty rates and document catalog.
//! Every field has a default, so an empty YAML document is a valid config.
//!
//! ```yaml
//! shipping_fees: { grace_days: 5, abort_days: 90, fine_rate: 100 }
//! duty_fees:     { grace_days: 5, abort_days: 90, fine_rate: 100 }
//! shipping_anchor: created
//! duty_anchor: import_approved
//! tariff: { base_fee: 50000, per_kg: 25000 }
//! ```

use std::path::{Path, PathBuf};

use clearance_fees::{FeeError, FeeSchedule, ShippingTariff, StaticRateTable};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::StaticDocumentCatalog;
use crate::payment::PaymentKind;
use crate::status::ShipmentStatus;

/// Environment variable naming the YAML config file.
pub const CONFIG_ENV: &str = "CLEARANCE_CONFIG";

/// Phase whose timestamp opens a payment window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseAnchor {
    /// Shipment booking.
    Created,
    /// First HS approval.
    HsApproved,
    /// Initial documents approved.
    DocumentApproved,
    /// Export approved.
    ExportApproved,
    /// Import approved.
    ImportApproved,
}

impl PhaseAnchor {
    /// Status whose entry stamps this anchor.
    pub fn status(&self) -> ShipmentStatus {
        match self {
            Self::Created => ShipmentStatus::Created,
            Self::HsApproved => ShipmentStatus::HsApproved,
            Self::DocumentApproved => ShipmentStatus::DocumentApproved,
            Self::ExportApproved => ShipmentStatus::InTransit,
            Self::ImportApproved => ShipmentStatus::ImportApproved,
        }
    }
}

/// Configuration failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The YAML did not match the schema.
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Values parsed but are inconsistent.
    #[error("invalid config: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl From<FeeError> for ConfigError {
    fn from(err: FeeError) -> Self {
        Self::Invalid {
            reason: err.to_string(),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Escalation for the shipping payment.
    pub shipping_fees: FeeSchedule,
    /// Escalation for the duty payment.
    pub duty_fees: FeeSchedule,
    /// Where the shipping window starts counting.
    pub shipping_anchor: PhaseAnchor,
    /// Where the duty window starts counting.
    pub duty_anchor: PhaseAnchor,
    /// Base shipping cost.
    pub tariff: ShippingTariff,
    /// Duty and GST rates.
    pub rates: StaticRateTable,
    /// Initial documents by HS chapter.
    pub catalog: StaticDocumentCatalog,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shipping_fees: FeeSchedule::default(),
            duty_fees: FeeSchedule::default(),
            shipping_anchor: PhaseAnchor::Created,
            duty_anchor: PhaseAnchor::ImportApproved,
            tariff: ShippingTariff::default(),
            rates: StaticRateTable::default(),
            catalog: StaticDocumentCatalog::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Load from `$CLEARANCE_CONFIG`, or defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => {
                tracing::info!(path = %path, "loading engine config");
                Self::load(path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Fee schedule and anchor for an escalating payment.
    pub fn window_for(&self, kind: PaymentKind) -> Option<(&FeeSchedule, PhaseAnchor)> {
        match kind {
            PaymentKind::Shipping => Some((&self.shipping_fees, self.shipping_anchor)),
            PaymentKind::Duty => Some((&self.duty_fees, self.duty_anchor)),
            PaymentKind::ReturnCharges | PaymentKind::DestructionCharges => None,
        }
    }

    /// Check schedules, tariff and anchors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shipping_fees.validate()?;
        self.duty_fees.validate()?;
        self.tariff.validate()?;
        for kind in [PaymentKind::Shipping, PaymentKind::Duty] {
            if let Some((_, anchor)) = self.window_for(kind) {
                let due_in = kind.settles().0;
                if anchor.status().rank() > due_in.rank() {
                    return Err(ConfigError::Invalid {
                        reason: format!(
                            "{kind} anchor {anchor:?} is reached after the payment falls due in {due_in}"
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}
