//! # Duty & GST Computation
//!
//! Duty and GST are flat percentages of the declared value, resolved by
//! HS code and destination country through a [`RateTable`]. Late payment
//! escalates on `duty + gst` using the same [`FeeSchedule`] as shipping.

use std::collections::BTreeMap;

use clearance_core::{Amount, HsCode, RateBps, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::FeeError;
use crate::escalation::{FeeAssessment, FeeSchedule};

/// Duty and GST rates for one tariff line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutyRates {
    /// Basic customs duty.
    pub duty_rate: RateBps,
    /// Goods and services tax.
    pub gst_rate: RateBps,
}

/// Rate lookup by classification and destination.
pub trait RateTable: Send + Sync {
    /// Rates for `hs_code` imported into `destination_country`, if known.
    fn rates_for(&self, hs_code: &HsCode, destination_country: &str) -> Option<DutyRates>;
}

/// One configured tariff line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateEntry {
    /// Destination country, compared case-insensitively.
    pub country: String,
    /// HS code prefix this entry covers (e.g. "30" or "8471").
    pub hs_prefix: String,
    /// Rates for the line.
    #[serde(flatten)]
    pub rates: DutyRates,
}

/// In-memory rate table with longest-prefix matching.
///
/// Falls back to `default` when no entry matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticRateTable {
    /// Configured tariff lines.
    pub entries: Vec<RateEntry>,
    /// Rates applied when no line matches.
    pub default: Option<DutyRates>,
}

impl Default for StaticRateTable {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            default: Some(DutyRates {
                duty_rate: RateBps::from_bps(1_000),
                gst_rate: RateBps::from_bps(1_800),
            }),
        }
    }
}

impl StaticRateTable {
    /// Add a tariff line.
    pub fn with_entry(
        mut self,
        country: impl Into<String>,
        hs_prefix: impl Into<String>,
        rates: DutyRates,
    ) -> Self {
        self.entries.push(RateEntry {
            country: country.into(),
            hs_prefix: hs_prefix.into(),
            rates,
        });
        self
    }

    /// Replace the fallback rates.
    pub fn with_default(mut self, rates: Option<DutyRates>) -> Self {
        self.default = rates;
        self
    }

    /// Entries grouped by country, for display.
    pub fn by_country(&self) -> BTreeMap<String, Vec<&RateEntry>> {
        let mut grouped: BTreeMap<String, Vec<&RateEntry>> = BTreeMap::new();
        for entry in &self.entries {
            grouped
                .entry(entry.country.to_ascii_uppercase())
                .or_default()
                .push(entry);
        }
        grouped
    }
}

impl RateTable for StaticRateTable {
    fn rates_for(&self, hs_code: &HsCode, destination_country: &str) -> Option<DutyRates> {
        self.entries
            .iter()
            .filter(|e| e.country.eq_ignore_ascii_case(destination_country.trim()))
            .filter(|e| hs_code.as_str().starts_with(e.hs_prefix.as_str()))
            .max_by_key(|e| e.hs_prefix.len())
            .map(|e| e.rates)
            .or(self.default)
    }
}

/// Itemized duty quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutyQuote {
    /// Declared customs value.
    pub declared_value: Amount,
    /// Duty rate applied.
    pub duty_rate: RateBps,
    /// GST rate applied.
    pub gst_rate: RateBps,
    /// `declared_value × duty_rate`.
    pub duty: Amount,
    /// `declared_value × gst_rate`.
    pub gst: Amount,
    /// Whole days since the duty window opened.
    pub days_elapsed: i64,
    /// Late-payment fine on `duty + gst`.
    pub fine: Amount,
    /// `duty + gst + fine`.
    pub total_payable: Amount,
}

impl DutyQuote {
    /// `duty + gst`, the escalation base.
    pub fn base(&self) -> Amount {
        Amount::from_minor(self.duty.minor() + self.gst.minor())
    }
}

/// Outcome of a duty computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DutyAssessment {
    /// Duty may be paid.
    Payable(DutyQuote),
    /// The duty window has closed.
    Cancelled {
        /// Whole days since the duty window opened.
        days_elapsed: i64,
    },
}

/// Compute duty, GST and late fine for a declared value.
pub fn compute_duty(
    declared_value: Amount,
    rates: DutyRates,
    schedule: &FeeSchedule,
    window_opened_at: Timestamp,
    now: Timestamp,
) -> Result<DutyAssessment, FeeError> {
    if declared_value.is_negative() {
        return Err(FeeError::NegativeBase {
            base: declared_value,
        });
    }
    let duty = declared_value
        .apply_rate(rates.duty_rate)
        .ok_or(FeeError::Overflow { what: "duty" })?;
    let gst = declared_value
        .apply_rate(rates.gst_rate)
        .ok_or(FeeError::Overflow { what: "gst" })?;
    let base = duty
        .checked_add(gst)
        .ok_or(FeeError::Overflow { what: "duty base" })?;

    match schedule.assess(base, window_opened_at, now)? {
        FeeAssessment::Cancelled { days_elapsed } => Ok(DutyAssessment::Cancelled { days_elapsed }),
        FeeAssessment::Payable {
            days_elapsed,
            fine,
            total,
            ..
        } => Ok(DutyAssessment::Payable(DutyQuote {
            declared_value,
            duty_rate: rates.duty_rate,
            gst_rate: rates.gst_rate,
            duty,
            gst,
            days_elapsed,
            fine,
            total_payable: total,
        })),
    }
}
