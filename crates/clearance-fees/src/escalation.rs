//! # Fee Escalation Calculator
//!
//! Late-payment penalty as a pure function of elapsed whole days, used
//! identically for the shipping payment and the duty payment.
//!
//! ```text
//! days ≤ grace            fine = 0
//! grace < days < abort    fine = (days − grace) × rate × base
//! days ≥ abort            Cancelled
//! ```
//!
//! With the defaults (grace 5, abort 90, 1% per day) a base of 1000.00
//! carries a fine of 10.00 on day 6 and 840.00 on day 89; day 90 is
//! cancelled.

use clearance_core::{Amount, RateBps, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::FeeError;

/// Days without any fine.
pub const DEFAULT_GRACE_DAYS: i64 = 5;

/// Elapsed days at which the payment window closes for good.
pub const DEFAULT_ABORT_DAYS: i64 = 90;

/// Daily fine as a fraction of the base: 1% per day.
pub const DEFAULT_FINE_RATE: RateBps = RateBps::from_bps(100);

/// Parameters of one escalation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    /// Days without any fine.
    pub grace_days: i64,
    /// Elapsed days at which the window is cancelled.
    pub abort_days: i64,
    /// Daily fine rate applied to the base.
    pub fine_rate: RateBps,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            grace_days: DEFAULT_GRACE_DAYS,
            abort_days: DEFAULT_ABORT_DAYS,
            fine_rate: DEFAULT_FINE_RATE,
        }
    }
}

/// Outcome of assessing a payment at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FeeAssessment {
    /// The payment may still be made.
    Payable {
        /// Whole days since the reference timestamp.
        days_elapsed: i64,
        /// The un-escalated amount.
        base: Amount,
        /// Late-payment fine.
        fine: Amount,
        /// `base + fine`.
        total: Amount,
    },
    /// The window has closed; no payment may be accepted.
    Cancelled {
        /// Whole days since the reference timestamp.
        days_elapsed: i64,
    },
}

impl FeeAssessment {
    /// Whether the window has closed.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Whole days since the reference timestamp.
    pub fn days_elapsed(&self) -> i64 {
        match self {
            Self::Payable { days_elapsed, .. } | Self::Cancelled { days_elapsed } => *days_elapsed,
        }
    }

    /// The total payable, if the window is open.
    pub fn total(&self) -> Option<Amount> {
        match self {
            Self::Payable { total, .. } => Some(*total),
            Self::Cancelled { .. } => None,
        }
    }
}

impl FeeSchedule {
    /// Reject schedules whose windows make no sense.
    pub fn validate(&self) -> Result<(), FeeError> {
        if self.grace_days < 0 {
            return Err(FeeError::InvalidSchedule {
                reason: format!("grace_days must not be negative, got {}", self.grace_days),
            });
        }
        if self.abort_days <= self.grace_days {
            return Err(FeeError::InvalidSchedule {
                reason: format!(
                    "abort_days ({}) must exceed grace_days ({})",
                    self.abort_days, self.grace_days
                ),
            });
        }
        Ok(())
    }

    /// Whether `days_elapsed` is at or beyond the cutoff.
    pub fn is_cancelled(&self, days_elapsed: i64) -> bool {
        days_elapsed >= self.abort_days
    }

    /// The instant the window closes for a given reference.
    pub fn deadline(&self, reference: Timestamp) -> Timestamp {
        reference.plus_days(self.abort_days)
    }

    /// Fine for `days_elapsed` inside the window.
    pub fn fine_for(&self, base: Amount, days_elapsed: i64) -> Result<Amount, FeeError> {
        if base.is_negative() {
            return Err(FeeError::NegativeBase { base });
        }
        let late_days = days_elapsed.saturating_sub(self.grace_days).max(0);
        base.scaled(self.fine_rate, late_days)
            .ok_or(FeeError::Overflow { what: "fine" })
    }

    /// Assess a payment by elapsed days. Negative days count as day 0.
    pub fn assess_days(&self, base: Amount, days_elapsed: i64) -> Result<FeeAssessment, FeeError> {
        let days_elapsed = days_elapsed.max(0);
        if self.is_cancelled(days_elapsed) {
            return Ok(FeeAssessment::Cancelled { days_elapsed });
        }
        let fine = self.fine_for(base, days_elapsed)?;
        let total = base
            .checked_add(fine)
            .ok_or(FeeError::Overflow { what: "total" })?;
        Ok(FeeAssessment::Payable {
            days_elapsed,
            base,
            fine,
            total,
        })
    }

    /// Assess a payment whose window opened at `reference`, as of `now`.
    pub fn assess(
        &self,
        base: Amount,
        reference: Timestamp,
        now: Timestamp,
    ) -> Result<FeeAssessment, FeeError> {
        self.assess_days(base, now.whole_days_since(&reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Amount {
        Amount::from_minor(100_000) // 1000.00
    }

    fn payable_fine(assessment: FeeAssessment) -> Amount {
        match assessment {
            FeeAssessment::Payable { fine, .. } => fine,
            FeeAssessment::Cancelled { days_elapsed } => {
                panic!("expected payable, cancelled at day {days_elapsed}")
            }
        }
    }

    // ── Boundaries ───────────────────────────────────────────────

    #[test]
    fn grace_period_has_no_fine() {
        let schedule = FeeSchedule::default();
        for day in 0..=5 {
            let assessment = schedule.assess_days(base(), day).unwrap();
            assert_eq!(payable_fine(assessment), Amount::ZERO, "day {day}");
            assert_eq!(assessment.total(), Some(base()));
        }
    }

    #[test]
    fn day_six_fine_is_one_day() {
        let assessment = FeeSchedule::default().assess_days(base(), 6).unwrap();
        assert_eq!(
            assessment,
            FeeAssessment::Payable {
                days_elapsed: 6,
                base: base(),
                fine: Amount::from_minor(1_000),
                total: Amount::from_minor(101_000),
            }
        );
    }

    #[test]
    fn day_eighty_nine_is_last_payable_day() {
        let assessment = FeeSchedule::default().assess_days(base(), 89).unwrap();
        assert_eq!(payable_fine(assessment), Amount::from_minor(84_000));
        assert_eq!(assessment.total(), Some(Amount::from_minor(184_000)));
    }

    #[test]
    fn day_ninety_is_cancelled() {
        let assessment = FeeSchedule::default().assess_days(base(), 90).unwrap();
        assert_eq!(assessment, FeeAssessment::Cancelled { days_elapsed: 90 });
        assert!(assessment.total().is_none());
    }

    #[test]
    fn negative_days_count_as_zero() {
        let assessment = FeeSchedule::default().assess_days(base(), -3).unwrap();
        assert_eq!(assessment.days_elapsed(), 0);
    }

    #[test]
    fn assess_uses_whole_days_between_timestamps() {
        let reference = Timestamp::parse("2026-01-01T12:00:00Z").unwrap();
        let schedule = FeeSchedule::default();
        // 6 days minus one second is still day 5.
        let almost = reference.plus_days(6).plus_secs(-1);
        assert_eq!(
            payable_fine(schedule.assess(base(), reference, almost).unwrap()),
            Amount::ZERO
        );
        let six = reference.plus_days(6);
        assert_eq!(
            payable_fine(schedule.assess(base(), reference, six).unwrap()),
            Amount::from_minor(1_000)
        );
    }

    #[test]
    fn deadline_is_abort_days_after_reference() {
        let reference = Timestamp::parse("2026-03-01T00:00:00Z").unwrap();
        assert_eq!(
            FeeSchedule::default().deadline(reference).to_iso8601(),
            "2026-05-30T00:00:00Z"
        );
    }

    // ── Validation ───────────────────────────────────────────────

    #[test]
    fn negative_base_rejected() {
        let err = FeeSchedule::default()
            .assess_days(Amount::from_minor(-1), 10)
            .unwrap_err();
        assert!(matches!(err, FeeError::NegativeBase { .. }));
    }

    #[test]
    fn overflow_reported() {
        let err = FeeSchedule::default()
            .assess_days(Amount::from_minor(i64::MAX), 80)
            .unwrap_err();
        assert!(matches!(err, FeeError::Overflow { .. }));
    }

    #[test]
    fn schedule_validation() {
        assert!(FeeSchedule::default().validate().is_ok());
        let inverted = FeeSchedule {
            grace_days: 10,
            abort_days: 10,
            ..FeeSchedule::default()
        };
        assert!(inverted.validate().is_err());
        let negative = FeeSchedule {
            grace_days: -1,
            ..FeeSchedule::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn schedule_deserializes_with_defaults() {
        let schedule: FeeSchedule = serde_yaml::from_str("fine_rate: 250\n").unwrap();
        assert_eq!(schedule.grace_days, DEFAULT_GRACE_DAYS);
        assert_eq!(schedule.abort_days, DEFAULT_ABORT_DAYS);
        assert_eq!(schedule.fine_rate.bps(), 250);
    }

    #[test]
    fn assessment_serializes_with_outcome_tag() {
        let json = serde_json::to_value(FeeAssessment::Cancelled { days_elapsed: 91 }).unwrap();
        assert_eq!(json["outcome"], "cancelled");
        assert_eq!(json["days_elapsed"], 91);
    }

    // ── Properties ───────────────────────────────────────────────

    proptest::proptest! {
        #[test]
        fn no_fine_within_grace(minor in 0i64..10_000_000_000, day in 0i64..=5) {
            let a = FeeSchedule::default().assess_days(Amount::from_minor(minor), day).unwrap();
            proptest::prop_assert_eq!(a.total(), Some(Amount::from_minor(minor)));
        }

        #[test]
        fn cancelled_from_cutoff_onwards(minor in 0i64..10_000_000_000, day in 90i64..100_000) {
            let a = FeeSchedule::default().assess_days(Amount::from_minor(minor), day).unwrap();
            proptest::prop_assert!(a.is_cancelled());
        }

        #[test]
        fn fine_never_decreases(minor in 0i64..10_000_000_000, day in 0i64..89) {
            let schedule = FeeSchedule::default();
            let today = schedule.fine_for(Amount::from_minor(minor), day).unwrap();
            let tomorrow = schedule.fine_for(Amount::from_minor(minor), day + 1).unwrap();
            proptest::prop_assert!(tomorrow >= today);
        }
    }
}
