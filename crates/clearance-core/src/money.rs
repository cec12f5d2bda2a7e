//! # Money and Rates
//!
//! Amounts are integer minor units (paise); rates are basis points
//! (1 bps = 0.01%). Rate application truncates toward zero so that a
//! computed fee never exceeds its exact rational value.
//!
//! String forms use two decimal places: `"1000.00"` is 100_000 minor units,
//! `"18"` as a percentage is 1_800 bps.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Currency code used when the caller does not specify one.
pub const DEFAULT_CURRENCY: &str = "INR";

/// Basis points per unit (100%).
const BPS_PER_UNIT: i128 = 10_000;

/// A monetary amount in minor units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    /// Zero.
    pub const ZERO: Amount = Amount(0);

    /// Construct from minor units.
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Construct from whole major units (`from_major(1000)` is 1000.00).
    pub fn from_major(major: i64) -> Option<Self> {
        major.checked_mul(100).map(Self)
    }

    /// The amount in minor units.
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Whether the amount is below zero.
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Whether the amount is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Self)
    }

    /// `self × rate × multiplier`, truncated toward zero.
    ///
    /// Intermediate arithmetic is done in `i128`; `None` means the result
    /// does not fit in `i64`.
    pub fn scaled(self, rate: RateBps, multiplier: i64) -> Option<Amount> {
        let product = i128::from(self.0) * i128::from(rate.bps()) * i128::from(multiplier);
        i64::try_from(product / BPS_PER_UNIT).ok().map(Self)
    }

    /// `self × rate`, truncated toward zero.
    pub fn apply_rate(self, rate: RateBps) -> Option<Amount> {
        self.scaled(rate, 1)
    }

    /// Parse a decimal string in major units.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        parse_amount(s)
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidAmount(s.to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_amount(self.0))
    }
}

/// A rate in basis points.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RateBps(u32);

impl RateBps {
    /// Upper bound accepted by the parsers: 1000%.
    pub const MAX: u32 = 100_000;

    /// Construct from basis points.
    pub const fn from_bps(bps: u32) -> Self {
        Self(bps)
    }

    /// The rate in basis points.
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Parse a percentage string: `"18"` and `"18.00"` are 1800 bps,
    /// `"0.5"` is 50 bps.
    pub fn parse_percent(s: &str) -> Result<Self, ValidationError> {
        let hundredths = parse_amount(s)
            .ok_or_else(|| ValidationError::InvalidRate(s.to_string()))?;
        if hundredths < 0 || hundredths > i64::from(Self::MAX) {
            return Err(ValidationError::InvalidRate(s.to_string()));
        }
        u32::try_from(hundredths)
            .map(Self)
            .map_err(|_| ValidationError::InvalidRate(s.to_string()))
    }

    /// Parse a fraction string: `"0.01"` is 100 bps, `"0.18"` is 1800 bps.
    pub fn parse_fraction(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
        if frac_part.len() > 4 || int_part.starts_with('-') {
            return Err(ValidationError::InvalidRate(s.to_string()));
        }
        let int: u32 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| ValidationError::InvalidRate(s.to_string()))?
        };
        let frac: u32 = if frac_part.is_empty() {
            0
        } else {
            let padded = format!("{frac_part:0<4}");
            padded
                .parse()
                .map_err(|_| ValidationError::InvalidRate(s.to_string()))?
        };
        let bps = int
            .checked_mul(10_000)
            .and_then(|v| v.checked_add(frac))
            .filter(|v| *v <= Self::MAX)
            .ok_or_else(|| ValidationError::InvalidRate(s.to_string()))?;
        Ok(Self(bps))
    }
}

impl fmt::Display for RateBps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

/// Parse a decimal string into hundredths (minor units).
///
/// Accepts an optional sign and up to two fractional digits; extra digits
/// are truncated. Returns `None` for empty or malformed input and on
/// overflow.
///
/// "1000" → 100000, "4.5" → 450, "0.01" → 1
pub fn parse_amount(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let (int_str, frac_str) = digits.split_once('.').unwrap_or((digits, ""));
    if int_str.is_empty() && frac_str.is_empty() {
        return None;
    }
    if !int_str.chars().all(|c| c.is_ascii_digit()) || !frac_str.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let integer: i64 = if int_str.is_empty() {
        0
    } else {
        int_str.parse().ok()?
    };
    let fraction: i64 = match frac_str.len() {
        0 => 0,
        1 => frac_str.parse::<i64>().ok()? * 10,
        _ => frac_str[..2].parse().ok()?,
    };

    let magnitude = integer.checked_mul(100)?.checked_add(fraction)?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Format minor units with two decimal places.
///
/// 100000 → "1000.00", 450 → "4.50", -5 → "-0.05"
pub fn format_amount(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- Amount parsing --

    #[test]
    fn parse_amount_whole_number() {
        assert_eq!(parse_amount("1000"), Some(100_000));
        assert_eq!(parse_amount("0"), Some(0));
        assert_eq!(parse_amount("+7"), Some(700));
    }

    #[test]
    fn parse_amount_decimal() {
        assert_eq!(parse_amount("100.50"), Some(10_050));
        assert_eq!(parse_amount("4.5"), Some(450));
        assert_eq!(parse_amount("0.01"), Some(1));
        assert_eq!(parse_amount(".25"), Some(25));
    }

    #[test]
    fn parse_amount_truncates_extra_digits() {
        assert_eq!(parse_amount("1.999"), Some(199));
    }

    #[test]
    fn parse_amount_negative() {
        assert_eq!(parse_amount("-12.30"), Some(-1230));
        assert_eq!(parse_amount("-0.05"), Some(-5));
    }

    #[test]
    fn parse_amount_rejects_garbage() {
        for s in ["", " ", "abc", "1.2.3", "1e5", "--1", ".", "1,000"] {
            assert_eq!(parse_amount(s), None, "accepted {s:?}");
        }
    }

    #[test]
    fn parse_amount_rejects_overflow() {
        assert_eq!(parse_amount("92233720368547758.08"), None);
    }

    // -- Formatting --

    #[test]
    fn format_amount_pads_fraction() {
        assert_eq!(format_amount(100_000), "1000.00");
        assert_eq!(format_amount(450), "4.50");
        assert_eq!(format_amount(-5), "-0.05");
        assert_eq!(format_amount(i64::MIN), "-92233720368547758.08");
    }

    // -- Rate application --

    #[test]
    fn apply_rate_truncates() {
        // 18% of 10.01 = 1.8018 → 1.80
        let duty = Amount::from_minor(1001).apply_rate(RateBps::from_bps(1800));
        assert_eq!(duty, Some(Amount::from_minor(180)));
    }

    #[test]
    fn scaled_multiplies_days() {
        // 1% of 1000.00 for 84 days = 840.00
        let fine = Amount::from_minor(100_000).scaled(RateBps::from_bps(100), 84);
        assert_eq!(fine, Some(Amount::from_minor(84_000)));
    }

    #[test]
    fn scaled_reports_overflow() {
        assert_eq!(
            Amount::from_minor(i64::MAX).scaled(RateBps::from_bps(100_000), 1000),
            None
        );
    }

    // -- Rate parsing --

    #[test]
    fn parse_percent() {
        assert_eq!(RateBps::parse_percent("18").unwrap().bps(), 1800);
        assert_eq!(RateBps::parse_percent("0.5").unwrap().bps(), 50);
        assert!(RateBps::parse_percent("-1").is_err());
        assert!(RateBps::parse_percent("1001").is_err());
    }

    #[test]
    fn parse_fraction() {
        assert_eq!(RateBps::parse_fraction("0.01").unwrap().bps(), 100);
        assert_eq!(RateBps::parse_fraction("0.18").unwrap().bps(), 1800);
        assert_eq!(RateBps::parse_fraction("1").unwrap().bps(), 10_000);
        assert_eq!(RateBps::parse_fraction("0.0005").unwrap().bps(), 5);
        assert!(RateBps::parse_fraction("0.00001").is_err());
        assert!(RateBps::parse_fraction("x").is_err());
    }

    #[test]
    fn rate_display() {
        assert_eq!(RateBps::from_bps(1850).to_string(), "18.50%");
    }

    #[test]
    fn amount_serializes_as_integer() {
        assert_eq!(
            serde_json::to_string(&Amount::from_minor(12_345)).unwrap(),
            "12345"
        );
    }

    proptest::proptest! {
        #[test]
        fn format_then_parse_is_identity(minor in -1_000_000_000_000i64..1_000_000_000_000i64) {
            proptest::prop_assert_eq!(parse_amount(&format_amount(minor)), Some(minor));
        }
    }
}
