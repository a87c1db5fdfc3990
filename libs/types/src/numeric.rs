//! Fixed-point decimal type for air-quality index values
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Display rounding is 2 decimal places, HALF_UP (midpoint away from zero),
//! applied to the exact decimal parsed from the feed. `17.005` therefore
//! rounds to `17.01`, never to `17.00` as binary floating point would.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ReadingError;

/// Number of decimal places kept for summaries and chart points.
pub const AQI_DP: u32 = 2;

/// Air-quality index value
///
/// Wraps an exact `Decimal`. Values are stored as received; rounding
/// happens explicitly through [`Aqi::rounded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Aqi(Decimal);

impl Aqi {
    /// Zero AQI
    pub const ZERO: Aqi = Aqi(Decimal::ZERO);

    /// Create from a Decimal
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Create from an integer value
    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    /// Parse a textual AQI value
    ///
    /// Accepts plain decimals (`"152.345"`) and scientific notation
    /// (`"1.5e2"`). Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self, ReadingError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ReadingError::NonNumeric(raw.to_string()));
        }

        Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map(Self)
            .map_err(|_| ReadingError::NonNumeric(raw.to_string()))
    }

    /// Round to 2 decimal places, midpoint away from zero
    pub fn rounded(&self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(AQI_DP, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Largest integer not greater than this value
    pub fn floor(&self) -> Decimal {
        self.0.floor()
    }

    /// Get inner decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Lossy conversion for chart widgets that take plain numbers
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }
}

impl Default for Aqi {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Renders without trailing zeros: `150.00` → `"150"`, `152.350` → `"152.35"`.
impl fmt::Display for Aqi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl From<Decimal> for Aqi {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl FromStr for Aqi {
    type Err = ReadingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    #[test]
    fn test_parse_plain_decimal() {
        assert_eq!(Aqi::parse("150").unwrap().as_decimal(), dec("150"));
        assert_eq!(Aqi::parse(" 152.345 ").unwrap().as_decimal(), dec("152.345"));
    }

    #[test]
    fn test_parse_scientific() {
        assert_eq!(Aqi::parse("1.5e2").unwrap().as_decimal(), dec("150"));
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert_eq!(
            Aqi::parse("n/a"),
            Err(ReadingError::NonNumeric("n/a".to_string()))
        );
        assert!(Aqi::parse("").is_err());
        assert!(Aqi::parse("   ").is_err());
        assert!(Aqi::parse("NaN").is_err());
    }

    #[test]
    fn test_rounding_half_up() {
        assert_eq!(Aqi::parse("17.005").unwrap().rounded().to_string(), "17.01");
        assert_eq!(Aqi::parse("17.004").unwrap().rounded().to_string(), "17");
        assert_eq!(Aqi::parse("152.345").unwrap().rounded().to_string(), "152.35");
    }

    #[test]
    fn test_rounding_is_idempotent() {
        let once = Aqi::parse("99.999").unwrap().rounded();
        assert_eq!(once.rounded(), once);
        assert_eq!(once.to_string(), "100");
    }

    #[test]
    fn test_display_strips_trailing_zeros() {
        assert_eq!(Aqi::parse("150.00").unwrap().to_string(), "150");
        assert_eq!(Aqi::parse("42.50").unwrap().to_string(), "42.5");
    }

    #[test]
    fn test_floor() {
        assert_eq!(Aqi::parse("152.99").unwrap().floor(), dec("152"));
        assert_eq!(Aqi::from_u64(80).floor(), dec("80"));
    }

    #[test]
    fn test_to_f64() {
        assert!((Aqi::parse("152.35").unwrap().to_f64() - 152.35).abs() < 1e-9);
    }

    #[test]
    fn test_serialization_as_string() {
        let aqi = Aqi::parse("152.35").unwrap();
        let json = serde_json::to_string(&aqi).unwrap();
        assert_eq!(json, "\"152.35\"");

        let deserialized: Aqi = serde_json::from_str(&json).unwrap();
        assert_eq!(aqi, deserialized);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_rounded_has_at_most_two_places(mantissa in -10_000_000i64..10_000_000, scale in 0u32..6) {
                let aqi = Aqi::new(Decimal::new(mantissa, scale)).rounded();
                prop_assert!(aqi.as_decimal().scale() <= AQI_DP);
                prop_assert_eq!(aqi.rounded(), aqi);
            }

            #[test]
            fn prop_rounding_moves_at_most_half_a_cent(mantissa in -10_000_000i64..10_000_000, scale in 0u32..6) {
                let raw = Decimal::new(mantissa, scale);
                let diff = (Aqi::new(raw).rounded().as_decimal() - raw).abs();
                prop_assert!(diff <= Decimal::new(5, 3));
            }
        }
    }
}
