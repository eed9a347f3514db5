//! Shared serialization utilities for provider payloads.

use serde::{Deserialize, Deserializer};

use crate::consts::FRED_MISSING_VALUE;

/// Deserialize a provider value string into `Some(f64)`.
///
/// The missing-data marker, unparsable text and non-finite numbers all map
/// to `None` so they can be filtered before reaching metric derivation.
pub fn de_optional_value<'de, D>(d: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(d)?;
    Ok(parse_value(&raw))
}

/// Parse a raw value string, treating the missing marker as absent.
pub fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == FRED_MISSING_VALUE {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Round to two decimal places (half away from zero).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_marker_is_none() {
        assert_eq!(parse_value("."), None);
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("abc"), None);
        assert_eq!(parse_value("NaN"), None);
        assert_eq!(parse_value("inf"), None);
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("3.21"), Some(3.21));
        assert_eq!(parse_value(" 310.326 "), Some(310.326));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(3.14159), 3.14);
        assert_eq!(round2(-0.456), -0.46);
    }
}
