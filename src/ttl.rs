//! Compact duration strings such as `2d10m`.

use crate::error::{MongoFetchError, Result};
use regex::Regex;
use std::sync::LazyLock;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)([a-z])").expect("valid TTL token pattern"));

/// Parse a TTL string into a number of seconds.
///
/// The input is a run of `<integer><unit>` tokens with no separators, where
/// the unit is one of `s`, `m`, `h`, `d` or `w`. Token values are summed.
/// Characters that do not form a token are skipped, so an empty or
/// non-matching string yields zero.
///
/// # Example
///
/// ```
/// use mongo_fetch::parse_ttl;
///
/// assert_eq!(parse_ttl("2d10m").unwrap(), 2 * 86_400 + 600);
/// assert_eq!(parse_ttl("").unwrap(), 0);
/// ```
pub fn parse_ttl(spec: &str) -> Result<u64> {
    let mut seconds: u64 = 0;

    for caps in TOKEN.captures_iter(spec) {
        let digits = &caps[1];
        let unit = caps[2].chars().next().unwrap_or_default();

        let multiplier = match unit {
            's' => 1,
            'm' => MINUTE,
            'h' => HOUR,
            'd' => DAY,
            'w' => WEEK,
            other => return Err(MongoFetchError::InvalidTtlUnit(other)),
        };

        let value: u64 = digits
            .parse()
            .map_err(|_| MongoFetchError::InvalidTtl(format!("{}{}", digits, unit)))?;

        seconds = value
            .checked_mul(multiplier)
            .and_then(|v| seconds.checked_add(v))
            .ok_or_else(|| MongoFetchError::InvalidTtl(spec.to_string()))?;
    }

    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_units() {
        assert_eq!(parse_ttl("30s").unwrap(), 30);
        assert_eq!(parse_ttl("5m").unwrap(), 300);
        assert_eq!(parse_ttl("2h").unwrap(), 7_200);
        assert_eq!(parse_ttl("1d").unwrap(), 86_400);
        assert_eq!(parse_ttl("1w").unwrap(), 604_800);
    }

    #[test]
    fn test_tokens_accumulate() {
        assert_eq!(parse_ttl("2d10m").unwrap(), 173_400);
        assert_eq!(parse_ttl("1h1h").unwrap(), 7_200);
        assert_eq!(parse_ttl("1w1d1h1m1s").unwrap(), 694_861);
    }

    #[test]
    fn test_empty_and_non_matching_yield_zero() {
        assert_eq!(parse_ttl("").unwrap(), 0);
        assert_eq!(parse_ttl("forever").unwrap(), 0);
        assert_eq!(parse_ttl("10").unwrap(), 0);
    }

    #[test]
    fn test_ignores_characters_outside_tokens() {
        assert_eq!(parse_ttl("1h 30m").unwrap(), 5_400);
        assert_eq!(parse_ttl("10M5s").unwrap(), 5);
    }

    #[test]
    fn test_unknown_unit() {
        let err = parse_ttl("5y").unwrap_err();
        assert!(matches!(err, MongoFetchError::InvalidTtlUnit('y')));

        let err = parse_ttl("1h2x").unwrap_err();
        assert!(matches!(err, MongoFetchError::InvalidTtlUnit('x')));
    }

    #[test]
    fn test_overflow() {
        let err = parse_ttl("99999999999999999999999s").unwrap_err();
        assert!(matches!(err, MongoFetchError::InvalidTtl(_)));

        let err = parse_ttl("18446744073709551615w").unwrap_err();
        assert!(matches!(err, MongoFetchError::InvalidTtl(_)));
    }
}
