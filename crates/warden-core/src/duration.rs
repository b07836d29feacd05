//! Duration parsing for moderation commands.
//!
//! Accepts the short forms moderators type: `30s`, `15m`, `2h`, `1d`, or a
//! bare number meaning minutes. Zero and anything unrecognized are
//! rejected; clamping to the platform ceiling happens later, at the store.

use std::time::Duration;

/// Parse a human duration like `30s`, `15m`, `2h`, `1d`, or `45` (minutes).
///
/// Returns `None` for zero, empty, or malformed input.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    let split = s.char_indices().find(|(_, c)| !c.is_ascii_digit());
    let (digits, unit) = match split {
        Some((idx, _)) => s.split_at(idx),
        // Bare number means minutes
        None => (s, "m"),
    };

    let value: u64 = digits.parse().ok()?;
    if value == 0 {
        return None;
    }

    let secs = match unit {
        "s" => value,
        "m" => value.checked_mul(60)?,
        "h" => value.checked_mul(60 * 60)?,
        "d" => value.checked_mul(24 * 60 * 60)?,
        _ => return None,
    };

    Some(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_suffixed_forms() {
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("15m"), Some(Duration::from_secs(15 * 60)));
        assert_eq!(parse_duration("2h"), Some(Duration::from_secs(2 * 3600)));
        assert_eq!(parse_duration("1d"), Some(Duration::from_secs(86400)));
    }

    #[test]
    fn bare_number_means_minutes() {
        assert_eq!(parse_duration("45"), Some(Duration::from_secs(45 * 60)));
    }

    #[test]
    fn rejects_zero_and_garbage() {
        assert_eq!(parse_duration("0"), None);
        assert_eq!(parse_duration("0m"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration("10w"), None);
        assert_eq!(parse_duration("m10"), None);
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(parse_duration(" 5m "), Some(Duration::from_secs(300)));
    }
}
