//! Throttle and reconnect timing
//!
//! The API answers HTTP 429 with a `Retry-After` header; connection failures
//! are retried with exponential backoff. Both waits are bounded so a
//! misbehaving server cannot stall a sync cycle indefinitely.

use std::time::Duration;

use tracing::warn;

/// Longest wait honoured from a `Retry-After` header
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// First reconnect delay; doubled on each further attempt
const BASE_BACKOFF: Duration = Duration::from_millis(250);

/// Upper bound for a single reconnect delay
const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// Parses a `Retry-After` header value
///
/// Accepts integer seconds or an HTTP-date (RFC 2822). Anything else, or a
/// date more than an hour away, yields `default`.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds).min(MAX_RETRY_AFTER);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let now = chrono::Utc::now();
        let target = date.with_timezone(&chrono::Utc);
        if target <= now {
            return Duration::ZERO;
        }
        if let Some(secs) = (target - now)
            .num_seconds()
            .try_into()
            .ok()
            .filter(|&s: &u64| s <= MAX_RETRY_AFTER.as_secs())
        {
            return Duration::from_secs(secs);
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}

/// Delay before reconnect attempt number `attempt` (0-based)
pub fn backoff_delay(attempt: u32) -> Duration {
    BASE_BACKOFF
        .checked_mul(1u32 << attempt.min(16))
        .unwrap_or(MAX_BACKOFF)
        .min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_retry_after_seconds() {
        let duration = parse_retry_after("30", Duration::from_secs(60));
        assert_eq!(duration, Duration::from_secs(30));
    }

    #[test]
    fn test_parse_retry_after_with_whitespace() {
        let duration = parse_retry_after("  45  ", Duration::from_secs(60));
        assert_eq!(duration, Duration::from_secs(45));
    }

    #[test]
    fn test_parse_retry_after_capped() {
        let duration = parse_retry_after("86400", Duration::from_secs(60));
        assert_eq!(duration, MAX_RETRY_AFTER);
    }

    #[test]
    fn test_parse_retry_after_past_date_is_zero() {
        let duration = parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT", Duration::from_secs(60));
        assert_eq!(duration, Duration::ZERO);
    }

    #[test]
    fn test_parse_retry_after_invalid_falls_back() {
        let default = Duration::from_secs(60);
        assert_eq!(parse_retry_after("soon", default), default);
        assert_eq!(parse_retry_after("", default), default);
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        assert_eq!(backoff_delay(0), Duration::from_millis(250));
        assert_eq!(backoff_delay(1), Duration::from_millis(500));
        assert_eq!(backoff_delay(2), Duration::from_secs(1));
        assert_eq!(backoff_delay(10), MAX_BACKOFF);
        assert_eq!(backoff_delay(u32::MAX), MAX_BACKOFF);
    }
}
