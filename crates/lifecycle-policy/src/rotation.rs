//! Kubeconfig rotation timing

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Share of the rotation period after which a kubeconfig is renewed.
pub const ROTATION_THRESHOLD: f64 = 0.95;

fn threshold(period: Duration) -> Duration {
    period.mul_f64(ROTATION_THRESHOLD)
}

fn parse_last_sync(last_sync: Option<&str>) -> Option<DateTime<Utc>> {
    last_sync
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

/// Whether the kubeconfig must be reissued.
///
/// True when `forced`, when `last_sync` is absent or unparsable, or when at
/// least [`ROTATION_THRESHOLD`] of `period` has elapsed since `last_sync`.
pub fn rotation_due(last_sync: Option<&str>, period: Duration, forced: bool, now: DateTime<Utc>) -> bool {
    if forced {
        return true;
    }
    let Some(synced) = parse_last_sync(last_sync) else {
        return true;
    };

    // a sync time in the future counts as fresh
    let elapsed = (now - synced).to_std().unwrap_or(Duration::ZERO);
    elapsed >= threshold(period)
}

/// Time left until [`rotation_due`] turns true; zero when already due.
pub fn time_until_rotation(last_sync: Option<&str>, period: Duration, now: DateTime<Utc>) -> Duration {
    let Some(synced) = parse_last_sync(last_sync) else {
        return Duration::ZERO;
    };
    let elapsed = (now - synced).to_std().unwrap_or(Duration::ZERO);
    threshold(period).saturating_sub(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    const PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

    fn synced_ago(now: DateTime<Utc>, fraction: f64) -> String {
        let ago = TimeDelta::from_std(PERIOD.mul_f64(fraction)).unwrap();
        (now - ago).to_rfc3339()
    }

    #[test]
    fn test_not_due_at_ninety_percent() {
        let now = Utc::now();
        assert!(!rotation_due(Some(&synced_ago(now, 0.90)), PERIOD, false, now));
    }

    #[test]
    fn test_due_at_ninety_six_percent() {
        let now = Utc::now();
        assert!(rotation_due(Some(&synced_ago(now, 0.96)), PERIOD, false, now));
    }

    #[test]
    fn test_forced_is_always_due() {
        let now = Utc::now();
        assert!(rotation_due(Some(&synced_ago(now, 0.01)), PERIOD, true, now));
    }

    #[test]
    fn test_missing_or_garbage_sync_is_due() {
        let now = Utc::now();
        assert!(rotation_due(None, PERIOD, false, now));
        assert!(rotation_due(Some("yesterday"), PERIOD, false, now));
        assert_eq!(time_until_rotation(Some("yesterday"), PERIOD, now), Duration::ZERO);
    }

    #[test]
    fn test_time_until_rotation() {
        let now = Utc::now();
        let remaining = time_until_rotation(Some(&synced_ago(now, 0.50)), PERIOD, now);
        let expected = PERIOD.mul_f64(0.45);
        let diff = remaining.abs_diff(expected);
        assert!(diff < Duration::from_secs(1), "remaining {remaining:?}, expected {expected:?}");

        assert_eq!(time_until_rotation(Some(&synced_ago(now, 0.99)), PERIOD, now), Duration::ZERO);
    }
}
