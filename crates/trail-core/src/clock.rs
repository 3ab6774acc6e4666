//! Wall-clock helpers.
//!
//! All persisted timestamps are microseconds since the Unix epoch (`i64`).
//! The clock is deliberately coarse: ordering within an entity never relies
//! on it alone — the per-entity sequence counter breaks ties.

use chrono::{DateTime, TimeZone, Utc};

/// Current wall-clock time in microseconds since the Unix epoch.
#[must_use]
pub fn now_us() -> i64 {
    Utc::now().timestamp_micros()
}

/// Render a microsecond timestamp as RFC 3339 UTC for display.
///
/// Out-of-range values fall back to the raw number so display never panics.
#[must_use]
pub fn format_us(ts_us: i64) -> String {
    Utc.timestamp_micros(ts_us).single().map_or_else(
        || format!("{ts_us}us"),
        |dt: DateTime<Utc>| dt.to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_after_2024() {
        // 2024-01-01T00:00:00Z in microseconds.
        assert!(now_us() > 1_704_067_200_000_000);
    }

    #[test]
    fn format_roundtrips_known_instant() {
        let rendered = format_us(1_708_012_200_123_456);
        assert!(rendered.starts_with("2024-02-15T"));
        assert!(rendered.ends_with('Z'));
    }

    #[test]
    fn format_tolerates_out_of_range() {
        assert_eq!(format_us(i64::MAX), format!("{}us", i64::MAX));
    }
}
