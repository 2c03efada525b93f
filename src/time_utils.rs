// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 with millisecond precision and a `Z` suffix.
///
/// Stored timestamps sort lexically in creation order.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time formatted with [`format_utc_rfc3339`].
pub fn now_rfc3339() -> String {
    format_utc_rfc3339(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_uses_z_suffix_and_millis() {
        let date = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(format_utc_rfc3339(date), "2025-03-14T09:26:53.000Z");
    }

    #[test]
    fn test_later_timestamps_sort_after_earlier() {
        let a = format_utc_rfc3339(Utc.with_ymd_and_hms(2025, 1, 9, 0, 0, 0).unwrap());
        let b = format_utc_rfc3339(Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap());
        assert!(a < b);
    }
}
