use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::TimeUnit;

/// Naive formats tried after RFC 3339, in order. Slash dates are day-first.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Parse a timestamp cell into wall-clock time.
///
/// Offsets in RFC 3339 input are dropped and the local reading kept, since
/// service windows are expressed in the network's local time.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Convert an epoch offset stored by a Datetime column.
pub fn from_epoch(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let per_second: i64 = match unit {
        TimeUnit::Nanoseconds => 1_000_000_000,
        TimeUnit::Microseconds => 1_000_000,
        TimeUnit::Milliseconds => 1_000,
    };
    let secs = value.div_euclid(per_second);
    let nanos = value.rem_euclid(per_second) * (1_000_000_000 / per_second);
    DateTime::<Utc>::from_timestamp(secs, u32::try_from(nanos).ok()?).map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn accepts_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(17, 30, 0)
            .unwrap();
        for raw in [
            "2025-01-06 17:30:00",
            "2025-01-06T17:30:00",
            "2025-01-06 17:30",
            "06/01/2025 17:30",
            "2025-01-06T17:30:00Z",
            " 2025-01-06 17:30:00.000 ",
        ] {
            assert_eq!(parse_timestamp(raw), Some(expected), "{raw}");
        }
    }

    #[test]
    fn rfc3339_keeps_local_reading() {
        let parsed = parse_timestamp("2025-07-01T18:00:00+01:00").unwrap();
        assert_eq!(parsed.hour(), 18);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn epoch_units() {
        let expected = parse_timestamp("2025-01-06 17:30:00").unwrap();
        let secs = expected.and_utc().timestamp();
        assert_eq!(from_epoch(secs * 1_000, TimeUnit::Milliseconds), Some(expected));
        assert_eq!(from_epoch(secs * 1_000_000, TimeUnit::Microseconds), Some(expected));
        assert_eq!(
            from_epoch(secs * 1_000_000_000, TimeUnit::Nanoseconds),
            Some(expected)
        );
    }
}
