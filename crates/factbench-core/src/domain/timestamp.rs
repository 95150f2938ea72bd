//! Timestamp parsing for stored records.
//!
//! Records are written with RFC 3339 timestamps. Files written by earlier
//! tooling carry naive ISO 8601 local times (`2026-01-15T10:30:00.123456`);
//! those are read as local time on this host.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parse an RFC 3339 or offset-less ISO 8601 timestamp.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT).ok()?;
    let ts = match Local.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // Skipped by a DST jump; keep the wall-clock digits.
        None => Utc.from_utc_datetime(&naive),
    };
    Some(ts)
}

pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw:?}")))
}

pub(crate) fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw:?}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn test_rfc3339_keeps_instant() {
        let ts = parse_timestamp("2026-01-15T10:30:00+02:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-01-15T08:30:00+00:00");
    }

    #[test]
    fn test_naive_timestamps_read_as_local_time() {
        let expected = NaiveDate::from_ymd_opt(2026, 1, 15)
            .unwrap()
            .and_hms_micro_opt(10, 30, 0, 123_456)
            .unwrap();
        let ts = parse_timestamp("2026-01-15T10:30:00.123456").unwrap();
        assert_eq!(ts.with_timezone(&Local).naive_local(), expected);

        let whole = parse_timestamp("2026-01-15T10:30:00").unwrap();
        assert_eq!(
            whole.with_timezone(&Local).naive_local(),
            expected.with_nanosecond(0).unwrap()
        );
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2026-01-15").is_none());
    }
}
