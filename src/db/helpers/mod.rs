use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::DomainLabel;

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

/// Fixed-width UTC timestamps, so range filters can compare the TEXT columns directly.
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

pub fn parse_label(value: &str) -> Result<DomainLabel> {
    DomainLabel::parse(value).ok_or_else(|| anyhow!("unknown domain classification {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_formatted_datetimes_sort_lexically() {
        let base = Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap();
        let later = base + Duration::milliseconds(1);
        let earlier = format_datetime(&base);
        let later_str = format_datetime(&later);
        assert_eq!(earlier.len(), later_str.len());
        assert!(earlier < later_str);
        assert_eq!(parse_datetime(&later_str, "t").unwrap(), later);
    }

    #[test]
    fn test_negative_and_unknown_values_are_rejected() {
        assert!(to_u64(-1, "locked_in_seconds").is_err());
        assert_eq!(to_u64(7, "x").unwrap(), 7);
        assert!(parse_label("neutral").is_err());
        assert_eq!(parse_label("locked_in").unwrap(), DomainLabel::LockedIn);
    }
}
