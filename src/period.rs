// 🗓️ Period Classifier - Timestamp + granularity → canonical period key
//
// Keys are zero-padded so that lexical order IS chronological order:
//   daily     → 2024-03-07
//   monthly   → 2024-03
//   quarterly → 2024-Q1
//   yearly    → 2024
//
// The calendar date is the record's own wall-clock date (the offset it carries),
// never a UTC day offset. Years outside 0000..=9999 would break the lexical
// order and are rejected as malformed.

use crate::error::{AnalyticsError, Result};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// GRANULARITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Monthly,
    Quarterly,
    Yearly,
}

impl Granularity {
    pub const ALL: [Granularity; 4] = [
        Granularity::Daily,
        Granularity::Monthly,
        Granularity::Quarterly,
        Granularity::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Monthly => "monthly",
            Granularity::Quarterly => "quarterly",
            Granularity::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "daily" => Ok(Granularity::Daily),
            "monthly" => Ok(Granularity::Monthly),
            "quarterly" => Ok(Granularity::Quarterly),
            "yearly" => Ok(Granularity::Yearly),
            other => Err(AnalyticsError::InvalidGranularity(other.to_string())),
        }
    }
}

// ============================================================================
// PERIOD KEY
// ============================================================================

/// Canonical bucket identifier. Only comparable with keys of the same granularity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodKey(String);

impl PeriodKey {
    /// Cohort used when neither the customer nor any of its orders carry a usable date
    pub fn epoch_month() -> Self {
        PeriodKey("1970-01".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeriodKey {
    fn from(s: &str) -> Self {
        PeriodKey(s.to_string())
    }
}

// ============================================================================
// TIMESTAMP
// ============================================================================

/// A record timestamp as found in the document: already a date, or text to parse
#[derive(Debug, Clone, PartialEq)]
pub enum Timestamp {
    Native(DateTime<FixedOffset>),
    Text(String),
}

impl Timestamp {
    /// Read a timestamp out of a JSON field.
    ///
    /// Strings stay textual (parsed on classification). Numbers are epoch
    /// milliseconds, fractions truncated. Extended-JSON `{"$date": ...}`
    /// wrappers are unwrapped.
    pub fn from_json(value: &serde_json::Value) -> Option<Timestamp> {
        use serde_json::Value;

        match value {
            Value::String(s) => Some(Timestamp::Text(s.clone())),
            Value::Number(n) => epoch_millis(n).and_then(from_epoch_millis),
            Value::Object(map) => match map.get("$date")? {
                Value::String(s) => Some(Timestamp::Text(s.clone())),
                Value::Number(n) => epoch_millis(n).and_then(from_epoch_millis),
                Value::Object(inner) => inner
                    .get("$numberLong")
                    .and_then(|v| v.as_str())
                    .and_then(|s| s.parse::<i64>().ok())
                    .and_then(from_epoch_millis),
                _ => None,
            },
            _ => None,
        }
    }

    /// Resolve to a concrete instant, keeping the offset the record was written in
    pub fn resolve(&self) -> Result<DateTime<FixedOffset>> {
        match self {
            Timestamp::Native(dt) => check_year_range(*dt, &dt.to_rfc3339()),
            Timestamp::Text(s) => parse_timestamp(s),
        }
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Timestamp::Native(dt)
    }
}

fn epoch_millis(n: &serde_json::Number) -> Option<i64> {
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|ms| ms.is_finite() && ms.abs() < i64::MAX as f64)
            .map(|ms| ms.trunc() as i64)
    })
}

fn from_epoch_millis(ms: i64) -> Option<Timestamp> {
    DateTime::from_timestamp_millis(ms).map(|dt| Timestamp::Native(dt.fixed_offset()))
}

fn check_year_range(dt: DateTime<FixedOffset>, raw: &str) -> Result<DateTime<FixedOffset>> {
    if (0..=9999).contains(&dt.year()) {
        Ok(dt)
    } else {
        Err(AnalyticsError::MalformedTimestamp(raw.to_string()))
    }
}

/// Parse a textual timestamp.
///
/// Accepted, in order: RFC 3339, ISO-8601 with a compact offset (`+0000`),
/// offset-less ISO-8601 (read as UTC), `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD`,
/// and `MM/DD/YYYY`. The year must lie in 0000..=9999.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>> {
    match parse_any_format(raw.trim()) {
        Some(dt) => check_year_range(dt, raw),
        None => Err(AnalyticsError::MalformedTimestamp(raw.to_string())),
    }
}

fn parse_any_format(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt);
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc().fixed_offset());
        }
    }

    for format in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date.and_time(NaiveTime::default()).and_utc().fixed_offset());
        }
    }

    None
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// Map a timestamp onto its bucket for `granularity`
pub fn classify(timestamp: &Timestamp, granularity: Granularity) -> Result<PeriodKey> {
    let dt = timestamp.resolve()?;
    Ok(classify_datetime(&dt, granularity))
}

/// Infallible half of [`classify`] for values that are already dates
pub fn classify_datetime(dt: &DateTime<FixedOffset>, granularity: Granularity) -> PeriodKey {
    let year = dt.year();
    let month = dt.month();

    let key = match granularity {
        Granularity::Daily => format!("{:04}-{:02}-{:02}", year, month, dt.day()),
        Granularity::Monthly => format!("{:04}-{:02}", year, month),
        Granularity::Quarterly => format!("{:04}-Q{}", year, (month + 2) / 3),
        Granularity::Yearly => format!("{:04}", year),
    };

    PeriodKey(key)
}
