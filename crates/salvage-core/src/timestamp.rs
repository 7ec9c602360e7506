//! Timestamp normalization
//!
//! Editor data stores instants inconsistently: manifests use epoch
//! milliseconds, conversation blobs mix seconds, milliseconds and longer
//! high-resolution counters, sometimes as strings. Everything is funneled
//! into [`EpochMillis`] here so the reconciler only ever compares integers.

use crate::errors::{Result, SalvageError};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Values below this are taken to be epoch seconds (year 5138 in ms).
const SECONDS_CEILING: f64 = 1e11;
/// Values at or above this carry sub-millisecond precision.
const HIGH_RES_FLOOR: f64 = 1e14;
/// Digits kept when truncating a high-resolution counter to milliseconds.
const MILLIS_DIGITS: usize = 13;

/// Folder name format of the organized staging area.
pub const FOLDER_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
/// Human-facing format for timelines and summaries.
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y%m%d %H%M%S",
    "%Y%m%d_%H%M%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];

/// Milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpochMillis(i64);

impl EpochMillis {
    pub const fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// The instant as a UTC datetime, if representable
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.0).single()
    }

    /// `YYYYMMDD_HHMMSS` in UTC, used for staging folder names
    pub fn folder_stamp(&self) -> String {
        self.format(FOLDER_STAMP_FORMAT, DisplayZone::Utc)
    }

    /// `YYYY-MM-DD HH:MM:SS` in the requested zone
    pub fn display(&self, zone: DisplayZone) -> String {
        self.format(DISPLAY_FORMAT, zone)
    }

    fn format(&self, fmt: &str, zone: DisplayZone) -> String {
        match self.to_utc() {
            Some(utc) => match zone {
                DisplayZone::Utc => utc.format(fmt).to_string(),
                DisplayZone::Local => utc.with_timezone(&Local).format(fmt).to_string(),
            },
            None => format!("@{}ms", self.0),
        }
    }
}

impl std::fmt::Display for EpochMillis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<DateTime<Utc>> for EpochMillis {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }
}

/// Zone used to render instants and to interpret zone-less cutoff input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayZone {
    Utc,
    #[default]
    Local,
}

impl std::str::FromStr for DisplayZone {
    type Err = SalvageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "utc" => Ok(DisplayZone::Utc),
            "local" => Ok(DisplayZone::Local),
            other => Err(SalvageError::InvalidTimestamp {
                input: format!("zone '{}'", other),
            }),
        }
    }
}

/// Normalize a JSON timestamp value into epoch milliseconds
///
/// Accepts integers, floats, numeric strings and RFC 3339 strings. Small
/// values are treated as seconds; values with more than 13 integer digits
/// are truncated to their leading 13 digits. Zero, negatives, booleans and
/// anything else yield `None`.
pub fn normalize_epoch(value: &Value) -> Option<EpochMillis> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                normalize_integer(i)
            } else {
                n.as_f64().and_then(normalize_float)
            }
        }
        Value::String(s) => normalize_str(s),
        _ => None,
    }
}

fn normalize_str(s: &str) -> Option<EpochMillis> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return match s.parse::<i64>() {
            Ok(i) => normalize_integer(i),
            // Too long for i64: still a high-resolution counter.
            Err(_) => s.get(..MILLIS_DIGITS)?.parse().ok().map(EpochMillis),
        };
    }
    if let Ok(f) = s.parse::<f64>() {
        return normalize_float(f);
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| EpochMillis(dt.timestamp_millis()))
}

fn normalize_integer(i: i64) -> Option<EpochMillis> {
    if i <= 0 {
        return None;
    }
    let f = i as f64;
    if f < SECONDS_CEILING {
        i.checked_mul(1000).map(EpochMillis)
    } else if f < HIGH_RES_FLOOR {
        Some(EpochMillis(i))
    } else {
        let digits = i.to_string();
        digits[..MILLIS_DIGITS].parse().ok().map(EpochMillis)
    }
}

fn normalize_float(f: f64) -> Option<EpochMillis> {
    if !f.is_finite() || f <= 0.0 {
        return None;
    }
    if f < SECONDS_CEILING {
        Some(EpochMillis((f * 1000.0).round() as i64))
    } else if f < HIGH_RES_FLOOR {
        Some(EpochMillis(f.trunc() as i64))
    } else {
        let digits = format!("{:.0}", f.trunc());
        digits.get(..MILLIS_DIGITS)?.parse().ok().map(EpochMillis)
    }
}

/// Parse a user-supplied recovery cutoff
///
/// Accepts epoch digits, RFC 3339, and zone-less date-times such as
/// `20240315 142200`, `20240315_142200` or `2024-03-15 14:22:00`, which are
/// interpreted in `zone`. A bare date (`2024-03-15`, `20240315`) means the
/// last millisecond of that day.
pub fn parse_cutoff(input: &str, zone: DisplayZone) -> Result<EpochMillis> {
    let trimmed = input.trim();
    let invalid = || SalvageError::InvalidTimestamp {
        input: input.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid());
    }

    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            let end_of_day = date.and_hms_milli_opt(23, 59, 59, 999).ok_or_else(invalid)?;
            return resolve_naive(end_of_day, zone).ok_or_else(invalid);
        }
    }

    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return normalize_str(trimmed).ok_or_else(invalid);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(EpochMillis(dt.timestamp_millis()));
    }

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return resolve_naive(naive, zone).ok_or_else(invalid);
        }
    }

    Err(invalid())
}

fn resolve_naive(naive: NaiveDateTime, zone: DisplayZone) -> Option<EpochMillis> {
    match zone {
        DisplayZone::Utc => Some(EpochMillis(Utc.from_utc_datetime(&naive).timestamp_millis())),
        // DST gaps have no local mapping; ambiguous folds take the earlier instant.
        DisplayZone::Local => Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| EpochMillis(dt.timestamp_millis())),
    }
}
