//! Firestore Timestamp type and timestamp text normalization

use crate::error::AdminError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::field_value::FirestoreValue;

/// `datetime-local` input format without seconds (`YYYY-MM-DDTHH:mm`)
const MINUTE_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Naive datetime with seconds and optional fraction
const SECOND_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Firestore timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    /// Seconds since Unix epoch
    pub seconds: i64,

    /// Nanoseconds component (0-999,999,999)
    pub nanoseconds: i32,
}

impl Timestamp {
    /// Create a new timestamp
    pub fn new(seconds: i64, nanoseconds: i32) -> Result<Self, AdminError> {
        if !(0..1_000_000_000).contains(&nanoseconds) {
            return Err(AdminError::InvalidForm(format!(
                "nanoseconds must be in range [0, 999999999], got {}",
                nanoseconds
            )));
        }

        Ok(Self {
            seconds,
            nanoseconds,
        })
    }

    /// Get current timestamp
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Convert from DateTime
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanoseconds: dt.timestamp_subsec_nanos() as i32,
        }
    }

    /// Convert to DateTime
    pub fn to_datetime(&self) -> DateTime<Utc> {
        let Some(dt) = DateTime::from_timestamp(self.seconds, self.nanoseconds as u32) else {
            return Utc::now();
        };
        dt
    }

    /// Parse an RFC 3339 timestamp
    pub fn parse(text: &str) -> Result<Self, AdminError> {
        let dt = DateTime::parse_from_rfc3339(text.trim()).map_err(|e| {
            AdminError::InvalidForm(format!("invalid RFC 3339 timestamp '{}': {}", text, e))
        })?;
        Ok(Self::from_datetime(dt.with_timezone(&Utc)))
    }

    /// RFC 3339 text in UTC, with a fraction only when non-zero
    pub fn to_rfc3339(&self) -> String {
        self.to_datetime()
            .to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    /// Convert to a Firestore value for use in documents
    pub fn to_value(&self) -> FirestoreValue {
        FirestoreValue::TimestampValue(self.to_rfc3339())
    }
}

/// Normalize user-entered timestamp text to an RFC 3339 UTC string
///
/// A `datetime-local` value (`2026-02-01T12:30`) has no zone and no seconds;
/// it is read as UTC. Text with an explicit offset is converted to UTC.
/// Naive datetimes with seconds and bare dates are read as UTC as well.
/// Returns `None` when the text is not a recognizable timestamp.
pub fn normalize_timestamp(text: &str) -> Option<String> {
    let text = text.trim();

    if let Ok(naive) = NaiveDateTime::parse_from_str(text, MINUTE_FORMAT) {
        return Some(format_utc(naive.and_utc()));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(format_utc(dt.with_timezone(&Utc)));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, SECOND_FORMAT) {
        return Some(format_utc(naive.and_utc()));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| format_utc(naive.and_utc()));
    }
    None
}

fn format_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
