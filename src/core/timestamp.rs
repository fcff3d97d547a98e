//! The one timestamp type used across patchsync.
//!
//! Watermarks, remote release times, archive entry times and file modification
//! times are all compared against each other, so they share a single
//! representation ([`chrono::DateTime<Utc>`]) with exactly one parse routine for
//! the patch page format and one serde representation for persistence.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

use crate::core::PatchError;

/// Format of the timestamps shown next to each file on the patch page.
pub const LISTING_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A UTC instant with second-level meaning.
///
/// Serializes transparently as RFC 3339 through chrono's serde support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// 1970-01-01T00:00:00Z.
    ///
    /// Used as the watermark when nothing has been applied yet and as the effective
    /// modification time of files that do not exist. Zip timestamps cannot
    /// express anything before 1980, so every archive entry is newer than this.
    pub const EPOCH: Self = Self(DateTime::<Utc>::UNIX_EPOCH);

    /// Parse a patch page timestamp such as `2024-06-01 10:00`.
    ///
    /// Surrounding whitespace is ignored. The page carries no zone, so the value
    /// is taken as UTC.
    pub fn parse_listing(input: &str) -> Result<Self, PatchError> {
        let trimmed = input.trim();
        NaiveDateTime::parse_from_str(trimmed, LISTING_FORMAT)
            .map(|naive| Self(naive.and_utc()))
            .map_err(|e| PatchError::TimestampParse {
                input: trimmed.to_string(),
                reason: e.to_string(),
            })
    }

    /// Build a timestamp from whole seconds since the unix epoch.
    pub fn from_unix(secs: i64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(Self)
    }

    /// Convert an MS-DOS zip date/time. The DOS fields carry no zone; they are read as UTC.
    pub fn from_zip(dt: zip::DateTime) -> Option<Self> {
        NaiveDate::from_ymd_opt(i32::from(dt.year()), u32::from(dt.month()), u32::from(dt.day()))?
            .and_hms_opt(u32::from(dt.hour()), u32::from(dt.minute()), u32::from(dt.second()))
            .map(|naive| Self(naive.and_utc()))
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        Self(DateTime::<Utc>::from(time))
    }

    pub fn to_system_time(self) -> SystemTime {
        SystemTime::from(self.0)
    }

    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Render in the patch page format. Inverse of [`parse_listing`](Self::parse_listing)
    /// for values with zero seconds.
    pub fn to_listing(&self) -> String {
        self.0.format(LISTING_FORMAT).to_string()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::EPOCH
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}
