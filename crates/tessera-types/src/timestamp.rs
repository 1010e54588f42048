use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Format used for every timestamp exposed to clients.
const ISO_8601_Z: &str = "%Y-%m-%dT%H:%M:%SZ";

/// UTC wall-clock timestamp with one-second resolution.
///
/// Rendered as ISO-8601 with a trailing literal `Z` (never `+00:00`), for
/// example `2014-10-30T04:25:21Z`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    /// Seconds since the UNIX epoch.
    secs: i64,
}

impl Timestamp {
    /// The current time, truncated to whole seconds.
    pub fn now() -> Self {
        Self {
            secs: Utc::now().timestamp(),
        }
    }

    /// Create from seconds since the UNIX epoch.
    pub const fn from_unix(secs: i64) -> Self {
        Self { secs }
    }

    /// Seconds since the UNIX epoch.
    pub const fn unix(&self) -> i64 {
        self.secs
    }

    /// The timestamp as a chrono `DateTime<Utc>`.
    ///
    /// Values outside chrono's range clamp to the epoch.
    pub fn to_datetime(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.secs, 0)
            .single()
            .unwrap_or_default()
    }

    /// ISO-8601 rendering with a trailing `Z`.
    pub fn to_iso8601(&self) -> String {
        self.to_datetime().format(ISO_8601_Z).to_string()
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.to_iso8601())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_iso8601())
    }
}
