//! Time and timestamp helpers.

use chrono::{DateTime, TimeDelta, Utc};

/// UTC timestamp used for motion tracking, alert cooldowns and event times.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Convert milliseconds since the Unix epoch into a [`Timestamp`].
///
/// Returns `None` when the value is out of chrono's representable range.
#[must_use]
pub fn from_millis(millis: i64) -> Option<Timestamp> {
    DateTime::from_timestamp_millis(millis)
}

/// Elapsed time between `earlier` and `later`, clamped at zero.
#[must_use]
pub fn elapsed(earlier: Timestamp, later: Timestamp) -> TimeDelta {
    (later - earlier).max(TimeDelta::zero())
}
