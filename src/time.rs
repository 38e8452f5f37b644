//! Time utilities.
//!
//! All timestamps in the sync engine are Unix milliseconds, matching the
//! persisted-row format (stringified millisecond timestamps).

/// Returns the current Unix timestamp in milliseconds.
pub fn now_timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One hour in milliseconds.
pub const MS_IN_HOUR: i64 = 60 * 60 * 1000;
