//! Time-related utilities with clock abstraction for testability.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, TimeZone, Utc};

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Get current Unix timestamp (milliseconds)
    fn now_millis(&self) -> i64;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        get_timestamp()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: i64,
}

impl FixedClock {
    /// Create a new fixed clock with the given timestamp
    pub fn new(fixed_time_millis: i64) -> Self {
        Self {
            fixed_time: fixed_time_millis,
        }
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.fixed_time
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    /// Move the clock forward by `millis`.
    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Get current Unix timestamp (milliseconds)
pub fn get_timestamp() -> i64 {
    Utc::now().timestamp_millis()
}

/// Build a fixed offset from whole hours, falling back to UTC when out of range.
pub fn offset_from_hours(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}

/// Convert Unix timestamp (milliseconds) to RFC 3339 in the given offset.
pub fn timestamp_to_rfc3339(timestamp_millis: i64, offset: FixedOffset) -> String {
    match DateTime::from_timestamp_millis(timestamp_millis) {
        Some(dt) => dt.with_timezone(&offset).to_rfc3339(),
        None => String::new(),
    }
}

/// Calendar date of a timestamp as seen from `offset`.
pub fn local_date(timestamp_millis: i64, offset: FixedOffset) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(timestamp_millis)
        .map(|dt| dt.with_timezone(&offset).date_naive())
}

/// Milliseconds from `timestamp_millis` until the next local midnight in `offset`.
pub fn millis_until_next_midnight(timestamp_millis: i64, offset: FixedOffset) -> i64 {
    let Some(today) = local_date(timestamp_millis, offset) else {
        return Duration::days(1).num_milliseconds();
    };
    let next_midnight = today
        .succ_opt()
        .and_then(|tomorrow| tomorrow.and_hms_opt(0, 0, 0))
        .and_then(|naive| offset.from_local_datetime(&naive).single());

    match next_midnight {
        Some(midnight) => (midnight.timestamp_millis() - timestamp_millis).max(1),
        None => Duration::days(1).num_milliseconds(),
    }
}
