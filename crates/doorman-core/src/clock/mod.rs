//! Wall-clock time for access log entries
//!
//! The terminal has no RTC. Time is fetched over SNTP once at boot and
//! then carried forward from the monotonic uptime counter.

mod sntp;

pub use sntp::*;

use core::fmt::Write as _;

use chrono::{DateTime, Datelike, Timelike};

/// Unix times at or below this are treated as "not synced yet"
pub const MIN_VALID_UNIX: u64 = 100_000;

/// Length of `YYYY-MM-DDTHH:MM:SS`
pub const TIMESTAMP_LEN: usize = 19;

pub type Timestamp = heapless::String<TIMESTAMP_LEN>;

/// Source of the current Unix time (seconds, UTC).
pub trait Clock {
    /// `None` until the clock has been set.
    fn now_unix(&self) -> Option<u64>;
}

/// Unix time anchored to a monotonic millisecond counter
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock {
    anchor: Option<Anchor>,
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    unix: u64,
    uptime_ms: u64,
}

impl WallClock {
    pub const fn new() -> Self {
        Self { anchor: None }
    }

    /// Record that it was `unix` seconds at `uptime_ms`.
    ///
    /// Times that are obviously unset (before `MIN_VALID_UNIX`) are ignored.
    pub fn set(&mut self, unix: u64, uptime_ms: u64) -> bool {
        if unix <= MIN_VALID_UNIX {
            return false;
        }
        self.anchor = Some(Anchor { unix, uptime_ms });
        true
    }

    /// Unix time at the given uptime.
    pub fn now_at(&self, uptime_ms: u64) -> Option<u64> {
        let anchor = self.anchor?;
        let elapsed = uptime_ms.saturating_sub(anchor.uptime_ms) / 1000;
        Some(anchor.unix + elapsed)
    }
}

/// Render a Unix time as `YYYY-MM-DDTHH:MM:SS` (UTC, no zone suffix).
pub fn format_timestamp(unix: u64) -> Option<Timestamp> {
    let secs = i64::try_from(unix).ok()?;
    let time = DateTime::from_timestamp(secs, 0)?;

    let mut out = Timestamp::new();
    write!(
        out,
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        time.year(),
        time.month(),
        time.day(),
        time.hour(),
        time.minute(),
        time.second()
    )
    .ok()?;
    Some(out)
}

/// Current timestamp from `clock`, or an empty string when it is not set.
pub fn current_timestamp<C: Clock + ?Sized>(clock: &C) -> Timestamp {
    clock
        .now_unix()
        .and_then(format_timestamp)
        .unwrap_or_default()
}
