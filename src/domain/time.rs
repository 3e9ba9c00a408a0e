//! Absolute-time helpers shared by the horizon builder and forecast aligner.
//!
//! All planner-internal arithmetic happens in UTC; local-time windows
//! (import-forbidden periods, EV allowed-connect windows) resolve against a
//! configured [`chrono_tz::Tz`] only at the edges where the config or the
//! plan output is human-facing.

use chrono::{DateTime, Datelike, Duration as ChronoDuration, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// A half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(end >= start, "interval end must not precede start");
        Self { start, end }
    }

    pub fn duration(&self) -> ChronoDuration {
        self.end - self.start
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration().num_milliseconds() as f64 / 3_600_000.0
    }

    /// Overlap with `other`, in seconds. Zero when disjoint.
    pub fn overlap_seconds(&self, other: &Interval) -> f64 {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if end <= start {
            0.0
        } else {
            (end - start).num_milliseconds() as f64 / 1000.0
        }
    }

    pub fn contains_instant(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

/// Rounds `at` down to the nearest multiple of `minutes`, anchored at UTC
/// midnight of `at`'s own day, expressed in `at`'s local timezone `tz` so
/// that "clock aligned" windows line up with what a person would expect
/// (e.g. 30-minute boundaries at :00/:30 local time, not UTC).
pub fn floor_to_boundary(at: DateTime<Utc>, minutes: i64, tz: Tz) -> DateTime<Utc> {
    assert!(minutes > 0, "boundary step must be positive");
    let local = at.with_timezone(&tz);
    let midnight = local
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time");
    let midnight = tz
        .from_local_datetime(&midnight)
        .single()
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight));
    let elapsed_minutes = (local - midnight).num_minutes();
    let floored_minutes = (elapsed_minutes.div_euclid(minutes)) * minutes;
    (midnight + ChronoDuration::minutes(floored_minutes)).with_timezone(&Utc)
}

/// Rounds `at` *up* to the next multiple of `minutes` from local midnight.
/// Returns `at` unchanged if it already sits on a boundary.
pub fn ceil_to_boundary(at: DateTime<Utc>, minutes: i64, tz: Tz) -> DateTime<Utc> {
    let floored = floor_to_boundary(at, minutes, tz);
    if floored == at {
        at
    } else {
        floored + ChronoDuration::minutes(minutes)
    }
}

/// A local time-of-day window used by import-forbidden periods and EV
/// allowed-connect windows. May wrap past midnight (`start > end`).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LocalTimeWindow {
    /// Minutes since local midnight, inclusive.
    pub start_minute: u16,
    /// Minutes since local midnight, exclusive.
    pub end_minute: u16,
    /// 1-12 inclusive; `None` means "every month".
    #[serde(default)]
    pub months: Option<Vec<u8>>,
}

impl LocalTimeWindow {
    pub fn contains(&self, at: DateTime<Utc>, tz: Tz) -> bool {
        let local = at.with_timezone(&tz);
        if let Some(months) = &self.months {
            if !months.contains(&(local.month() as u8)) {
                return false;
            }
        }
        let minute_of_day = (local.hour() * 60 + local.minute()) as u16;
        if self.start_minute <= self.end_minute {
            minute_of_day >= self.start_minute && minute_of_day < self.end_minute
        } else {
            // wraps midnight, e.g. 22:00-06:00
            minute_of_day >= self.start_minute || minute_of_day < self.end_minute
        }
    }
}
