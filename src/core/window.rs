//! Treatment window oracle.
//!
//! Windows open at fixed hours of the civil day and stay open for a fixed
//! length. Every check converts the instant into the configured offset first,
//! so the answer never depends on the host's local zone.

use chrono::{Duration, FixedOffset, NaiveDate, TimeZone};

use crate::config::ScheduleConfig;
use crate::core::record::Timestamp;
use crate::error::Result;

/// One occurrence of a treatment window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Window {
    /// Inclusive on both ends.
    pub fn contains(&self, instant: Timestamp) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Answers whether a treatment window is open at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowOracle {
    offset: FixedOffset,
    start_hours: Vec<u32>,
    length: Duration,
}

impl WindowOracle {
    /// Build an oracle. Hours outside 0-23 are dropped.
    pub fn new(offset: FixedOffset, start_hours: &[u32], length: Duration) -> Self {
        let mut start_hours: Vec<u32> = start_hours.iter().copied().filter(|h| *h < 24).collect();
        start_hours.sort_unstable();
        start_hours.dedup();
        Self {
            offset,
            start_hours,
            length,
        }
    }

    pub fn from_config(schedule: &ScheduleConfig) -> Result<Self> {
        Ok(Self::new(
            schedule.offset()?,
            &schedule.window_hours,
            schedule.window_length(),
        ))
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn length(&self) -> Duration {
        self.length
    }

    /// Whether any window is open at `now`.
    pub fn is_open(&self, now: Timestamp) -> bool {
        self.current_window(now).is_some()
    }

    /// The window containing `now`, if any.
    ///
    /// Yesterday's occurrences are checked too, so a window long enough to
    /// cross midnight stays open after it.
    pub fn current_window(&self, now: Timestamp) -> Option<Window> {
        let local = now.with_timezone(&self.offset);
        let today = local.date_naive();
        let days = [today.pred_opt(), Some(today)];

        days.into_iter()
            .flatten()
            .flat_map(|day| self.windows_on(day))
            .filter(|window| window.contains(local))
            .max_by_key(|window| window.end)
    }

    /// Earliest window start strictly after `now`.
    pub fn next_opening(&self, now: Timestamp) -> Option<Timestamp> {
        let local = now.with_timezone(&self.offset);
        let today = local.date_naive();
        let days = [Some(today), today.succ_opt()];

        days.into_iter()
            .flatten()
            .flat_map(|day| self.windows_on(day))
            .map(|window| window.start)
            .find(|start| *start > local)
    }

    /// All windows starting on `day`, in start order.
    fn windows_on(&self, day: NaiveDate) -> Vec<Window> {
        self.start_hours
            .iter()
            .filter_map(|hour| day.and_hms_opt(*hour, 0, 0))
            .filter_map(|naive| self.offset.from_local_datetime(&naive).single())
            .map(|start| Window {
                start,
                end: start + self.length,
            })
            .collect()
    }
}
