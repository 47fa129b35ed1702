//! Half-open `[begin, end)` time intervals.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeDelta};
use serde::Serialize;
use timeslot_core::error::CoreError;

use crate::error::{PeriodError, PeriodResult};

/// A non-empty, half-open time range `[begin, end)`.
///
/// Timestamps are naive civil date-times; every interval handled by the
/// engine is assumed to live in the same calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Interval {
    begin: NaiveDateTime,
    end: NaiveDateTime,
}

impl Interval {
    /// ## Summary
    /// Creates an interval from its bounds.
    ///
    /// ## Errors
    /// Returns `PeriodError::ValidationError` if `begin` is not strictly before `end`.
    pub fn new(begin: NaiveDateTime, end: NaiveDateTime) -> PeriodResult<Self> {
        if begin >= end {
            return Err(PeriodError::ValidationError(format!(
                "interval begin ({begin}) must be before end ({end})"
            )));
        }
        Ok(Self { begin, end })
    }

    /// ## Summary
    /// Creates an interval from millisecond Unix timestamps.
    ///
    /// ## Errors
    /// Returns `CoreError::InvalidInput` if a timestamp is out of range, or
    /// `PeriodError::ValidationError` if the bounds are not ordered.
    pub fn from_millis(begin: i64, end: i64) -> PeriodResult<Self> {
        Self::new(naive_from_millis(begin)?, naive_from_millis(end)?)
    }

    /// ## Summary
    /// Creates the window `[instant - margin, instant + margin)`.
    ///
    /// ## Errors
    /// Returns `PeriodError::ValidationError` if the margin is not positive or
    /// the window leaves the representable range.
    pub fn around(instant: NaiveDateTime, margin: TimeDelta) -> PeriodResult<Self> {
        let begin = instant.checked_sub_signed(margin);
        let end = instant.checked_add_signed(margin);
        match (begin, end) {
            (Some(begin), Some(end)) => Self::new(begin, end),
            _ => Err(PeriodError::ValidationError(format!(
                "window of {margin} around {instant} is out of range"
            ))),
        }
    }

    #[must_use]
    pub const fn begin(&self) -> NaiveDateTime {
        self.begin
    }

    #[must_use]
    pub const fn end(&self) -> NaiveDateTime {
        self.end
    }

    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.begin
    }

    /// Begin as milliseconds since the Unix epoch.
    #[must_use]
    pub fn begin_millis(&self) -> i64 {
        self.begin.and_utc().timestamp_millis()
    }

    /// End as milliseconds since the Unix epoch.
    #[must_use]
    pub fn end_millis(&self) -> i64 {
        self.end.and_utc().timestamp_millis()
    }

    /// Returns `true` if `begin <= instant < end`.
    #[must_use]
    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.begin <= instant && instant < self.end
    }

    /// Returns `true` if both intervals share at least one instant.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.begin < other.end && other.begin < self.end
    }

    /// Returns `true` if the intervals overlap or one ends where the other begins.
    #[must_use]
    pub fn touches(&self, other: &Self) -> bool {
        self.begin <= other.end && other.begin <= self.end
    }

    /// Smallest interval covering both operands.
    #[must_use]
    pub fn hull(&self, other: &Self) -> Self {
        Self {
            begin: self.begin.min(other.begin),
            end: self.end.max(other.end),
        }
    }

    /// ## Summary
    /// Removes `cut` from this interval.
    ///
    /// Returns the part before `cut` and the part after it; either may be
    /// missing. A non-overlapping `cut` leaves the interval untouched in the
    /// first slot.
    #[must_use]
    pub fn subtract(&self, cut: &Self) -> [Option<Self>; 2] {
        if !self.overlaps(cut) {
            return [Some(*self), None];
        }

        let before = (self.begin < cut.begin).then_some(Self {
            begin: self.begin,
            end: cut.begin,
        });
        let after = (self.end > cut.end).then_some(Self {
            begin: cut.end,
            end: self.end,
        });

        [before, after]
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.begin, self.end)
    }
}

fn naive_from_millis(millis: i64) -> PeriodResult<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| {
            CoreError::InvalidInput(format!("timestamp {millis} ms is out of range")).into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn interval(from: (u32, u32), to: (u32, u32)) -> Interval {
        Interval::new(at(1, from.0, from.1), at(1, to.0, to.1)).unwrap()
    }

    #[test]
    fn new_rejects_empty_and_inverted() {
        assert!(matches!(
            Interval::new(at(1, 9, 0), at(1, 9, 0)),
            Err(PeriodError::ValidationError(_))
        ));
        assert!(matches!(
            Interval::new(at(1, 10, 0), at(1, 9, 0)),
            Err(PeriodError::ValidationError(_))
        ));
    }

    #[test]
    fn contains_is_half_open() {
        let slot = interval((9, 0), (10, 0));
        assert!(slot.contains(at(1, 9, 0)));
        assert!(slot.contains(at(1, 9, 59)));
        assert!(!slot.contains(at(1, 10, 0)));
        assert!(!slot.contains(at(1, 8, 59)));
    }

    #[test]
    fn overlaps_and_touches() {
        let a = interval((9, 0), (10, 0));
        let b = interval((10, 0), (11, 0));
        let c = interval((9, 30), (12, 0));

        assert!(!a.overlaps(&b));
        assert!(a.touches(&b));
        assert!(a.overlaps(&c));
        assert_eq!(a.hull(&b), interval((9, 0), (11, 0)));
    }

    #[test]
    fn subtract_splits_around_cut() {
        let slot = interval((8, 0), (18, 0));

        let [before, after] = slot.subtract(&interval((12, 0), (13, 0)));
        assert_eq!(before, Some(interval((8, 0), (12, 0))));
        assert_eq!(after, Some(interval((13, 0), (18, 0))));

        let [before, after] = slot.subtract(&interval((7, 0), (19, 0)));
        assert_eq!(before, None);
        assert_eq!(after, None);

        let [before, after] = slot.subtract(&interval((18, 0), (19, 0)));
        assert_eq!(before, Some(slot));
        assert_eq!(after, None);
    }

    #[test]
    fn millis_use_epoch_boundaries() {
        let slot = Interval::from_millis(0, 3_600_000).unwrap();
        assert_eq!(slot.begin_millis(), 0);
        assert_eq!(slot.end_millis(), 3_600_000);
        assert_eq!(slot.duration(), TimeDelta::hours(1));

        assert!(matches!(
            Interval::from_millis(i64::MAX, i64::MAX),
            Err(PeriodError::CoreError(CoreError::InvalidInput(_)))
        ));
    }

    #[test]
    fn around_spans_both_directions() {
        let window = Interval::around(at(3, 12, 0), TimeDelta::days(2)).unwrap();
        assert_eq!(window.begin(), at(1, 12, 0));
        assert_eq!(window.end(), at(5, 12, 0));

        assert!(Interval::around(at(3, 12, 0), TimeDelta::zero()).is_err());
    }

    #[test]
    fn display_shows_half_open_range() {
        let slot = interval((9, 0), (10, 0));
        assert_eq!(slot.to_string(), "[2024-01-01 09:00:00, 2024-01-01 10:00:00)");
    }
}
