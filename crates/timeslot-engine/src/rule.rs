//! Recurrence rules: a day expression paired with daily time slots.
//!
//! Supported day expressions:
//! - ISO date, `2024-07-04`
//! - weekday name, `monday` .. `sunday`
//! - month and day, `july 4`
//!
//! Daily slots are comma separated `H:MM-H:MM` ranges, e.g.
//! `08:00-12:00,13:00-17:00`. `24:00` denotes the following midnight.
//!
//! Ordinal forms such as `monday -1 may` or `thursday 4 november` are not
//! supported and are rejected as `UnsupportedDefinition`.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Weekday};

use crate::error::{PeriodError, PeriodResult};
use crate::interval::Interval;
use crate::interval_set::IntervalSet;

/// Leap days recur at most eight years apart (2096 -> 2104).
const MAX_YEARS_BETWEEN_OCCURRENCES: i32 = 8;

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Which calendar days a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayExpression {
    /// A single fixed day.
    IsoDate(NaiveDate),
    /// Every week on this day.
    Weekday(Weekday),
    /// Every year on this month and day.
    ///
    /// `february 29` matches leap years only. Common years get no occurrence
    /// instead of one rolled over to March 1.
    MonthDay { month: u32, day: u32 },
}

impl DayExpression {
    /// ## Summary
    /// Parses a day expression.
    ///
    /// Surrounding whitespace is ignored and names are case-insensitive.
    ///
    /// ## Errors
    /// Returns `PeriodError::UnsupportedDefinition` naming the expression if it
    /// matches none of the supported forms or names a day that cannot exist.
    pub fn parse(expression: &str) -> PeriodResult<Self> {
        let trimmed = expression.trim();
        let lower = trimmed.to_lowercase();

        if is_iso_date_shape(trimmed) {
            return NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(Self::IsoDate)
                .map_err(|e| {
                    PeriodError::UnsupportedDefinition(format!("Invalid date {trimmed}: {e}"))
                });
        }

        if let Some(weekday) = parse_weekday(&lower) {
            return Ok(Self::Weekday(weekday));
        }

        if let Some((month, day)) = parse_month_day(&lower) {
            // 2000 is a leap year, so every day that can ever exist is accepted
            if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
                return Err(PeriodError::UnsupportedDefinition(format!(
                    "Day does not exist: {trimmed}"
                )));
            }
            return Ok(Self::MonthDay { month, day });
        }

        Err(PeriodError::UnsupportedDefinition(format!(
            "Unsupported: {trimmed}"
        )))
    }

    /// ## Summary
    /// Returns the first matching day strictly after `after`.
    ///
    /// Returns `None` once a fixed date has passed, or if the calendar range is
    /// exhausted.
    #[must_use]
    pub fn next_after(&self, after: NaiveDate) -> Option<NaiveDate> {
        match *self {
            Self::IsoDate(date) => (date > after).then_some(date),
            Self::Weekday(weekday) => {
                let target = weekday.num_days_from_monday();
                let current = after.weekday().num_days_from_monday();
                let ahead = match (7 + target - current) % 7 {
                    0 => 7,
                    n => n,
                };
                after.checked_add_days(Days::new(u64::from(ahead)))
            }
            Self::MonthDay { month, day } => (after.year()
                ..=after.year().saturating_add(MAX_YEARS_BETWEEN_OCCURRENCES))
                .filter_map(|year| NaiveDate::from_ymd_opt(year, month, day))
                .find(|candidate| *candidate > after),
        }
    }

    /// ## Summary
    /// Iterates the matching days of the window `[from, to)`.
    ///
    /// A day is yielded when it falls on or after the date of `from` and its
    /// midnight lies before `to`.
    #[must_use]
    pub fn occurrences(&self, from: NaiveDateTime, to: NaiveDateTime) -> Occurrences {
        Occurrences {
            expression: *self,
            cursor: from.date().pred_opt(),
            to,
        }
    }
}

impl FromStr for DayExpression {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DayExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IsoDate(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Weekday(weekday) => f.write_str(weekday_name(*weekday)),
            Self::MonthDay { month, day } => {
                let name = usize::try_from(*month)
                    .ok()
                    .and_then(|m| MONTH_NAMES.get(m.wrapping_sub(1)))
                    .ok_or(fmt::Error)?;
                write!(f, "{name} {day}")
            }
        }
    }
}

/// Iterator over the days a [`DayExpression`] matches inside a window.
#[derive(Debug, Clone)]
pub struct Occurrences {
    expression: DayExpression,
    cursor: Option<NaiveDate>,
    to: NaiveDateTime,
}

impl Iterator for Occurrences {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.expression.next_after(self.cursor?)?;
        if next.and_time(NaiveTime::MIN) >= self.to {
            self.cursor = None;
            return None;
        }
        self.cursor = Some(next);
        Some(next)
    }
}

/// A time-of-day range, stored as offsets from midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DailySlot {
    start: TimeDelta,
    end: TimeDelta,
}

impl DailySlot {
    /// ## Summary
    /// Parses a single `H:MM-H:MM` slot.
    ///
    /// ## Errors
    /// Returns `PeriodError::UnsupportedDefinition` if the token does not match
    /// the grammar, or `PeriodError::ValidationError` if the slot is empty or
    /// inverted.
    pub fn parse(token: &str) -> PeriodResult<Self> {
        let unsupported =
            || PeriodError::UnsupportedDefinition(format!("Unsupported time slot: {token}"));

        let (start, end) = token.split_once('-').ok_or_else(unsupported)?;
        let start = parse_clock(start).ok_or_else(unsupported)?;
        let end = parse_clock(end).ok_or_else(unsupported)?;

        if start >= end {
            return Err(PeriodError::ValidationError(format!(
                "time slot {token} must start before it ends"
            )));
        }

        Ok(Self { start, end })
    }

    /// ## Summary
    /// Parses a comma separated list of slots.
    ///
    /// ## Errors
    /// Fails on the first token that [`DailySlot::parse`] rejects.
    pub fn parse_list(value: &str) -> PeriodResult<Vec<Self>> {
        value
            .trim()
            .split(',')
            .map(|token| Self::parse(token.trim()))
            .collect()
    }

    #[must_use]
    pub const fn start(&self) -> TimeDelta {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> TimeDelta {
        self.end
    }

    /// ## Summary
    /// Places the slot on a calendar day.
    ///
    /// ## Errors
    /// Returns `PeriodError::ValidationError` if the result is not representable.
    pub fn on(&self, day: NaiveDate) -> PeriodResult<Interval> {
        let midnight = day.and_time(NaiveTime::MIN);
        match (
            midnight.checked_add_signed(self.start),
            midnight.checked_add_signed(self.end),
        ) {
            (Some(begin), Some(end)) => Interval::new(begin, end),
            _ => Err(PeriodError::ValidationError(format!(
                "time slot on {day} is out of range"
            ))),
        }
    }
}

impl fmt::Display for DailySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clock = |offset: TimeDelta| {
            let minutes = offset.num_minutes();
            format!("{:02}:{:02}", minutes / 60, minutes % 60)
        };
        write!(f, "{}-{}", clock(self.start), clock(self.end))
    }
}

/// One `(day expression, daily slots)` pair of a time period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    key: String,
    day: DayExpression,
    slots: Vec<DailySlot>,
}

impl RecurrenceRule {
    /// ## Summary
    /// Builds a rule from a raw range key (day expression) and value (slots).
    ///
    /// ## Errors
    /// Returns `PeriodError::UnsupportedDefinition` if either part is not
    /// supported, or `PeriodError::ValidationError` for an inverted slot.
    pub fn parse(key: &str, value: &str) -> PeriodResult<Self> {
        let slots = DailySlot::parse_list(value)?;
        let day = DayExpression::parse(key)?;

        Ok(Self {
            key: key.to_string(),
            day,
            slots,
        })
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub const fn day(&self) -> &DayExpression {
        &self.day
    }

    #[must_use]
    pub fn slots(&self) -> &[DailySlot] {
        &self.slots
    }

    /// ## Summary
    /// Produces one interval per matching day and slot within `window`.
    ///
    /// Slots of the first and last day may extend beyond the window; the
    /// window only selects the days.
    ///
    /// ## Errors
    /// Returns `PeriodError::ValidationError` if an interval cannot be built.
    pub fn to_interval_set(&self, window: &Interval) -> PeriodResult<IntervalSet> {
        let mut intervals = Vec::new();
        for day in self.day.occurrences(window.begin(), window.end()) {
            for slot in &self.slots {
                intervals.push(slot.on(day)?);
            }
        }

        tracing::trace!(
            rule = %self.key,
            count = intervals.len(),
            "Expanded recurrence rule"
        );

        Ok(IntervalSet::from_vec(intervals))
    }
}

/// `dddd-dd-dd`
fn is_iso_date_shape(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

fn parse_weekday(lower: &str) -> Option<Weekday> {
    match lower {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

const fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// `<month name><one whitespace><1-2 digit day>`
fn parse_month_day(lower: &str) -> Option<(u32, u32)> {
    let split = lower.find(char::is_whitespace)?;
    let separator = lower[split..].chars().next()?;
    let name = &lower[..split];
    let digits = &lower[split + separator.len_utf8()..];

    let month = MONTH_NAMES.iter().position(|m| *m == name)?;
    let day = parse_digits(digits, 1, 2)?;

    Some((u32::try_from(month).ok()? + 1, day))
}

/// `H:MM` or `HH:MM`, up to `24:00`.
fn parse_clock(s: &str) -> Option<TimeDelta> {
    let (hours, minutes) = s.split_once(':')?;
    let hours = parse_digits(hours, 1, 2)?;
    let minutes = parse_digits(minutes, 2, 2)?;

    if minutes > 59 || hours > 24 || (hours == 24 && minutes > 0) {
        return None;
    }

    Some(TimeDelta::minutes(i64::from(hours * 60 + minutes)))
}

fn parse_digits(s: &str, min_len: usize, max_len: usize) -> Option<u32> {
    if s.len() < min_len || s.len() > max_len || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
