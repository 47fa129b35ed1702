//! Reconciliation of resolved slots against persisted slot rows.
//!
//! Rows are keyed by `(timeperiod_id, start_time)`. Reconciling yields the
//! rows to insert, the rows whose `end_time` changed, and the rows that are
//! no longer produced. Applying the change set is up to the caller.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Days, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{PeriodError, PeriodResult};
use crate::interval::Interval;
use crate::period::PeriodRegistry;

/// A persisted slot; times are milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRow {
    pub timeperiod_id: String,
    pub start_time: i64,
    pub end_time: i64,
}

impl SlotRow {
    fn key(&self) -> (&str, i64) {
        (&self.timeperiod_id, self.start_time)
    }

    /// Whether the row starts or ends inside `[begin, end)`.
    fn touches_window(&self, begin: i64, end: i64) -> bool {
        (begin..end).contains(&self.start_time) || (begin..end).contains(&self.end_time)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlotChangeSet {
    pub insert: Vec<SlotRow>,
    pub update: Vec<SlotRow>,
    pub delete: Vec<SlotRow>,
}

impl SlotChangeSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.insert.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// ## Summary
/// Builds the synchronization window around `today`.
///
/// The window runs from midnight `days_before` days before `today` to
/// midnight `days_after` days after it.
///
/// ## Errors
/// Returns `PeriodError::ValidationError` if the window is empty or leaves the
/// calendar range.
pub fn sync_window(today: NaiveDate, days_before: u32, days_after: u32) -> PeriodResult<Interval> {
    let begin = today.checked_sub_days(Days::new(u64::from(days_before)));
    let end = today.checked_add_days(Days::new(u64::from(days_after)));

    match (begin, end) {
        (Some(begin), Some(end)) => {
            Interval::new(begin.and_time(NaiveTime::MIN), end.and_time(NaiveTime::MIN))
        }
        _ => Err(PeriodError::ValidationError(format!(
            "sync window around {today} is out of range"
        ))),
    }
}

/// ## Summary
/// Diffs the resolved slots of every period against `existing` rows.
///
/// Only existing rows that start or end inside `window` take part; rows
/// outside it are left alone.
///
/// ## Errors
/// Propagates the first resolution error.
pub fn reconcile(
    registry: &PeriodRegistry,
    existing: &[SlotRow],
    window: &Interval,
) -> PeriodResult<SlotChangeSet> {
    let (window_begin, window_end) = (window.begin_millis(), window.end_millis());
    let current: BTreeMap<(&str, i64), &SlotRow> = existing
        .iter()
        .filter(|row| row.touches_window(window_begin, window_end))
        .map(|row| (row.key(), row))
        .collect();

    let mut changes = SlotChangeSet::default();
    let mut seen = BTreeSet::new();

    for (id, period) in registry.iter() {
        for slot in &registry.resolve(id, window)? {
            let row = SlotRow {
                timeperiod_id: period.id().to_string(),
                start_time: slot.begin_millis(),
                end_time: slot.end_millis(),
            };

            match current.get(&row.key()) {
                Some(stored) if stored.end_time == row.end_time => {}
                Some(_) => changes.update.push(row.clone()),
                None => changes.insert.push(row.clone()),
            }
            seen.insert((row.timeperiod_id, row.start_time));
        }
    }

    changes.delete = current
        .into_iter()
        .filter(|((id, start), _)| !seen.contains(&((*id).to_string(), *start)))
        .map(|(_, row)| row.clone())
        .collect();

    tracing::debug!(
        insert = changes.insert.len(),
        update = changes.update.len(),
        delete = changes.delete.len(),
        "Reconciled period slots"
    );

    Ok(changes)
}
