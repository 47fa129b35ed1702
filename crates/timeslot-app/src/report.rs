//! JSON reports produced by the `timeslot` commands.

use std::path::Path;

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Serialize;
use timeslot_core::config::ResolverConfig;
use timeslot_engine::error::PeriodError;
use timeslot_engine::filter::filter_active;
use timeslot_engine::interval::Interval;
use timeslot_engine::interval_set::IntervalSet;
use timeslot_engine::period::{PeriodId, PeriodRegistry};
use timeslot_engine::sync::{SlotChangeSet, SlotRow, reconcile, sync_window};

use crate::cli::Command;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize)]
pub struct PeriodSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodSlots {
    #[serde(flatten)]
    pub period: PeriodSummary,
    pub slots: IntervalSet,
    /// `(begin, end)` in milliseconds since the Unix epoch.
    pub millis: Vec<(i64, i64)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityReport {
    pub instant: NaiveDateTime,
    pub active: Vec<PeriodSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub window: Interval,
    pub changes: SlotChangeSet,
}

/// ## Summary
/// Executes a parsed command against a loaded registry.
///
/// `existing_rows` holds the JSON array of stored slot rows for `sync`.
///
/// ## Errors
/// Returns resolution errors, unknown period ids, or malformed row documents.
pub fn execute(
    command: &Command,
    registry: &PeriodRegistry,
    resolver: &ResolverConfig,
    existing_rows: Option<&str>,
) -> AppResult<serde_json::Value> {
    let value = match command {
        Command::Slots { from, to, periods } => {
            let window = Interval::new(*from, *to)?;
            to_value(&slots_report(registry, &window, periods)?)?
        }
        Command::Active { at } => {
            let instant = at.unwrap_or_else(|| Local::now().naive_local());
            to_value(&activity_report(registry, instant)?)?
        }
        Command::Sync { today, .. } => {
            let today = today.unwrap_or_else(|| Local::now().date_naive());
            to_value(&sync_report(registry, resolver, today, existing_rows)?)?
        }
    };

    Ok(value)
}

/// ## Summary
/// Resolves the named periods, or all periods, over `window`.
///
/// ## Errors
/// Returns `PeriodError::UnknownPeriod` for an id not in the registry, or the
/// first resolution error.
pub fn slots_report(
    registry: &PeriodRegistry,
    window: &Interval,
    periods: &[String],
) -> AppResult<Vec<PeriodSlots>> {
    let ids = select(registry, periods)?;

    ids.into_iter()
        .map(|id| -> AppResult<PeriodSlots> {
            let slots = registry.resolve(id, window)?;
            Ok(PeriodSlots {
                period: summary(registry, id)?,
                millis: slots.to_millis(),
                slots,
            })
        })
        .collect()
}

/// ## Summary
/// Lists the periods active at `instant`.
///
/// ## Errors
/// Propagates resolution errors.
pub fn activity_report(
    registry: &PeriodRegistry,
    instant: NaiveDateTime,
) -> AppResult<ActivityReport> {
    let ids: Vec<PeriodId> = registry.ids().collect();
    let active = filter_active(registry, &ids, instant)?
        .into_iter()
        .map(|id| summary(registry, id))
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ActivityReport { instant, active })
}

/// ## Summary
/// Reconciles the configured sync window around `today` with stored rows.
///
/// ## Errors
/// Returns a format error for malformed rows, or resolution errors.
pub fn sync_report(
    registry: &PeriodRegistry,
    resolver: &ResolverConfig,
    today: NaiveDate,
    existing_rows: Option<&str>,
) -> AppResult<SyncReport> {
    let existing: Vec<SlotRow> = match existing_rows {
        Some(json) => serde_json::from_str(json).map_err(PeriodError::from)?,
        None => Vec::new(),
    };
    let window = sync_window(today, resolver.sync_days_before, resolver.sync_days_after)?;
    let changes = reconcile(registry, &existing, &window)?;

    Ok(SyncReport { window, changes })
}

fn select(registry: &PeriodRegistry, periods: &[String]) -> AppResult<Vec<PeriodId>> {
    if periods.is_empty() {
        return Ok(registry.ids().collect());
    }

    periods
        .iter()
        .map(|id| {
            registry
                .lookup(id)
                .ok_or_else(|| AppError::PeriodError(PeriodError::UnknownPeriod(id.clone())))
        })
        .collect()
}

fn summary(registry: &PeriodRegistry, id: PeriodId) -> AppResult<PeriodSummary> {
    let period = registry.get(id)?;
    Ok(PeriodSummary {
        id: period.id().to_string(),
        name: period.name().to_string(),
    })
}

/// ## Summary
/// Reads an input file such as the period definitions or stored slot rows.
///
/// ## Errors
/// Returns `AppError::ReadError` naming the path.
pub fn read_input(path: &Path) -> AppResult<String> {
    std::fs::read_to_string(path).map_err(|source| AppError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}

fn to_value<T: Serialize>(report: &T) -> AppResult<serde_json::Value> {
    Ok(serde_json::to_value(report)?)
}
