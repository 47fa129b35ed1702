//! Time periods and the registry that links them.
//!
//! Periods reference each other through [`PeriodId`] handles into a
//! [`PeriodRegistry`]. A registry is assembled with a
//! [`PeriodRegistryBuilder`] and is immutable once built, so a single
//! registry can be shared across threads and resolved concurrently.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{Local, NaiveDateTime, TimeDelta};

use crate::error::{PeriodError, PeriodResult};
use crate::interval::Interval;
use crate::interval_set::IntervalSet;
use crate::rule::RecurrenceRule;

/// Default half-width of the window resolved by activity checks.
///
/// Assumes no rule produces an interval longer than this without a
/// recurrence point inside the window.
pub const DEFAULT_ACTIVITY_MARGIN_HOURS: i64 = 48;

/// Handle of a period inside its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeriodId(usize);

impl PeriodId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PeriodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named, recurring definition of when something is active.
#[derive(Debug, Clone)]
pub struct TimePeriod {
    id: String,
    name: String,
    prefer_includes: bool,
    rules: BTreeMap<String, RecurrenceRule>,
    includes: Vec<PeriodId>,
    excludes: Vec<PeriodId>,
}

impl TimePeriod {
    fn new(id: String, name: String, prefer_includes: bool) -> Self {
        Self {
            id,
            name,
            prefer_includes,
            rules: BTreeMap::new(),
            includes: Vec::new(),
            excludes: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// When set, includes are applied after excludes and may re-add excluded time.
    #[must_use]
    pub const fn prefer_includes(&self) -> bool {
        self.prefer_includes
    }

    pub fn rules(&self) -> impl Iterator<Item = &RecurrenceRule> {
        self.rules.values()
    }

    #[must_use]
    pub fn includes(&self) -> &[PeriodId] {
        &self.includes
    }

    #[must_use]
    pub fn excludes(&self) -> &[PeriodId] {
        &self.excludes
    }

    /// ## Summary
    /// Union of this period's own rules over `window`, ignoring links.
    ///
    /// ## Errors
    /// Propagates rule expansion failures.
    pub fn own_slots(&self, window: &Interval) -> PeriodResult<IntervalSet> {
        self.rules.values().try_fold(IntervalSet::new(), |acc, rule| {
            Ok(acc.with(&rule.to_interval_set(window)?))
        })
    }

    fn add_rule(&mut self, rule: RecurrenceRule) -> PeriodResult<()> {
        if self.rules.contains_key(rule.key()) {
            return Err(PeriodError::DuplicateKey(format!(
                "Cannot set range key twice: {} (period {})",
                rule.key(),
                self.id
            )));
        }
        self.rules.insert(rule.key().to_string(), rule);
        Ok(())
    }
}

/// Collects periods, rules and links before freezing them into a registry.
#[derive(Debug, Default)]
pub struct PeriodRegistryBuilder {
    periods: Vec<TimePeriod>,
    index: HashMap<String, PeriodId>,
    activity_margin: Option<TimeDelta>,
}

impl PeriodRegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the window half-width used by activity checks.
    #[must_use]
    pub fn with_activity_margin(mut self, margin: TimeDelta) -> Self {
        self.activity_margin = Some(margin);
        self
    }

    /// ## Summary
    /// Registers a new period.
    ///
    /// ## Errors
    /// Returns `PeriodError::DuplicateKey` if a period with the same id exists.
    pub fn add_period(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        prefer_includes: bool,
    ) -> PeriodResult<PeriodId> {
        let id = id.into();
        if self.index.contains_key(&id) {
            return Err(PeriodError::DuplicateKey(format!(
                "Cannot register period twice: {id}"
            )));
        }

        let handle = PeriodId(self.periods.len());
        self.index.insert(id.clone(), handle);
        self.periods.push(TimePeriod::new(id, name.into(), prefer_includes));

        Ok(handle)
    }

    /// ## Summary
    /// Parses and attaches a rule to `period`.
    ///
    /// ## Errors
    /// Returns `PeriodError::UnknownPeriod` for a foreign handle,
    /// `PeriodError::DuplicateKey` if the period already has a rule under `key`,
    /// or the parse error of [`RecurrenceRule::parse`].
    pub fn add_rule(&mut self, period: PeriodId, key: &str, value: &str) -> PeriodResult<()> {
        let rule = RecurrenceRule::parse(key, value)?;
        self.period_mut(period)?.add_rule(rule)
    }

    /// ## Summary
    /// Adds `target` to the includes of `period`.
    ///
    /// ## Errors
    /// Returns `PeriodError::UnknownPeriod` if either handle is foreign.
    pub fn add_include(&mut self, period: PeriodId, target: PeriodId) -> PeriodResult<()> {
        self.check(target)?;
        self.period_mut(period)?.includes.push(target);
        Ok(())
    }

    /// ## Summary
    /// Adds `target` to the excludes of `period`.
    ///
    /// ## Errors
    /// Returns `PeriodError::UnknownPeriod` if either handle is foreign.
    pub fn add_exclude(&mut self, period: PeriodId, target: PeriodId) -> PeriodResult<()> {
        self.check(target)?;
        self.period_mut(period)?.excludes.push(target);
        Ok(())
    }

    /// Finds a registered period by its external id.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<PeriodId> {
        self.index.get(id).copied()
    }

    /// Freezes the builder.
    #[must_use]
    pub fn build(self) -> PeriodRegistry {
        tracing::debug!(periods = self.periods.len(), "Period registry built");

        PeriodRegistry {
            periods: self.periods,
            index: self.index,
            activity_margin: self
                .activity_margin
                .unwrap_or_else(|| TimeDelta::hours(DEFAULT_ACTIVITY_MARGIN_HOURS)),
        }
    }

    fn check(&self, period: PeriodId) -> PeriodResult<()> {
        if period.0 < self.periods.len() {
            Ok(())
        } else {
            Err(PeriodError::UnknownPeriod(period.to_string()))
        }
    }

    fn period_mut(&mut self, period: PeriodId) -> PeriodResult<&mut TimePeriod> {
        self.periods
            .get_mut(period.0)
            .ok_or_else(|| PeriodError::UnknownPeriod(period.to_string()))
    }
}

/// Immutable set of linked periods.
#[derive(Debug, Clone)]
pub struct PeriodRegistry {
    periods: Vec<TimePeriod>,
    index: HashMap<String, PeriodId>,
    activity_margin: TimeDelta,
}

impl PeriodRegistry {
    #[must_use]
    pub fn builder() -> PeriodRegistryBuilder {
        PeriodRegistryBuilder::new()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    #[must_use]
    pub const fn activity_margin(&self) -> TimeDelta {
        self.activity_margin
    }

    /// Finds a period by its external id.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<PeriodId> {
        self.index.get(id).copied()
    }

    /// ## Summary
    /// Returns the period behind a handle.
    ///
    /// ## Errors
    /// Returns `PeriodError::UnknownPeriod` if the handle is not from this registry.
    pub fn get(&self, period: PeriodId) -> PeriodResult<&TimePeriod> {
        self.periods
            .get(period.0)
            .ok_or_else(|| PeriodError::UnknownPeriod(period.to_string()))
    }

    /// Handles of all periods in registration order.
    pub fn ids(&self) -> impl Iterator<Item = PeriodId> + '_ {
        (0..self.periods.len()).map(PeriodId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PeriodId, &TimePeriod)> {
        self.periods
            .iter()
            .enumerate()
            .map(|(index, period)| (PeriodId(index), period))
    }

    /// ## Summary
    /// Resolves a period, including its links, over `window`.
    ///
    /// With `prefer_includes` the result is `(own - excluded) + included`,
    /// otherwise `(own + included) - excluded`. Linked periods are resolved
    /// recursively over the same window.
    ///
    /// ## Errors
    /// Returns `PeriodError::CycleDetected` if the period reaches itself through
    /// its links, `PeriodError::UnknownPeriod` for a foreign handle, or a rule
    /// expansion error.
    #[tracing::instrument(skip(self, window), fields(window = %window))]
    pub fn resolve(&self, period: PeriodId, window: &Interval) -> PeriodResult<IntervalSet> {
        let mut chain = Vec::new();
        self.resolve_in(period, window, &mut chain)
    }

    fn resolve_in(
        &self,
        period: PeriodId,
        window: &Interval,
        chain: &mut Vec<PeriodId>,
    ) -> PeriodResult<IntervalSet> {
        let current = self.get(period)?;

        if chain.contains(&period) {
            let path = chain
                .iter()
                .chain(std::iter::once(&period))
                .filter_map(|id| self.periods.get(id.0))
                .map(TimePeriod::id)
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(PeriodError::CycleDetected(path));
        }
        chain.push(period);

        let own = current.own_slots(window)?;
        let excluded = self.resolve_all(&current.excludes, window, chain)?;
        let included = self.resolve_all(&current.includes, window, chain)?;

        chain.pop();

        let resolved = if current.prefer_includes {
            own.without(&excluded).with(&included)
        } else {
            own.with(&included).without(&excluded)
        };

        tracing::trace!(
            period = %current.id,
            own = own.len(),
            excluded = excluded.len(),
            included = included.len(),
            resolved = resolved.len(),
            "Resolved period"
        );

        Ok(resolved)
    }

    fn resolve_all(
        &self,
        periods: &[PeriodId],
        window: &Interval,
        chain: &mut Vec<PeriodId>,
    ) -> PeriodResult<IntervalSet> {
        periods.iter().try_fold(IntervalSet::new(), |acc, linked| {
            Ok(acc.with(&self.resolve_in(*linked, window, chain)?))
        })
    }

    /// ## Summary
    /// Checks whether `period` is active at `instant`.
    ///
    /// Only the window `[instant - margin, instant + margin)` is resolved,
    /// see [`PeriodRegistry::activity_margin`]. Intervals reaching `instant`
    /// from a day before that window are not seen.
    ///
    /// ## Errors
    /// Propagates resolution errors.
    pub fn is_active(&self, period: PeriodId, instant: NaiveDateTime) -> PeriodResult<bool> {
        let window = Interval::around(instant, self.activity_margin)?;
        Ok(self.resolve(period, &window)?.contains(instant))
    }

    /// ## Summary
    /// Checks whether `period` is active at the current local time.
    ///
    /// ## Errors
    /// Propagates resolution errors.
    pub fn is_active_now(&self, period: PeriodId) -> PeriodResult<bool> {
        self.is_active(period, Local::now().naive_local())
    }
}
