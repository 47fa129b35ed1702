//! `IntervalSet`: sorted, disjoint, non-adjacent collection of [`Interval`]s.
//!
//! Invariants (always held):
//!    - intervals are sorted by `begin()`
//!    - no two intervals overlap or touch; `[1, 3)` and `[3, 5)` are stored as `[1, 5)`
//!    - semantics are half-open `[begin, end)`
//!
//! Sets are immutable values: `with` and `without` return new sets.

use std::slice;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::interval::Interval;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    /// Creates a new, empty `IntervalSet`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            intervals: Vec::new(),
        }
    }

    /// ## Summary
    /// Creates a set from arbitrary intervals.
    ///
    /// The input may be unsorted and may contain overlapping or touching
    /// intervals; it is sorted and coalesced to satisfy the set's invariants.
    #[must_use]
    pub fn from_vec(mut intervals: Vec<Interval>) -> Self {
        intervals.sort_unstable_by_key(Interval::begin);

        let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
        for interval in intervals {
            match merged.last_mut() {
                Some(current) if interval.begin() <= current.end() => {
                    *current = current.hull(&interval);
                }
                _ => merged.push(interval),
            }
        }

        Self { intervals: merged }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn iter(&self) -> slice::Iter<'_, Interval> {
        self.intervals.iter()
    }

    /// Returns the intervals as `(begin, end)` millisecond Unix timestamps.
    #[must_use]
    pub fn to_millis(&self) -> Vec<(i64, i64)> {
        self.intervals
            .iter()
            .map(|interval| (interval.begin_millis(), interval.end_millis()))
            .collect()
    }

    /// ## Summary
    /// Returns `true` if some interval contains `instant`.
    ///
    /// Scans the whole set.
    #[must_use]
    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.intervals
            .iter()
            .any(|interval| interval.contains(instant))
    }

    /// ## Summary
    /// Union of both sets.
    ///
    /// Overlapping and touching intervals are merged.
    #[must_use]
    pub fn with(&self, other: &Self) -> Self {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }

        let mut all = Vec::with_capacity(self.len() + other.len());
        all.extend_from_slice(&self.intervals);
        all.extend_from_slice(&other.intervals);

        Self::from_vec(all)
    }

    /// ## Summary
    /// Difference: every instant of `self` that is not in `subtract`.
    ///
    /// Each interval is clipped against every subtracted interval in turn;
    /// the fragments left by one cut are clipped again by the next.
    #[must_use]
    pub fn without(&self, subtract: &Self) -> Self {
        if self.is_empty() || subtract.is_empty() {
            return self.clone();
        }

        let mut result = Vec::with_capacity(self.len());
        for original in &self.intervals {
            let mut remaining = vec![*original];

            for cut in &subtract.intervals {
                remaining = remaining
                    .iter()
                    .flat_map(|part| part.subtract(cut))
                    .flatten()
                    .collect();

                if remaining.is_empty() {
                    break;
                }
            }

            result.extend(remaining);
        }

        Self::from_vec(result)
    }
}

impl FromIterator<Interval> for IntervalSet {
    fn from_iter<I: IntoIterator<Item = Interval>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a IntervalSet {
    type Item = &'a Interval;
    type IntoIter = slice::Iter<'a, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}

impl IntoIterator for IntervalSet {
    type Item = Interval;
    type IntoIter = std::vec::IntoIter<Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn iv(from: (u32, u32), to: (u32, u32)) -> Interval {
        Interval::new(at(from.0, from.1), at(to.0, to.1)).unwrap()
    }

    fn set(intervals: &[((u32, u32), (u32, u32))]) -> IntervalSet {
        intervals.iter().map(|&(from, to)| iv(from, to)).collect()
    }

    fn assert_normalized(set: &IntervalSet) {
        for pair in set.as_slice().windows(2) {
            assert!(
                pair[0].end() < pair[1].begin(),
                "{} and {} overlap or touch",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn from_vec_sorts_and_merges() {
        let merged = set(&[
            ((14, 0), (15, 0)),
            ((9, 0), (10, 0)),
            ((9, 30), (11, 0)),
            ((16, 0), (17, 0)),
            ((14, 30), (14, 45)),
        ]);

        assert_eq!(
            merged.as_slice(),
            &[iv((9, 0), (11, 0)), iv((14, 0), (15, 0)), iv((16, 0), (17, 0))]
        );
        assert_normalized(&merged);
    }

    #[test]
    fn adjacent_intervals_merge() {
        let a = iv((9, 0), (10, 0));
        let b = iv((10, 0), (11, 0));

        let merged = IntervalSet::from_vec(vec![a, b]).with(&IntervalSet::new());
        assert_eq!(merged.as_slice(), &[iv((9, 0), (11, 0))]);
    }

    #[test]
    fn with_empty_returns_other_operand() {
        let s = set(&[((9, 0), (10, 0))]);
        assert_eq!(IntervalSet::new().with(&s), s);
        assert_eq!(s.with(&IntervalSet::new()), s);
        assert!(IntervalSet::new().with(&IntervalSet::new()).is_empty());
    }

    #[test]
    fn with_is_idempotent() {
        let s = set(&[((9, 0), (10, 0)), ((12, 0), (13, 0))]);
        assert_eq!(s.with(&s), s);
    }

    #[test]
    fn with_bridges_gaps_through_touching_intervals() {
        let left = set(&[((9, 0), (10, 0)), ((11, 0), (12, 0))]);
        let right = set(&[((10, 0), (11, 0))]);

        assert_eq!(left.with(&right).as_slice(), &[iv((9, 0), (12, 0))]);
    }

    #[test]
    fn without_self_is_empty() {
        let s = set(&[((9, 0), (10, 0)), ((12, 0), (13, 0))]);
        assert!(s.without(&s).is_empty());
    }

    #[test]
    fn without_empty_is_identity() {
        let s = set(&[((9, 0), (10, 0))]);
        assert_eq!(s.without(&IntervalSet::new()), s);
        assert!(IntervalSet::new().without(&s).is_empty());
    }

    #[test]
    fn without_splits_into_fragments() {
        let s = set(&[((8, 0), (18, 0))]);
        let cuts = set(&[((10, 0), (11, 0)), ((12, 0), (13, 0)), ((17, 30), (19, 0))]);

        let result = s.without(&cuts);
        assert_eq!(
            result.as_slice(),
            &[
                iv((8, 0), (10, 0)),
                iv((11, 0), (12, 0)),
                iv((13, 0), (17, 30))
            ]
        );
        assert_normalized(&result);
    }

    #[test]
    fn without_reclips_every_fragment() {
        // The first cut splits the interval; both halves must be cut again.
        let s = set(&[((8, 0), (12, 0))]);
        let cuts = set(&[((8, 30), (9, 0)), ((9, 30), (10, 0)), ((11, 0), (11, 30))]);

        assert_eq!(
            s.without(&cuts).as_slice(),
            &[
                iv((8, 0), (8, 30)),
                iv((9, 0), (9, 30)),
                iv((10, 0), (11, 0)),
                iv((11, 30), (12, 0))
            ]
        );
    }

    #[test]
    fn without_removes_every_subtracted_point() {
        let s = set(&[((6, 0), (9, 0)), ((10, 0), (14, 0)), ((15, 0), (20, 0))]);
        let t = set(&[((8, 0), (10, 30)), ((13, 0), (16, 0)), ((19, 59), (21, 0))]);
        let result = s.without(&t);

        for hour in 0..24 {
            for minute in [0, 15, 30, 45, 59] {
                let instant = at(hour, minute);
                if t.contains(instant) {
                    assert!(!result.contains(instant), "{instant} survived subtraction");
                } else {
                    assert_eq!(result.contains(instant), s.contains(instant), "{instant}");
                }
            }
        }
    }

    #[test]
    fn contains_respects_half_open_bounds() {
        let s = set(&[((9, 0), (10, 0)), ((12, 0), (13, 0))]);
        assert!(s.contains(at(9, 0)));
        assert!(s.contains(at(12, 30)));
        assert!(!s.contains(at(10, 0)));
        assert!(!s.contains(at(11, 0)));
        assert!(!s.contains(at(13, 0)));
    }

    #[test]
    fn to_millis_preserves_order() {
        let s = set(&[((12, 0), (13, 0)), ((9, 0), (10, 0))]);
        let millis = s.to_millis();

        assert_eq!(millis.len(), 2);
        assert!(millis[0].1 < millis[1].0);
        assert_eq!(millis[0].1 - millis[0].0, 3_600_000);
    }
}
