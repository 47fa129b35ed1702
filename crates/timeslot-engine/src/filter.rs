//! Selection of the periods that are active at an instant.

use chrono::{Local, NaiveDateTime};

use crate::error::PeriodResult;
use crate::period::{PeriodId, PeriodRegistry};

/// ## Summary
/// Returns the periods of `periods` that are active at `instant`, in input order.
///
/// ## Errors
/// Propagates the first resolution error.
pub fn filter_active(
    registry: &PeriodRegistry,
    periods: &[PeriodId],
    instant: NaiveDateTime,
) -> PeriodResult<Vec<PeriodId>> {
    let mut active = Vec::with_capacity(periods.len());
    for &period in periods {
        if registry.is_active(period, instant)? {
            active.push(period);
        }
    }

    tracing::debug!(
        %instant,
        candidates = periods.len(),
        active = active.len(),
        "Filtered active periods"
    );

    Ok(active)
}

/// ## Summary
/// [`filter_active`] at the current local time.
///
/// ## Errors
/// Propagates the first resolution error.
pub fn filter_active_now(
    registry: &PeriodRegistry,
    periods: &[PeriodId],
) -> PeriodResult<Vec<PeriodId>> {
    filter_active(registry, periods, Local::now().naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PeriodError;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn registry() -> (PeriodRegistry, Vec<PeriodId>) {
        let mut builder = PeriodRegistry::builder();
        let mornings = builder.add_period("mornings", "Mornings", false).unwrap();
        let evenings = builder.add_period("evenings", "Evenings", false).unwrap();
        let monday = builder.add_period("monday", "Monday", false).unwrap();
        for day in ["monday", "tuesday", "wednesday"] {
            builder.add_rule(mornings, day, "06:00-12:00").unwrap();
            builder.add_rule(evenings, day, "18:00-23:00").unwrap();
        }
        builder.add_rule(monday, "monday", "00:00-24:00").unwrap();

        (builder.build(), vec![mornings, evenings, monday])
    }

    #[test]
    fn keeps_active_periods_in_order() {
        let (registry, periods) = registry();

        // Monday 2024-01-01
        let active = filter_active(&registry, &periods, at(1, 8)).unwrap();
        assert_eq!(active, vec![periods[0], periods[2]]);

        let active = filter_active(&registry, &periods, at(1, 19)).unwrap();
        assert_eq!(active, vec![periods[1], periods[2]]);

        // Thursday
        let active = filter_active(&registry, &periods, at(4, 8)).unwrap();
        assert!(active.is_empty());
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let (registry, _) = registry();
        assert!(filter_active(&registry, &[], at(1, 8)).unwrap().is_empty());
        assert!(filter_active_now(&registry, &[]).unwrap().is_empty());
    }

    #[test]
    fn propagates_resolution_errors() {
        let mut builder = PeriodRegistry::builder();
        let a = builder.add_period("a", "A", false).unwrap();
        builder.add_include(a, a).unwrap();
        let registry = builder.build();

        assert!(matches!(
            filter_active(&registry, &[a], at(1, 8)),
            Err(PeriodError::CycleDetected(_))
        ));
    }
}
