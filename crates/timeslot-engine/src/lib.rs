//! Resolution of recurring time periods into concrete interval sets.
//!
//! A [`period::PeriodRegistry`] holds time periods built from recurrence
//! rules (`monday` / `09:00-17:00`) and include/exclude links between
//! periods. Resolving a period over a window yields a normalized
//! [`interval_set::IntervalSet`].

pub mod error;
pub mod filter;
pub mod interval;
pub mod interval_set;
pub mod loader;
pub mod period;
pub mod rule;
pub mod sync;
