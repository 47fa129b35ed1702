//! Building a registry from raw period definition rows.
//!
//! The rows mirror the four data sources of a monitoring database: periods,
//! their ranges, and override excludes and includes pointing at other periods.

use chrono::TimeDelta;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{PeriodError, PeriodResult};
use crate::period::{PeriodId, PeriodRegistry, PeriodRegistryBuilder};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRow {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub prefer_includes: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeRow {
    pub timeperiod_id: String,
    pub range_key: String,
    pub range_value: String,
}

/// Links `timeperiod_id` to the period `override_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRow {
    pub timeperiod_id: String,
    pub override_id: String,
}

/// All raw rows needed to build a [`PeriodRegistry`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDefinitions {
    pub periods: Vec<PeriodRow>,
    #[serde(default)]
    pub ranges: Vec<RangeRow>,
    #[serde(default)]
    pub override_excludes: Vec<OverrideRow>,
    #[serde(default)]
    pub override_includes: Vec<OverrideRow>,
}

impl PeriodDefinitions {
    /// ## Summary
    /// Parses definitions from JSON.
    ///
    /// ## Errors
    /// Returns `PeriodError::FormatError` if the document does not match.
    pub fn from_json(json: &str) -> PeriodResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// ## Summary
    /// Creates all periods, then attaches ranges, excludes and includes.
    ///
    /// ## Errors
    /// Returns `PeriodError::UnknownPeriod` for rows referencing an id that is
    /// not in `periods`, or the error of the first rejected period or range.
    pub fn to_builder(&self) -> PeriodResult<PeriodRegistryBuilder> {
        let mut builder = PeriodRegistry::builder();

        for period in &self.periods {
            builder.add_period(&period.id, &period.name, period.prefer_includes)?;
        }

        for range in &self.ranges {
            let period = resolve_id(&builder, &range.timeperiod_id)?;
            builder.add_rule(period, &range.range_key, &range.range_value)?;
        }

        for link in &self.override_excludes {
            let (period, target) = resolve_link(&builder, link)?;
            builder.add_exclude(period, target)?;
        }

        for link in &self.override_includes {
            let (period, target) = resolve_link(&builder, link)?;
            builder.add_include(period, target)?;
        }

        tracing::debug!(
            periods = self.periods.len(),
            ranges = self.ranges.len(),
            excludes = self.override_excludes.len(),
            includes = self.override_includes.len(),
            "Loaded period definitions"
        );

        Ok(builder)
    }

    /// ## Summary
    /// Builds a registry with the default activity margin.
    ///
    /// ## Errors
    /// See [`PeriodDefinitions::to_builder`].
    pub fn load(&self) -> PeriodResult<PeriodRegistry> {
        Ok(self.to_builder()?.build())
    }

    /// ## Summary
    /// Builds a registry whose activity checks use `margin`.
    ///
    /// ## Errors
    /// See [`PeriodDefinitions::to_builder`].
    pub fn load_with_margin(&self, margin: TimeDelta) -> PeriodResult<PeriodRegistry> {
        Ok(self.to_builder()?.with_activity_margin(margin).build())
    }
}

fn resolve_id(builder: &PeriodRegistryBuilder, id: &str) -> PeriodResult<PeriodId> {
    builder
        .lookup(id)
        .ok_or_else(|| PeriodError::UnknownPeriod(id.to_string()))
}

fn resolve_link(
    builder: &PeriodRegistryBuilder,
    link: &OverrideRow,
) -> PeriodResult<(PeriodId, PeriodId)> {
    Ok((
        resolve_id(builder, &link.timeperiod_id)?,
        resolve_id(builder, &link.override_id)?,
    ))
}

/// Accepts a JSON boolean or the database flag strings `y` / `n`.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Text(text) => match text.trim().to_lowercase().as_str() {
            "y" | "yes" | "true" => Ok(true),
            "n" | "no" | "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "invalid flag value: {other}"
            ))),
        },
    }
}
