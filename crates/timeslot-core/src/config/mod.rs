use anyhow::Result;
use config::{Config, Environment};
use serde::Deserialize;

use crate::error::{CoreError, CoreResult};

/// Prefix of the environment variables read into `Settings`.
///
/// Sections and keys are joined with a double underscore, so
/// `TIMESLOT_RESOLVER__ACTIVITY_MARGIN_HOURS` sets `resolver.activity_margin_hours`
/// and `TIMESLOT_DEFINITIONS__PATH` sets `definitions.path`.
pub const ENV_PREFIX: &str = "TIMESLOT";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub definitions: DefinitionsConfig,
    pub resolver: ResolverConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DefinitionsConfig {
    /// Path of the JSON file holding periods, ranges and overrides.
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Half-width of the window resolved around an instant for activity checks.
    pub activity_margin_hours: u32,
    pub sync_days_before: u32,
    pub sync_days_after: u32,
}

impl ResolverConfig {
    /// ## Summary
    /// Checks that the configured windows are usable.
    ///
    /// ## Errors
    /// Returns `CoreError::InvalidConfiguration` if the activity margin is zero or the
    /// sync window is empty.
    pub fn validate(&self) -> CoreResult<()> {
        if self.activity_margin_hours == 0 {
            return Err(CoreError::InvalidConfiguration(
                "resolver.activity_margin_hours must be positive".to_string(),
            ));
        }
        if self.sync_days_before == 0 && self.sync_days_after == 0 {
            return Err(CoreError::InvalidConfiguration(
                "resolver sync window must span at least one day".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from defaults, an optional `config.toml` and
    /// `TIMESLOT_*` environment variables, later sources taking precedence.
    ///
    /// ## Errors
    /// Returns an error if building the configuration, deserializing it, or
    /// validating the resolver section fails.
    pub fn load() -> Result<Self> {
        Self::load_from(environment())
    }

    fn load_from(environment: Environment) -> Result<Self> {
        let settings = Config::builder()
            .set_default("definitions.path", "timeperiods.json")?
            .set_default("resolver.activity_margin_hours", 48)?
            .set_default("resolver.sync_days_before", 1)?
            .set_default("resolver.sync_days_after", 7)?
            .set_default("logging.level", "debug")?
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            // Env
            .add_source(environment)
            .build()?
            .try_deserialize::<Settings>()?;

        settings.resolver.validate()?;
        tracing::debug!(settings = ?settings, "Settings loaded");

        Ok(settings)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
