use std::path::Path;

use chrono::TimeDelta;
use clap::Parser;
use timeslot_app::cli::{Cli, Command};
use timeslot_app::report::{execute, read_input};
use timeslot_core::config::load_config;
use timeslot_engine::loader::PeriodDefinitions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    let config = load_config()?;

    tracing::info!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    let definitions = read_input(Path::new(&config.definitions.path))?;
    let registry = PeriodDefinitions::from_json(&definitions)?.load_with_margin(TimeDelta::hours(
        i64::from(config.resolver.activity_margin_hours),
    ))?;

    tracing::info!(periods = registry.len(), "Period definitions loaded");

    let existing_rows = match &cli.command {
        Command::Sync {
            existing: Some(path),
            ..
        } => Some(read_input(path)?),
        _ => None,
    };

    let report = execute(
        &cli.command,
        &registry,
        &config.resolver,
        existing_rows.as_deref(),
    )?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
