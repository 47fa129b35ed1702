//! Command line interface of the `timeslot` binary.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Parser, Subcommand};

use crate::error::{AppError, AppResult};

/// Resolves recurring time periods into concrete time slots.
#[derive(Parser, Debug)]
#[command(name = "timeslot", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Instants are `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM` or `YYYY-MM-DDTHH:MM:SS`.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Resolve periods over `[from, to)`; all periods if none are named.
    Slots {
        /// Start of the window (inclusive).
        #[arg(value_parser = parse_instant)]
        from: NaiveDateTime,
        /// End of the window (exclusive).
        #[arg(value_parser = parse_instant)]
        to: NaiveDateTime,
        /// Period ids to resolve.
        periods: Vec<String>,
    },
    /// List the periods active at an instant, now if omitted.
    Active {
        #[arg(value_parser = parse_instant)]
        at: Option<NaiveDateTime>,
    },
    /// Compute the slot table changes for the sync window around `today`.
    Sync {
        /// JSON array of the slot rows currently stored.
        existing: Option<PathBuf>,
        /// Day the sync window is centred on, today if omitted.
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

/// ## Summary
/// Parses `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM` or `YYYY-MM-DDTHH:MM:SS`.
///
/// A bare date means its midnight.
///
/// ## Errors
/// Returns `AppError::InvalidInstant` if no format matches.
pub fn parse_instant(value: &str) -> AppResult<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_e| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .or_else(|_e| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d").map(|date| date.and_time(NaiveTime::MIN))
        })
        .map_err(|_e| AppError::InvalidInstant(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn parse(args: &[&str]) -> Result<Command, clap::Error> {
        Cli::try_parse_from(std::iter::once("timeslot").chain(args.iter().copied()))
            .map(|cli| cli.command)
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_instant_formats() {
        assert_eq!(parse_instant("2024-01-01").unwrap(), at(1, 0, 0));
        assert_eq!(parse_instant("2024-01-01T09:30").unwrap(), at(1, 9, 30));
        assert_eq!(parse_instant("2024-01-01T09:30:00").unwrap(), at(1, 9, 30));
        assert!(matches!(
            parse_instant("yesterday"),
            Err(AppError::InvalidInstant(_))
        ));
    }

    #[test]
    fn parse_slots_command() {
        assert_eq!(
            parse(&["slots", "2024-01-01", "2024-01-08", "a", "b"]).unwrap(),
            Command::Slots {
                from: at(1, 0, 0),
                to: at(8, 0, 0),
                periods: vec!["a".to_string(), "b".to_string()],
            }
        );

        let err = parse(&["slots", "2024-01-01"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err = parse(&["slots", "yesterday", "2024-01-08"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn parse_active_command() {
        assert_eq!(parse(&["active"]).unwrap(), Command::Active { at: None });
        assert_eq!(
            parse(&["active", "2024-01-01T12:00"]).unwrap(),
            Command::Active {
                at: Some(at(1, 12, 0))
            }
        );
        assert!(parse(&["active", "2024-01-01", "extra"]).is_err());
    }

    #[test]
    fn parse_sync_command() {
        assert_eq!(
            parse(&["sync", "rows.json", "--today", "2024-01-03"]).unwrap(),
            Command::Sync {
                existing: Some(PathBuf::from("rows.json")),
                today: NaiveDate::from_ymd_opt(2024, 1, 3),
            }
        );
        assert_eq!(
            parse(&["sync"]).unwrap(),
            Command::Sync {
                existing: None,
                today: None
            }
        );
        assert!(parse(&["sync", "--today"]).is_err());
    }

    #[test]
    fn help_and_unknown_commands() {
        assert_eq!(
            parse(&["slots", "--help"]).unwrap_err().kind(),
            ErrorKind::DisplayHelp
        );
        assert_eq!(
            parse(&["explode"]).unwrap_err().kind(),
            ErrorKind::InvalidSubcommand
        );
        assert!(parse(&[]).is_err());
    }
}
