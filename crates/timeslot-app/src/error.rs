use std::path::PathBuf;

use thiserror::Error;

/// Application-level errors (command line layer)
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid instant: {0}")]
    InvalidInstant(String),

    #[error("Could not read {}: {source}", path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error(transparent)]
    PeriodError(#[from] timeslot_engine::error::PeriodError),

    #[error(transparent)]
    CoreError(#[from] timeslot_core::error::CoreError),
}

pub type AppResult<T> = std::result::Result<T, AppError>;
