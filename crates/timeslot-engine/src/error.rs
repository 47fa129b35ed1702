use thiserror::Error;

/// Errors raised while building or resolving time periods
#[derive(Error, Debug)]
pub enum PeriodError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unsupported definition: {0}")]
    UnsupportedDefinition(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Unknown period: {0}")]
    UnknownPeriod(String),

    #[error("Cycle detected: {0}")]
    CycleDetected(String),

    #[error("Definition format error: {0}")]
    FormatError(#[from] serde_json::Error),

    #[error(transparent)]
    CoreError(#[from] timeslot_core::error::CoreError),
}

pub type PeriodResult<T> = std::result::Result<T, PeriodError>;
