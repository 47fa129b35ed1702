use thiserror::Error;

/// Errors shared by the timeslot crates
#[derive(Error, Debug)]
pub enum CoreError {
    /// A configuration value is present but unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Input from outside the process cannot be represented.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
