//! CLI-level errors (wraps infrastructure errors)

use std::error::Error as _;

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::Infra(InfraError::Io { .. }) => exitcode::IOERR,
            CliError::Infra(InfraError::Application(e)) => match e {
                ApplicationError::Domain(DomainError::NotFound(_)) => exitcode::NOINPUT,
                ApplicationError::Domain(_) => exitcode::DATAERR,
                ApplicationError::Uninitialized => exitcode::SOFTWARE,
                ApplicationError::Persistence { .. } => exitcode::CANTCREAT,
                ApplicationError::LazyLoad { .. } => exitcode::UNAVAILABLE,
                ApplicationError::Serialization { .. } => exitcode::DATAERR,
                ApplicationError::Config { .. } => exitcode::CONFIG,
            },
        }
    }

    /// The message followed by its causes, `: `-separated.
    pub fn report(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}
