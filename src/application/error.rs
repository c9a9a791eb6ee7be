//! Application-level errors (wraps domain errors)

use std::error::Error as _;
use std::io;

use thiserror::Error;

use crate::domain::{DomainError, NodeId};

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("org chart is not initialized")]
    Uninitialized,

    #[error("persistence failed: {context}")]
    Persistence {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("loading children of {node} failed")]
    LazyLoad {
        node: NodeId,
        #[source]
        source: io::Error,
    },

    #[error("serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("config error: {message}")]
    Config { message: String },
}

impl ApplicationError {
    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApplicationError::Persistence { .. } | ApplicationError::LazyLoad { .. }
        )
    }

    /// The message followed by every source in the chain, `: `-separated.
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

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
