//! Error conversion helpers for persistence I/O
//!
//! Provides extension traits for cleaner error handling with context.

use std::io;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Tag an I/O error of the snapshot store with the action that failed.
    ///
    /// # Example
    /// ```ignore
    /// store.save(&json).with_store_context("save chart")?;
    /// ```
    fn with_store_context(self, action: &str) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_store_context(self, action: &str) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::Persistence {
            context: action.to_string(),
            source: e,
        })
    }
}
