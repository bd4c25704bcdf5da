//! Error types for exporting programs.
//!
//! Configuration problems and bad input abort an export before any text
//! is produced; I/O errors only occur when writing the result.

use std::io;
use thiserror::Error;

use crate::config::ConfigParseError;

/// Errors that can occur during an export.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The option string could not be parsed.
    #[error("invalid post-processor options: {0}")]
    Config(#[from] ConfigParseError),

    /// A top-level object carries no tool-path.
    #[error("the object {0} is not a path; select only paths and compounds")]
    NotAPath(String),

    /// The job file could not be decoded.
    #[error("invalid job: {0}")]
    Job(#[from] serde_json::Error),

    /// I/O error while reading the job or writing the program.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ExportError {
    /// Input problems the caller can fix, as opposed to environment failures
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ExportError::Config(_) | ExportError::NotAPath(_) | ExportError::Job(_)
        )
    }
}
