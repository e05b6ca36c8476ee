//! Error types

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop an extraction run
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Mapping definition is missing keys or has malformed fields.
    /// Raised before any document byte is read.
    #[error("invalid mapping configuration: {0}")]
    ConfigInvalid(String),

    #[error("parser config '{0}' not found")]
    UnknownParser(String),

    #[error("XML file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("failed to open XML file {}: {source}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tokenizer rejected the document
    #[error("XML parsing error: {message} at line {line}, column {column}")]
    Syntax {
        message: String,
        line: u64,
        column: u64,
    },

    /// Close event without a matching open; tokenizer and path tracker are out of step
    #[error("cannot pop element from empty stack")]
    EmptyStack,
}

pub type Result<T> = std::result::Result<T, ExtractError>;

impl ExtractError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::ConfigInvalid(msg.into())
    }
}
