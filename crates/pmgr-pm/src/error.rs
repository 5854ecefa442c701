//! Error types for the placeholder engine crate.

use std::path::PathBuf;

/// Errors that can occur while resolving placeholders or handling schemas.
#[derive(thiserror::Error, Debug)]
pub enum PromptError {
    /// A content loader failed to produce text for a file.
    ///
    /// The resolver never lets this escape: it is converted into an inline
    /// `[Error reading file: ...]` marker and logged.
    #[error("failed to load file content: {path}")]
    FileContent {
        /// Path of the file that failed to load.
        path: PathBuf,
        /// Underlying loader error.
        #[source]
        source: anyhow::Error,
    },

    /// The interactive value provider failed (not a cancellation).
    #[error("value provider failed: {0}")]
    ProviderFailed(String),

    /// Malformed JSON supplied for a schema fragment, or a response that
    /// does not satisfy its schema.
    #[error("schema parse error: {0}")]
    SchemaParse(String),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for placeholder engine operations.
pub type Result<T> = std::result::Result<T, PromptError>;
