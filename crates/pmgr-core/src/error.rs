//! Error types for pmgr operations.
//!
//! Every fallible operation in the core crate returns [`PmgrError`]. Errors
//! from the placeholder engine are carried through unchanged.

use std::path::PathBuf;
use thiserror::Error;

/// Error types for template library, backup and run operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum PmgrError {
    // Library errors
    /// Template with the given name was not found.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// Template with the given name already exists.
    #[error("template already exists: {0}")]
    TemplateAlreadyExists(String),

    /// Template name is empty or whitespace.
    #[error("invalid template name: {0:?}")]
    InvalidTemplateName(String),

    /// Library file could not be parsed.
    #[error("cannot parse template library {path}: {reason}")]
    LibraryParseError {
        /// Path to the library file.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    // Backup errors
    /// A backup step failed; the guarded write must not happen.
    #[error("backup of {path} failed: {reason}")]
    BackupFailed {
        /// Path of the file being protected.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    // Run errors
    /// A system template cannot be run on its own.
    #[error("template {0} is a system prompt and cannot be run")]
    SystemPromptNotRunnable(String),

    /// The custom system prompt name does not refer to a system template.
    #[error("selected prompt {0} is not a valid system prompt")]
    InvalidSystemPrompt(String),

    /// Chat runs cannot request a structured response format.
    #[error("a response_format cannot be used with chat prompts")]
    ChatWithResponseFormat,

    /// The model does not support structured responses.
    #[error("model {0} does not support structured JSON responses")]
    ModelLacksResponseSchema(String),

    /// The template has no stored response format to check against.
    #[error("template {0} has no response format")]
    NoResponseFormat(String),

    // Model catalog errors
    /// The model metadata source failed.
    #[error("model catalog error: {0}")]
    ModelCatalog(String),

    // File system errors
    /// Path not found in the file system.
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    /// Permission denied for the specified operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Error reading file.
    #[error("file read error: {0}")]
    FileReadError(String),

    /// Error writing file.
    #[error("file write error: {0}")]
    FileWriteError(String),

    // Config errors
    /// Invalid configuration detected.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Error parsing configuration file.
    #[error("config parse error: {0}")]
    ConfigParseError(String),

    // Placeholder engine errors
    /// Error from placeholder resolution or schema handling.
    #[error(transparent)]
    Prompt(#[from] pmgr_pm::PromptError),

    // IO and system errors
    /// Standard IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    // Anyhow passthrough for rich context
    /// Generic error with context from anyhow.
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for pmgr operations.
///
/// All fallible core operations return this type, using [`PmgrError`] for error variants.
pub type Result<T> = std::result::Result<T, PmgrError>;
