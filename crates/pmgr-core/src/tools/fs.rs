//! File system adapter trait and operations.
//!
//! This module defines the `FsAdapter` trait for file system operations,
//! allowing for both real file system access and mock implementations for testing.

use crate::error::Result;
use std::path::Path;

/// File system adapter trait.
///
/// Defines the interface for file system operations needed to load, back up
/// and save template libraries. Implementations can be real (using `std::fs`)
/// or mocked for testing.
pub trait FsAdapter: Send + Sync {
    /// Reads the contents of a file as a string.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the file to read.
    ///
    /// # Errors
    ///
    /// Returns `PmgrError::PathNotFound` if the file doesn't exist,
    /// `PmgrError::FileReadError` if reading fails.
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Writes a string to a file, creating it if it doesn't exist.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the file to write.
    /// * `content` - Content to write to the file.
    ///
    /// # Errors
    ///
    /// Returns `PmgrError::FileWriteError` if writing fails,
    /// `PmgrError::PermissionDenied` if lacking write permissions.
    fn write(&self, path: &Path, content: &str) -> Result<()>;

    /// Copies `from` to `to`, overwriting `to`. The source is left in place.
    ///
    /// # Errors
    ///
    /// Returns `PmgrError::PathNotFound` if `from` doesn't exist,
    /// `PmgrError::FileWriteError` if the copy fails.
    fn copy(&self, from: &Path, to: &Path) -> Result<()>;

    /// Renames `from` to `to`, replacing `to` if it exists.
    ///
    /// # Errors
    ///
    /// Returns `PmgrError::PathNotFound` if `from` doesn't exist,
    /// `PmgrError::FileWriteError` if the rename fails.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Checks if a path exists.
    ///
    /// # Returns
    ///
    /// `true` if the path exists (file or directory), `false` otherwise.
    fn exists(&self, path: &Path) -> bool;

    /// Creates a directory and all missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns `PmgrError::FileWriteError` if creation fails,
    /// `PmgrError::PermissionDenied` if lacking write permissions.
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Checks if a path is a file.
    fn is_file(&self, path: &Path) -> bool;
}
