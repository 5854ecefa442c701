//! Standard file system adapter implementation.
//!
//! This module provides a concrete implementation of the `FsAdapter` trait
//! using `std::fs` for real file system operations.

use crate::error::{PmgrError, Result};
use crate::tools::fs::FsAdapter;
use std::io::ErrorKind;
use std::path::Path;

/// Standard file system adapter using `std::fs`.
///
/// This adapter provides real file system access and is the default
/// implementation used in production. For testing, use
/// [`MockFsAdapter`](crate::tools::fs_mock::MockFsAdapter) instead.
#[derive(Debug, Default)]
pub struct StdFsAdapter;

impl StdFsAdapter {
    /// Creates a new standard file system adapter.
    pub fn new() -> Self {
        Self
    }
}

fn write_error(path: &Path, e: std::io::Error) -> PmgrError {
    match e.kind() {
        ErrorKind::PermissionDenied => PmgrError::PermissionDenied(path.display().to_string()),
        ErrorKind::NotFound => PmgrError::PathNotFound(path.to_path_buf()),
        _ => PmgrError::FileWriteError(format!("{}: {}", path.display(), e)),
    }
}

impl FsAdapter for StdFsAdapter {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                PmgrError::PathNotFound(path.to_path_buf())
            } else {
                PmgrError::FileReadError(format!("{}: {}", path.display(), e))
            }
        })
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            self.create_dir_all(parent)?;
        }

        std::fs::write(path, content).map_err(|e| write_error(path, e))
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        std::fs::copy(from, to).map(|_| ()).map_err(|e| {
            if e.kind() == ErrorKind::NotFound && !from.exists() {
                PmgrError::PathNotFound(from.to_path_buf())
            } else {
                write_error(to, e)
            }
        })
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        std::fs::rename(from, to).map_err(|e| {
            if e.kind() == ErrorKind::NotFound && !from.exists() {
                PmgrError::PathNotFound(from.to_path_buf())
            } else {
                write_error(to, e)
            }
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path).map_err(|e| write_error(path, e))
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}
