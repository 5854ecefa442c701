//! Mock file system adapter for testing.
//!
//! This module provides a mock implementation of the `FsAdapter` trait
//! for use in tests. The mock uses an in-memory HashMap to simulate
//! file system operations, records every mutating operation, and can be
//! told to fail on specific paths.

use crate::error::{PmgrError, Result};
use crate::tools::fs::FsAdapter;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A mutating operation seen by the mock, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsOp {
    Write(PathBuf),
    Copy(PathBuf, PathBuf),
    Rename(PathBuf, PathBuf),
    CreateDir(PathBuf),
}

/// Mock file system adapter for testing.
///
/// All operations are thread-safe via Arc<Mutex>.
///
/// # Examples
///
/// ```
/// use pmgr_core::tools::fs_mock::MockFsAdapter;
/// use pmgr_core::tools::fs::FsAdapter;
/// use std::path::Path;
///
/// let fs = MockFsAdapter::new();
/// fs.write(Path::new("/prompts.json"), "{}").unwrap();
/// assert_eq!(fs.read_to_string(Path::new("/prompts.json")).unwrap(), "{}");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockFsAdapter {
    /// In-memory file system storage (path -> content)
    files: Arc<Mutex<HashMap<PathBuf, String>>>,
    /// In-memory directory storage
    dirs: Arc<Mutex<Vec<PathBuf>>>,
    /// Destination paths whose writes, copies or renames fail
    failing: Arc<Mutex<HashSet<PathBuf>>>,
    /// Log of mutating operations
    ops: Arc<Mutex<Vec<FsOp>>>,
}

impl MockFsAdapter {
    /// Creates a new mock file system adapter with an empty file system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates the mock file system with files.
    ///
    /// # Examples
    ///
    /// ```
    /// use pmgr_core::tools::fs_mock::MockFsAdapter;
    /// use std::collections::HashMap;
    /// use std::path::PathBuf;
    ///
    /// let mut files = HashMap::new();
    /// files.insert(PathBuf::from("/prompts.json"), "{}".to_string());
    ///
    /// let fs = MockFsAdapter::with_files(files);
    /// ```
    pub fn with_files(files: HashMap<PathBuf, String>) -> Self {
        Self {
            files: Arc::new(Mutex::new(files)),
            ..Self::default()
        }
    }

    /// Makes every write, copy or rename targeting `path` fail.
    pub fn fail_on(&self, path: impl Into<PathBuf>) {
        self.failing.lock().unwrap().insert(path.into());
    }

    /// Returns a copy of all files in the mock file system.
    pub fn get_all_files(&self) -> HashMap<PathBuf, String> {
        self.files.lock().unwrap().clone()
    }

    /// Returns the mutating operations performed so far.
    pub fn ops(&self) -> Vec<FsOp> {
        self.ops.lock().unwrap().clone()
    }

    /// Clears all files, directories and the operation log.
    pub fn clear(&self) {
        self.files.lock().unwrap().clear();
        self.dirs.lock().unwrap().clear();
        self.ops.lock().unwrap().clear();
    }

    fn check_target(&self, path: &Path) -> Result<()> {
        if self.failing.lock().unwrap().contains(path) {
            return Err(PmgrError::FileWriteError(format!(
                "{}: injected failure",
                path.display()
            )));
        }
        Ok(())
    }

    fn record(&self, op: FsOp) {
        self.ops.lock().unwrap().push(op);
    }
}

impl FsAdapter for MockFsAdapter {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| PmgrError::PathNotFound(path.to_path_buf()))
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        self.check_target(path)?;

        // Auto-create parent directories
        if let Some(parent) = path.parent() {
            let mut dirs = self.dirs.lock().unwrap();
            if !dirs.contains(&parent.to_path_buf()) {
                dirs.push(parent.to_path_buf());
            }
        }

        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        self.record(FsOp::Write(path.to_path_buf()));
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        self.check_target(to)?;
        let content = self.read_to_string(from)?;
        self.files.lock().unwrap().insert(to.to_path_buf(), content);
        self.record(FsOp::Copy(from.to_path_buf(), to.to_path_buf()));
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        self.check_target(to)?;
        let mut files = self.files.lock().unwrap();
        let content = files
            .remove(from)
            .ok_or_else(|| PmgrError::PathNotFound(from.to_path_buf()))?;
        files.insert(to.to_path_buf(), content);
        drop(files);
        self.record(FsOp::Rename(from.to_path_buf(), to.to_path_buf()));
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
            || self.dirs.lock().unwrap().contains(&path.to_path_buf())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut dirs = self.dirs.lock().unwrap();

        let mut current = Some(path);
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() || dir == Path::new("/") {
                break;
            }
            if !dirs.contains(&dir.to_path_buf()) {
                dirs.push(dir.to_path_buf());
            }
            current = dir.parent();
        }
        drop(dirs);

        self.record(FsOp::CreateDir(path.to_path_buf()));
        Ok(())
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }
}
