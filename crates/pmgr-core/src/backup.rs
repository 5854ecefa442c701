//! Generational backups of the template library file.
//!
//! Before the library file is overwritten, its current content is copied into
//! `<stem>.bak1`, after shifting older generations up one slot. The oldest
//! generation falls off the end once `max_backups` slots are in use.

use crate::error::{PmgrError, Result};
use crate::tools::fs::FsAdapter;
use std::path::{Path, PathBuf};

/// Rotates backup generations for a single file.
///
/// Slot names use the file stem with every `.` replaced by `_`, so
/// `prompts.v2.json` is backed up as `prompts_v2.bak1`, `prompts_v2.bak2`, ...
/// in the same directory.
#[derive(Debug, Clone)]
pub struct BackupRotator {
    path: PathBuf,
    max_backups: usize,
}

impl BackupRotator {
    /// Creates a rotator guarding `path` with at most `max_backups` generations.
    ///
    /// A count below 1 is clamped to 1.
    pub fn new(path: impl Into<PathBuf>, max_backups: usize) -> Self {
        Self {
            path: path.into(),
            max_backups: max_backups.max(1),
        }
    }

    /// The guarded file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of generations kept.
    pub fn max_backups(&self) -> usize {
        self.max_backups
    }

    /// Path of backup slot `index` (1 is the most recent).
    pub fn slot_path(&self, index: usize) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().replace('.', "_"))
            .unwrap_or_default();
        let dir = self.path.parent().unwrap_or_else(|| Path::new(""));
        dir.join(format!("{}.bak{}", stem, index))
    }

    /// All slot paths, most recent first.
    pub fn slots(&self) -> Vec<PathBuf> {
        (1..=self.max_backups).map(|i| self.slot_path(i)).collect()
    }

    /// Shifts existing generations and copies the current file into slot 1.
    ///
    /// Returns `Ok(false)` without touching anything when the guarded file
    /// does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `PmgrError::BackupFailed` on the first rename or copy that
    /// fails. Slots already shifted stay where they are.
    pub fn backup_current_file(&self, fs: &dyn FsAdapter) -> Result<bool> {
        if !fs.exists(&self.path) {
            tracing::info!(path = %self.path.display(), "nothing to back up");
            return Ok(false);
        }

        for index in (2..=self.max_backups).rev() {
            let older = self.slot_path(index - 1);
            if !fs.exists(&older) {
                continue;
            }
            let newer = self.slot_path(index);
            tracing::debug!(from = %older.display(), to = %newer.display(), "rotating backup");
            fs.rename(&older, &newer)
                .map_err(|e| self.failed(format!("rotate {}: {}", older.display(), e)))?;
        }

        let first = self.slot_path(1);
        fs.copy(&self.path, &first)
            .map_err(|e| self.failed(format!("copy to {}: {}", first.display(), e)))?;

        tracing::info!(path = %self.path.display(), backup = %first.display(), "backup created");
        Ok(true)
    }

    fn failed(&self, reason: String) -> PmgrError {
        tracing::error!(path = %self.path.display(), %reason, "backup failed");
        PmgrError::BackupFailed {
            path: self.path.clone(),
            reason,
        }
    }
}
