//! Init workflow implementation.
//!
//! Prepares a directory for pmgr: writes `.pmgr/config.toml` with defaults and
//! an empty template library. Existing files are never overwritten.

use crate::config::PmgrConfig;
use crate::error::Result;
use crate::library::{LibraryHeader, TemplateLibrary};
use crate::tools::fs::FsAdapter;

/// What [`init_workspace`] created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitReport {
    pub config_created: bool,
    pub library_created: bool,
}

/// Initializes the directory described by `config`.
///
/// # Errors
///
/// Returns:
/// - `PmgrError::FileWriteError` if a file cannot be created
/// - `PmgrError::PermissionDenied` if lacking write permissions
#[tracing::instrument(skip(config, fs), fields(root = %config.root.display()))]
pub fn init_workspace(config: &PmgrConfig, fs: &dyn FsAdapter) -> Result<InitReport> {
    let mut report = InitReport {
        config_created: PmgrConfig::write_default_with(&config.root, fs)?,
        ..InitReport::default()
    };

    if !fs.exists(&config.library_file) {
        let mut library = TemplateLibrary::new();
        library.header = LibraryHeader {
            app_name: "pmgr".to_string(),
            data_version: "1".to_string(),
            file_type: "prompt_library".to_string(),
        };
        let content = library.to_json()?;
        fs.write(&config.library_file, &content)?;
        report.library_created = true;
    }

    tracing::info!(
        config_created = report.config_created,
        library_created = report.library_created,
        "workspace initialized"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fs_impl::StdFsAdapter;
    use crate::tools::fs_mock::MockFsAdapter;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_then_skips() {
        let temp_dir = TempDir::new().unwrap();
        let config = PmgrConfig::new(temp_dir.path().to_path_buf());
        let fs = StdFsAdapter::new();

        let first = init_workspace(&config, &fs).unwrap();
        assert!(first.config_created);
        assert!(first.library_created);

        let library = TemplateLibrary::load(&fs, &config.library_file).unwrap();
        assert!(library.is_empty());
        assert_eq!(library.header.app_name, "pmgr");

        let second = init_workspace(&config, &fs).unwrap();
        assert_eq!(second, InitReport::default());
    }

    #[test]
    fn test_init_on_mock_touches_only_adapter() {
        let fs = MockFsAdapter::new();
        let config = PmgrConfig::new(PathBuf::from("/proj"));

        let report = init_workspace(&config, &fs).unwrap();

        assert!(report.config_created);
        assert!(report.library_created);
        let files = fs.get_all_files();
        assert!(files.contains_key(Path::new("/proj/.pmgr/config.toml")));
        assert!(files.contains_key(Path::new("/proj/prompts.json")));
    }
}
