//! Configuration types for the pmgr runtime.
//!
//! The configuration lives in `<root>/.pmgr/config.toml`. Every key is
//! optional; missing keys fall back to the defaults below, and a missing file
//! yields a fully default configuration.

use crate::error::{PmgrError, Result};
use crate::tools::fs::FsAdapter;
use crate::tools::fs_impl::StdFsAdapter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default library file name, relative to the root.
pub const DEFAULT_LIBRARY_FILE: &str = "prompts.json";

/// Default model identifier used for runs.
pub const DEFAULT_MODEL: &str = "llama-3.1-405b";

/// Default number of backup generations.
pub const DEFAULT_MAX_BACKUPS: usize = 3;

/// System prompt used when a template does not override it.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Main pmgr configuration.
///
/// All paths are absolute, derived from `root`. This structure is typically
/// loaded with [`PmgrConfig::load`].
#[derive(Debug, Clone)]
pub struct PmgrConfig {
    /// Root directory holding `.pmgr/` and the library file.
    pub root: PathBuf,

    /// Path to the configuration file (`.pmgr/config.toml`).
    pub config_file: PathBuf,

    /// Path to the template library JSON file.
    pub library_file: PathBuf,

    /// Optional JSON file with model metadata.
    pub models_file: Option<PathBuf>,

    /// Model used when a run does not name one.
    pub default_model: String,

    /// Number of backup generations kept next to the library file.
    pub max_backups: usize,

    /// System prompt used when a template has no override.
    pub default_system_prompt: String,

    /// Title given to generated output schemas.
    pub schema_title: String,
}

/// On-disk shape of `config.toml`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    library_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    models_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_backups: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema_title: Option<String>,
}

impl PmgrConfig {
    /// Creates a configuration with defaults for the given root.
    ///
    /// # Arguments
    ///
    /// * `root` - The root directory (should be an absolute path).
    pub fn new(root: PathBuf) -> Self {
        Self {
            config_file: Self::config_path(&root),
            library_file: root.join(DEFAULT_LIBRARY_FILE),
            models_file: None,
            default_model: DEFAULT_MODEL.to_string(),
            max_backups: DEFAULT_MAX_BACKUPS,
            default_system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            schema_title: pmgr_pm::schema::DEFAULT_SCHEMA_TITLE.to_string(),
            root,
        }
    }

    /// Location of the configuration file below `root`.
    pub fn config_path(root: &Path) -> PathBuf {
        root.join(".pmgr").join("config.toml")
    }

    /// Loads the configuration for `root` from the real file system.
    pub fn load(root: PathBuf) -> Result<Self> {
        Self::load_with(root, &StdFsAdapter::new())
    }

    /// Loads the configuration for `root`, applying defaults for missing keys.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `PmgrError::ConfigParseError` if the file is not valid TOML
    /// - `PmgrError::InvalidConfig` if a value is out of range
    /// - `PmgrError::FileReadError` if the file exists but cannot be read
    pub fn load_with(root: PathBuf, fs: &dyn FsAdapter) -> Result<Self> {
        let mut config = Self::new(root);
        if !fs.exists(&config.config_file) {
            tracing::debug!(path = %config.config_file.display(), "no config file, using defaults");
            return Ok(config);
        }

        let content = fs.read_to_string(&config.config_file)?;
        let file: ConfigFile = toml::from_str(&content).map_err(|e| {
            PmgrError::ConfigParseError(format!("{}: {}", config.config_file.display(), e))
        })?;

        config.apply(file);
        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, file: ConfigFile) {
        if let Some(library_file) = file.library_file {
            self.library_file = self.root.join(library_file);
        }
        if let Some(models_file) = file.models_file {
            self.models_file = Some(self.root.join(models_file));
        }
        if let Some(model) = file.default_model {
            self.default_model = model;
        }
        if let Some(max_backups) = file.max_backups {
            self.max_backups = max_backups;
        }
        if let Some(prompt) = file.default_system_prompt {
            self.default_system_prompt = prompt;
        }
        if let Some(title) = file.schema_title {
            self.schema_title = title;
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `PmgrError::InvalidConfig` when `max_backups` is zero or the
    /// schema title or default model is blank.
    pub fn validate(&self) -> Result<()> {
        if self.max_backups < 1 {
            return Err(PmgrError::InvalidConfig(
                "max_backups must be at least 1".to_string(),
            ));
        }
        if self.default_model.trim().is_empty() {
            return Err(PmgrError::InvalidConfig(
                "default_model must not be empty".to_string(),
            ));
        }
        if self.schema_title.trim().is_empty() {
            return Err(PmgrError::InvalidConfig(
                "schema_title must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Writes a config file with every default spelled out.
    ///
    /// An existing file is left alone; returns `false` in that case.
    pub fn write_default(root: &Path) -> Result<bool> {
        Self::write_default_with(root, &StdFsAdapter::new())
    }

    /// Like [`PmgrConfig::write_default`], through the given adapter.
    pub fn write_default_with(root: &Path, fs: &dyn FsAdapter) -> Result<bool> {
        let path = Self::config_path(root);
        if fs.exists(&path) {
            return Ok(false);
        }

        let file = ConfigFile {
            library_file: Some(DEFAULT_LIBRARY_FILE.to_string()),
            models_file: None,
            default_model: Some(DEFAULT_MODEL.to_string()),
            max_backups: Some(DEFAULT_MAX_BACKUPS),
            default_system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            schema_title: Some(pmgr_pm::schema::DEFAULT_SCHEMA_TITLE.to_string()),
        };
        let body = toml::to_string_pretty(&file)
            .map_err(|e| PmgrError::InvalidConfig(format!("cannot serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs.create_dir_all(parent)?;
        }
        fs.write(&path, &format!("# pmgr configuration\n{}", body))?;

        tracing::info!(path = %path.display(), "wrote default config");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fs_mock::MockFsAdapter;
    use tempfile::TempDir;

    #[test]
    fn test_new_derives_paths_from_root() {
        let config = PmgrConfig::new(PathBuf::from("/work"));
        assert_eq!(config.library_file, PathBuf::from("/work/prompts.json"));
        assert_eq!(config.config_file, PathBuf::from("/work/.pmgr/config.toml"));
        assert_eq!(config.max_backups, 3);
        assert_eq!(config.schema_title, "PromptOutputSchema");
        assert!(config.models_file.is_none());
    }

    #[test]
    fn test_zero_backups_rejected() {
        let mut config = PmgrConfig::new(PathBuf::from("/work"));
        config.max_backups = 0;
        assert!(matches!(config.validate(), Err(PmgrError::InvalidConfig(_))));
    }

    #[test]
    fn test_write_default_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        assert!(PmgrConfig::write_default(temp_dir.path()).unwrap());
        assert!(!PmgrConfig::write_default(temp_dir.path()).unwrap());

        let config = PmgrConfig::load(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(config.default_model, DEFAULT_MODEL);
        assert_eq!(config.library_file, temp_dir.path().join("prompts.json"));
    }

    #[test]
    fn test_load_through_mock_adapter() {
        let fs = MockFsAdapter::new();
        let root = PathBuf::from("/work");

        let defaults = PmgrConfig::load_with(root.clone(), &fs).unwrap();
        assert_eq!(defaults.max_backups, DEFAULT_MAX_BACKUPS);

        assert!(PmgrConfig::write_default_with(&root, &fs).unwrap());
        assert!(fs.exists(Path::new("/work/.pmgr/config.toml")));
        assert!(!PmgrConfig::write_default_with(&root, &fs).unwrap());

        fs.write(
            Path::new("/work/.pmgr/config.toml"),
            "max_backups = 5\ndefault_model = \"tiny\"\n",
        )
        .unwrap();
        let config = PmgrConfig::load_with(root, &fs).unwrap();
        assert_eq!(config.max_backups, 5);
        assert_eq!(config.default_model, "tiny");
    }

    #[test]
    fn test_unwritable_config_file_fails() {
        let fs = MockFsAdapter::new();
        fs.fail_on(PathBuf::from("/work/.pmgr/config.toml"));

        let err = PmgrConfig::write_default_with(Path::new("/work"), &fs).unwrap_err();
        assert!(matches!(err, PmgrError::FileWriteError(_)));
    }
}
