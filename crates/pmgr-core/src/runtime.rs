//! Runtime facade for pmgr.
//!
//! [`LibraryRuntime`] owns the configuration, the file system adapter, the
//! loaded library, the placeholder resolver and the model catalog, and wires
//! them into the workflows.

use crate::backup::BackupRotator;
use crate::config::PmgrConfig;
use crate::error::Result;
use crate::library::{Template, TemplateLibrary};
use crate::models::{JsonFileModelSource, ModelCatalog};
use crate::tools::fs::FsAdapter;
use crate::tools::fs_impl::StdFsAdapter;
use crate::workflows::{self, InitReport, ResponseMode, RunOutcome, RunRequest};
use pmgr_pm::{PlaceholderResolver, ScanResult, SchemaField, ValueProvider};

/// Library runtime.
///
/// # Examples
///
/// ```no_run
/// use pmgr_core::{LibraryRuntime, PmgrConfig};
/// use std::path::PathBuf;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PmgrConfig::load(PathBuf::from("/path/to/project"))?;
/// let runtime = LibraryRuntime::open(config)?;
///
/// for name in runtime.library.names() {
///     println!("{name}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct LibraryRuntime {
    /// Runtime configuration.
    pub config: PmgrConfig,

    /// File system adapter used for the library and its backups.
    pub fs: Box<dyn FsAdapter>,

    /// The loaded template library.
    pub library: TemplateLibrary,

    /// Resolver with the file loaders available to runs.
    pub resolver: PlaceholderResolver,

    /// Model metadata used to validate runs.
    pub catalog: ModelCatalog,
}

impl LibraryRuntime {
    /// Opens the runtime on the real file system.
    ///
    /// # Errors
    ///
    /// Returns an error if the library file exists but cannot be parsed.
    pub fn open(config: PmgrConfig) -> Result<Self> {
        Self::with_fs(config, Box::new(StdFsAdapter::new()))
    }

    /// Opens the runtime on the given adapter.
    ///
    /// A missing library file yields an empty library. A configured models
    /// file that cannot be read leaves the catalog empty and logs a warning.
    pub fn with_fs(config: PmgrConfig, fs: Box<dyn FsAdapter>) -> Result<Self> {
        let library = if fs.exists(&config.library_file) {
            TemplateLibrary::load(&*fs, &config.library_file)?
        } else {
            tracing::debug!(path = %config.library_file.display(), "no library file yet");
            TemplateLibrary::new()
        };

        let mut catalog = ModelCatalog::new();
        if let Some(models_file) = &config.models_file
            && let Err(e) = catalog.refresh(&JsonFileModelSource::new(models_file, &*fs))
        {
            tracing::warn!(error = %e, "model catalog not loaded");
        }

        Ok(Self {
            config,
            fs,
            library,
            resolver: PlaceholderResolver::default(),
            catalog,
        })
    }

    /// Writes the default config and an empty library where missing.
    pub fn init(&self) -> Result<InitReport> {
        workflows::init_workspace(&self.config, &*self.fs)
    }

    /// Saves the library, backing up the previous file first.
    pub fn save(&self) -> Result<()> {
        self.library
            .save(&*self.fs, &self.config.library_file, self.config.max_backups)
    }

    /// Rotates backups of the library file without writing it.
    pub fn backup(&self) -> Result<bool> {
        BackupRotator::new(&self.config.library_file, self.config.max_backups)
            .backup_current_file(&*self.fs)
    }

    /// Adds a template and saves the library.
    pub fn add_template(&mut self, name: &str, template: Template) -> Result<()> {
        self.commit(|library| library.insert(name, template).map(|_| ()))
    }

    /// Applies `edit` to a copy of the library and saves it. The loaded
    /// library only changes once the save succeeded.
    fn commit(&mut self, edit: impl FnOnce(&mut TemplateLibrary) -> Result<()>) -> Result<()> {
        let mut staged = self.library.clone();
        edit(&mut staged)?;
        staged.save(&*self.fs, &self.config.library_file, self.config.max_backups)?;
        self.library = staged;
        Ok(())
    }

    /// Placeholders of a template.
    pub fn scan(&self, name: &str) -> Result<ScanResult> {
        Ok(pmgr_pm::scan(&self.library.require(name)?.prompt_text))
    }

    /// Prepares a run of `name`, using the configured default model unless
    /// `model` is given.
    pub fn prepare_run(
        &self,
        name: &str,
        mode: ResponseMode,
        model: Option<&str>,
        provider: &mut dyn ValueProvider,
    ) -> Result<RunOutcome> {
        let request = RunRequest {
            mode,
            model: model.unwrap_or(&self.config.default_model).to_string(),
            default_system_prompt: self.config.default_system_prompt.clone(),
        };
        workflows::prepare_run(
            &self.library,
            name,
            &request,
            &self.catalog,
            &self.resolver,
            provider,
        )
    }

    /// Editable output fields of a template.
    pub fn output_fields(&self, name: &str) -> Result<Vec<SchemaField>> {
        workflows::output_fields(&self.library, name)
    }

    /// Stores the output schema for `fields` and saves the library.
    ///
    /// `title` defaults to the configured schema title.
    pub fn apply_output_schema(
        &mut self,
        name: &str,
        fields: &[SchemaField],
        title: Option<&str>,
    ) -> Result<()> {
        let title = title.unwrap_or(&self.config.schema_title).to_string();
        self.commit(|library| workflows::apply_output_schema(library, name, fields, &title))
    }

    /// Fields of a model answer, checked against the template's schema.
    pub fn check_response(
        &self,
        name: &str,
        response: &str,
        include_missing_optionals: bool,
    ) -> Result<Vec<(String, serde_json::Value)>> {
        workflows::check_response(&self.library, name, response, include_missing_optionals)
    }

    /// Replaces a template's response format from JSON text and saves.
    pub fn set_response_format_text(&mut self, name: &str, text: &str) -> Result<()> {
        self.commit(|library| library.set_response_format_text(name, text))
    }
}

impl std::fmt::Debug for LibraryRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryRuntime")
            .field("config", &self.config)
            .field("fs", &"Box<dyn FsAdapter>")
            .field("templates", &self.library.len())
            .field("resolver", &self.resolver)
            .field("catalog", &self.catalog)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PmgrError;
    use crate::tools::fs_mock::MockFsAdapter;
    use pmgr_pm::{PlaceholderValues, PresetProvider};
    use std::path::{Path, PathBuf};

    fn runtime(fs: &MockFsAdapter) -> LibraryRuntime {
        let config = PmgrConfig::new(PathBuf::from("/proj"));
        LibraryRuntime::with_fs(config, Box::new(fs.clone())).unwrap()
    }

    #[test]
    fn test_open_without_library() {
        let fs = MockFsAdapter::new();
        let runtime = runtime(&fs);
        assert!(runtime.library.is_empty());
        assert!(runtime.catalog.fetched_at().is_none());
    }

    #[test]
    fn test_add_template_saves_with_backups() {
        let fs = MockFsAdapter::new();
        let mut runtime = runtime(&fs);

        runtime
            .add_template("a", Template::with_text("<< x >>"))
            .unwrap();
        runtime
            .add_template("b", Template::with_text("%% doc %%"))
            .unwrap();

        let bak = fs.read_to_string(Path::new("/proj/prompts.bak1")).unwrap();
        assert!(bak.contains("\"a\""));
        assert!(!bak.contains("\"b\""));

        let reopened = LibraryRuntime::with_fs(
            PmgrConfig::new(PathBuf::from("/proj")),
            Box::new(fs.clone()),
        )
        .unwrap();
        assert_eq!(reopened.library.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_prepare_run_uses_default_model() {
        let fs = MockFsAdapter::new();
        let mut runtime = runtime(&fs);
        runtime
            .library
            .insert("q", Template::with_text("Hello << who >>"))
            .unwrap();

        let mut provider = PresetProvider::new(PlaceholderValues::new().with_text("who", "Ada"));
        let outcome = runtime
            .prepare_run("q", ResponseMode::Question, None, &mut provider)
            .unwrap();

        let RunOutcome::Ready(prepared) = outcome else {
            panic!("expected a prepared prompt");
        };
        assert_eq!(prepared.model, "llama-3.1-405b");
        assert_eq!(prepared.prompt_text, "Hello Ada");
        assert_eq!(prepared.system_prompt, "You are a helpful AI assistant.");
    }

    #[test]
    fn test_apply_schema_uses_configured_title() {
        let fs = MockFsAdapter::new();
        let mut runtime = runtime(&fs);
        runtime
            .library
            .insert("q", Template::with_text("@@ verdict @@"))
            .unwrap();

        let fields = runtime.output_fields("q").unwrap();
        runtime.apply_output_schema("q", &fields, None).unwrap();

        let format = runtime.library.get("q").unwrap().response_format().unwrap();
        assert_eq!(format["json_schema"]["name"], "PromptOutputSchema");
        assert!(fs.exists(Path::new("/proj/prompts.json")));
    }

    #[test]
    fn test_models_file_read_through_adapter() {
        let fs = MockFsAdapter::new();
        fs.write(
            Path::new("/proj/models.json"),
            r#"[{"id": "capable", "supports_response_schema": true}]"#,
        )
        .unwrap();
        let mut config = PmgrConfig::new(PathBuf::from("/proj"));
        config.models_file = Some(PathBuf::from("/proj/models.json"));

        let runtime = LibraryRuntime::with_fs(config, Box::new(fs.clone())).unwrap();

        assert!(runtime.catalog.supports_response_schema("capable"));
        assert!(runtime.catalog.fetched_at().is_some());
    }

    #[test]
    fn test_failed_save_keeps_loaded_library() {
        let fs = MockFsAdapter::new();
        let mut runtime = runtime(&fs);
        runtime
            .add_template("q", Template::with_text("@@ verdict @@"))
            .unwrap();
        fs.fail_on(PathBuf::from("/proj/prompts.bak1"));

        let err = runtime
            .add_template("r", Template::with_text("x"))
            .unwrap_err();
        assert!(matches!(err, PmgrError::BackupFailed { .. }));
        assert!(runtime.library.get("r").is_none());

        let fields = runtime.output_fields("q").unwrap();
        assert!(runtime.apply_output_schema("q", &fields, None).is_err());
        assert!(runtime.set_response_format_text("q", r#"{"type": "json_schema"}"#).is_err());
        assert!(runtime.library.get("q").unwrap().response_format().is_none());

        let on_disk = fs.read_to_string(Path::new("/proj/prompts.json")).unwrap();
        assert!(!on_disk.contains("\"r\""));
        assert!(!on_disk.contains("response_format"));
    }

    #[test]
    fn test_scan_unknown_template() {
        let fs = MockFsAdapter::new();
        let runtime = runtime(&fs);
        assert!(matches!(
            runtime.scan("nope"),
            Err(PmgrError::TemplateNotFound(_))
        ));
    }
}
