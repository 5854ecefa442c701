//! pmgr core - template library engine.
//!
//! This crate owns the persisted prompt template library and everything that
//! happens around it: loading and saving with generational backups,
//! configuration, model metadata, and the workflows that turn a stored
//! template into a ready-to-send prompt. Placeholder scanning, resolution and
//! schema building live in `pmgr-pm`.
//!
//! # Architecture
//!
//! - [`error`]: Error types and result type alias
//! - [`config`]: `.pmgr/config.toml` loading
//! - [`library`]: Template library model and persistence
//! - [`backup`]: Backup rotation guarding library writes
//! - [`models`]: Model metadata cache
//! - [`workflows`]: Init, run preparation and output schema workflows
//! - [`tools`]: File system adapter trait and implementations
//!
//! # Example
//!
//! ```
//! use pmgr_core::{Template, TemplateLibrary};
//! use pmgr_core::tools::MockFsAdapter;
//! use std::path::Path;
//!
//! let fs = MockFsAdapter::new();
//! let path = Path::new("/prompts.json");
//!
//! let mut library = TemplateLibrary::new();
//! library.insert("greet", Template::with_text("Hello << name >>")).unwrap();
//! library.save(&fs, path, 3).unwrap();
//!
//! let loaded = TemplateLibrary::load(&fs, path).unwrap();
//! assert_eq!(loaded.names().collect::<Vec<_>>(), vec!["greet"]);
//! ```

pub mod backup;
pub mod config;
pub mod error;
pub mod library;
pub mod models;
pub mod runtime;
pub mod tools;
pub mod workflows;

// Re-export core types for convenience
pub use backup::BackupRotator;
pub use config::PmgrConfig;
pub use error::{PmgrError, Result};
pub use library::{LibraryHeader, Role, Subtype, Template, TemplateLibrary};
pub use models::{JsonFileModelSource, ModelCatalog, ModelInfo, ModelSource, StaticModelSource};
pub use runtime::LibraryRuntime;
pub use workflows::{PreparedPrompt, ResponseMode, RunOutcome, RunRequest};
