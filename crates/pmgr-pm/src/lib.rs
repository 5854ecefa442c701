//! Placeholder engine for pmgr.
//!
//! This crate finds placeholders in prompt template text, fills the text and
//! file placeholders from collected values, and turns output placeholders into
//! a JSON Schema for structured model responses.
//!
//! | Syntax | Kind | Handled by |
//! |--------|------|------------|
//! | `<< name >>` | text | [`PlaceholderResolver`] |
//! | `%% name %%` | file | [`PlaceholderResolver`] via [`LoaderRegistry`] |
//! | `@@ name @@` | output | [`schema::reconcile`] / [`schema::build`] |
//!
//! # Examples
//!
//! ```
//! use pmgr_pm::{scan, PlaceholderResolver, PlaceholderValues, PresetProvider};
//!
//! let template = "Summarize << doc >> and return @@ summary @@";
//! let found = scan(template);
//! assert_eq!(found.output, vec!["summary"]);
//!
//! let resolver = PlaceholderResolver::default();
//! let mut provider = PresetProvider::new(PlaceholderValues::new().with_text("doc", "the memo"));
//! let text = resolver.resolve(template, &mut provider)?.into_text();
//! assert_eq!(text, "Summarize the memo and return @@ summary @@");
//! # Ok::<(), pmgr_pm::PromptError>(())
//! ```

pub mod error;
pub mod loaders;
pub mod provider;
pub mod resolver;
pub mod scanner;
pub mod schema;
pub mod values;

// Re-export public types for convenience
pub use error::{PromptError, Result};
pub use loaders::{ContentLoader, LoaderRegistry};
pub use provider::{PresetProvider, ProvidedValues, ValueProvider};
pub use resolver::{PlaceholderResolver, Resolution};
pub use scanner::{Placeholder, PlaceholderKind, ScanResult, scan, strip_output_placeholders};
pub use schema::{FieldType, ItemType, ResponseFormat, SchemaField};
pub use values::PlaceholderValues;
