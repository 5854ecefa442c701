//! Values collected for text and file placeholders.

use std::collections::HashMap;
use std::path::PathBuf;

/// Values supplied for one resolution.
///
/// Text values and file paths are kept apart so that a text placeholder and
/// a file placeholder may share a name.
///
/// # Examples
///
/// ```
/// use pmgr_pm::PlaceholderValues;
///
/// let values = PlaceholderValues::new()
///     .with_text("doc", "Q3 results")
///     .with_file("file", "/tmp/report.txt");
/// assert_eq!(values.text("doc"), Some("Q3 results"));
/// assert!(values.file("file").is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderValues {
    /// Text placeholder name -> replacement value.
    pub text: HashMap<String, String>,

    /// File placeholder name -> path to load.
    pub files: HashMap<String, PathBuf>,
}

impl PlaceholderValues {
    /// Creates an empty value set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text value.
    #[must_use]
    pub fn with_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.text.insert(name.into(), value.into());
        self
    }

    /// Adds a file path.
    #[must_use]
    pub fn with_file(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.files.insert(name.into(), path.into());
        self
    }

    /// Returns the text value for `name`, if supplied.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.text.get(name).map(String::as_str)
    }

    /// Returns the file path for `name`, if supplied.
    pub fn file(&self, name: &str) -> Option<&PathBuf> {
        self.files.get(name)
    }

    /// Returns `true` when every listed name has a value.
    pub fn covers(&self, text_names: &[String], file_names: &[String]) -> bool {
        text_names.iter().all(|n| self.text.contains_key(n))
            && file_names.iter().all(|n| self.files.contains_key(n))
    }
}
