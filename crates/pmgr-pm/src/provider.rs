//! The value provider seam.
//!
//! Resolution asks a provider for every text and file placeholder value in
//! one combined step. A provider is typically a human-facing form; tests and
//! non-interactive callers use [`PresetProvider`].

use crate::error::Result;
use crate::values::PlaceholderValues;

/// Outcome of asking a provider for values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvidedValues {
    /// The provider supplied values (possibly for only some names).
    Values(PlaceholderValues),

    /// The human aborted the form.
    Cancelled,
}

/// Collects values for text and file placeholders.
///
/// Implementations are called at most once per resolution.
pub trait ValueProvider {
    /// Requests values for the given placeholder names.
    ///
    /// # Arguments
    ///
    /// * `text_names` - Text placeholder names, in template order
    /// * `file_names` - File placeholder names, in template order
    ///
    /// # Errors
    ///
    /// Returns an error if the provider itself fails (for example a terminal
    /// I/O error). Cancellation is not an error.
    fn provide(&mut self, text_names: &[String], file_names: &[String])
    -> Result<ProvidedValues>;
}

/// A provider that answers from a fixed set of values.
///
/// # Examples
///
/// ```
/// use pmgr_pm::{PlaceholderValues, PresetProvider, ProvidedValues, ValueProvider};
///
/// let mut provider = PresetProvider::new(PlaceholderValues::new().with_text("doc", "hi"));
/// let out = provider.provide(&["doc".to_string()], &[]).unwrap();
/// assert!(matches!(out, ProvidedValues::Values(_)));
/// assert_eq!(provider.calls(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PresetProvider {
    values: Option<PlaceholderValues>,
    calls: usize,
}

impl PresetProvider {
    /// Creates a provider that always returns `values`.
    pub fn new(values: PlaceholderValues) -> Self {
        Self {
            values: Some(values),
            calls: 0,
        }
    }

    /// Creates a provider that always cancels.
    pub fn cancelling() -> Self {
        Self {
            values: None,
            calls: 0,
        }
    }

    /// Number of times the provider has been asked.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl ValueProvider for PresetProvider {
    fn provide(
        &mut self,
        _text_names: &[String],
        _file_names: &[String],
    ) -> Result<ProvidedValues> {
        self.calls += 1;
        Ok(match &self.values {
            Some(values) => ProvidedValues::Values(values.clone()),
            None => ProvidedValues::Cancelled,
        })
    }
}
