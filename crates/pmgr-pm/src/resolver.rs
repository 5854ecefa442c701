//! Placeholder resolution.
//!
//! Resolution fills text and file placeholders from values gathered by a
//! [`ValueProvider`]. Output placeholders are never touched.
//!
//! File placeholders are matched by exact token (`%% name %%` with single
//! spaces). Text placeholders are matched by pattern (`<<\s*name\s*>>`), and
//! only in the template text between file tokens. Templates with irregular
//! spacing inside file tokens keep their current behavior.

use crate::error::{PromptError, Result};
use crate::loaders::{LoaderRegistry, extension_key};
use crate::provider::{ProvidedValues, ValueProvider};
use crate::scanner::{PlaceholderKind, ScanResult, scan};
use crate::values::PlaceholderValues;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::path::Path;

/// Result of a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// All placeholders were processed.
    Resolved(String),

    /// The provider was cancelled; carries the original, unmodified text.
    Cancelled(String),
}

impl Resolution {
    /// Returns the text, whichever way resolution ended.
    pub fn into_text(self) -> String {
        match self {
            Resolution::Resolved(text) | Resolution::Cancelled(text) => text,
        }
    }

    /// Returns `true` if the provider was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Resolution::Cancelled(_))
    }
}

/// Resolves text and file placeholders in template text.
///
/// # Examples
///
/// ```
/// use pmgr_pm::{PlaceholderResolver, PlaceholderValues, PresetProvider, Resolution};
///
/// let resolver = PlaceholderResolver::default();
/// let mut provider = PresetProvider::new(PlaceholderValues::new().with_text("who", "world"));
/// let out = resolver.resolve("Hello << who >>!", &mut provider)?;
/// assert_eq!(out, Resolution::Resolved("Hello world!".to_string()));
/// # Ok::<(), pmgr_pm::PromptError>(())
/// ```
#[derive(Debug)]
pub struct PlaceholderResolver {
    loaders: LoaderRegistry,
}

impl Default for PlaceholderResolver {
    fn default() -> Self {
        Self::new(LoaderRegistry::with_defaults())
    }
}

impl PlaceholderResolver {
    /// Creates a resolver that loads files through `loaders`.
    pub fn new(loaders: LoaderRegistry) -> Self {
        Self { loaders }
    }

    /// The loader registry in use.
    pub fn loaders(&self) -> &LoaderRegistry {
        &self.loaders
    }

    /// Mutable access to the loader registry.
    pub fn loaders_mut(&mut self) -> &mut LoaderRegistry {
        &mut self.loaders
    }

    /// Resolves `text`, asking `provider` for values at most once.
    ///
    /// Text without text or file placeholders is returned unchanged and the
    /// provider is not called. If the provider cancels, the original text is
    /// returned untouched.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::ProviderFailed`] (or whatever the provider
    /// returns) when value collection itself fails. Per-file load problems
    /// never fail the resolution; they become inline markers.
    pub fn resolve(&self, text: &str, provider: &mut dyn ValueProvider) -> Result<Resolution> {
        let found = scan(text);
        if !found.needs_values() {
            return Ok(Resolution::Resolved(text.to_string()));
        }

        match provider.provide(&found.text, &found.file)? {
            ProvidedValues::Cancelled => {
                tracing::info!("placeholder entry cancelled, keeping original text");
                Ok(Resolution::Cancelled(text.to_string()))
            }
            ProvidedValues::Values(values) => {
                Ok(Resolution::Resolved(self.substitute(text, &found, &values)))
            }
        }
    }

    /// Substitutes already-collected values into `text`.
    ///
    /// `found` must be the scan of `text`. Inserted file content and text
    /// values are never scanned again: text placeholders are only replaced
    /// in the template segments between file tokens, in a single pass.
    pub fn substitute(&self, text: &str, found: &ScanResult, values: &PlaceholderValues) -> String {
        let contents: Vec<(String, String)> = found
            .file
            .iter()
            .map(|name| {
                let content = self.file_content(name, values.file(name).map(|p| p.as_path()));
                (PlaceholderKind::File.token(name), content)
            })
            .collect();
        let fill = TextFill::new(&found.text, values);

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some((pos, token, content)) = next_file_token(rest, &contents) {
            out.push_str(&fill.apply(&rest[..pos]));
            out.push_str(content);
            rest = &rest[pos + token.len()..];
        }
        out.push_str(&fill.apply(rest));

        out
    }

    /// Produces the replacement for one file placeholder.
    fn file_content(&self, name: &str, path: Option<&Path>) -> String {
        let path = path.unwrap_or(Path::new(""));
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if path.as_os_str().is_empty() || !path.exists() {
            tracing::warn!(placeholder = %name, path = %path.display(), "file placeholder has no file");
            return format!("[Missing file: {basename}]");
        }

        let ext = extension_key(path);
        let Some(loader) = self.loaders.get(&ext) else {
            return format!("[Unsupported file type: {ext}]");
        };

        match loader.load(path) {
            Ok(content) => content.trim().to_string(),
            Err(source) => {
                let err = PromptError::FileContent {
                    path: path.to_path_buf(),
                    source,
                };
                let message = format!("{:#}", anyhow::Error::from(err));
                tracing::error!(placeholder = %name, error = %message, "loader failed");
                format!("[Error reading file: {basename}]")
            }
        }
    }
}

/// Earliest exact file token in `text`, with its offset and replacement.
fn next_file_token<'a>(
    text: &str,
    contents: &'a [(String, String)],
) -> Option<(usize, &'a str, &'a str)> {
    contents
        .iter()
        .filter_map(|(token, content)| {
            text.find(token.as_str())
                .map(|pos| (pos, token.as_str(), content.as_str()))
        })
        .min_by_key(|(pos, _, _)| *pos)
}

/// One-pass replacement of text placeholders that have a supplied value.
struct TextFill<'a> {
    pattern: Option<Regex>,
    values: &'a PlaceholderValues,
}

impl<'a> TextFill<'a> {
    fn new(names: &[String], values: &'a PlaceholderValues) -> Self {
        let supplied: Vec<String> = names
            .iter()
            .filter(|name| {
                let has = values.text(name).is_some();
                if !has {
                    tracing::debug!(placeholder = %name, "no value supplied, leaving placeholder");
                }
                has
            })
            .map(|name| regex::escape(name))
            .collect();

        let pattern = if supplied.is_empty() {
            None
        } else {
            Regex::new(&format!(r"<<\s*({})\s*>>", supplied.join("|"))).ok()
        };
        Self { pattern, values }
    }

    fn apply<'t>(&self, segment: &'t str) -> Cow<'t, str> {
        let Some(pattern) = &self.pattern else {
            return Cow::Borrowed(segment);
        };
        pattern.replace_all(segment, |caps: &Captures| {
            self.values.text(&caps[1]).unwrap_or(&caps[0]).to_string()
        })
    }
}
