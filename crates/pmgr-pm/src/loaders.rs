//! File content loaders keyed by extension.
//!
//! The registry maps a lowercase extension with its leading dot (`.txt`,
//! `.json`) to a [`ContentLoader`]. Extensions without a loader are reported
//! by the resolver as unsupported.

use anyhow::Context;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Turns a file into prompt text.
pub trait ContentLoader: Send + Sync {
    /// Loads the content of `path` as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded.
    fn load(&self, path: &Path) -> anyhow::Result<String>;
}

/// Reads a file as UTF-8 text.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextLoader;

impl ContentLoader for PlainTextLoader {
    fn load(&self, path: &Path) -> anyhow::Result<String> {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }
}

/// Reads a JSON document and re-emits it pretty-printed.
///
/// Invalid JSON is a load failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLoader;

impl ContentLoader for JsonLoader {
    fn load(&self, path: &Path) -> anyhow::Result<String> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {} as json", path.display()))?;
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

/// Adapts a closure into a [`ContentLoader`].
pub struct FnLoader<F>(F);

impl<F> FnLoader<F>
where
    F: Fn(&Path) -> anyhow::Result<String> + Send + Sync,
{
    /// Wraps `f` as a loader.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> ContentLoader for FnLoader<F>
where
    F: Fn(&Path) -> anyhow::Result<String> + Send + Sync,
{
    fn load(&self, path: &Path) -> anyhow::Result<String> {
        (self.0)(path)
    }
}

/// Extensions handled by [`PlainTextLoader`] in the default registry.
pub const TEXT_EXTENSIONS: &[&str] = &[
    ".txt", ".md", ".markdown", ".csv", ".tsv", ".log", ".yaml", ".yml", ".toml", ".xml", ".html",
    ".htm", ".ini", ".py", ".rs", ".js", ".ts", ".sh", ".sql",
];

/// Registry of content loaders keyed by extension.
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: HashMap<String, Box<dyn ContentLoader>>,
}

impl LoaderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in text and JSON loaders.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for ext in TEXT_EXTENSIONS {
            registry.register(ext, PlainTextLoader);
        }
        registry.register(".json", JsonLoader);
        registry
    }

    /// Registers (or replaces) the loader for `extension`.
    ///
    /// The extension is normalized to lowercase with a leading dot, so
    /// `"TXT"`, `"txt"` and `".txt"` are the same key.
    pub fn register(&mut self, extension: &str, loader: impl ContentLoader + 'static) {
        self.loaders
            .insert(normalize_extension(extension), Box::new(loader));
    }

    /// Looks up the loader for a normalized extension.
    pub fn get(&self, extension: &str) -> Option<&dyn ContentLoader> {
        self.loaders
            .get(&normalize_extension(extension))
            .map(|loader| loader.as_ref())
    }

    /// Returns the registered extensions, sorted.
    pub fn extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = self.loaders.keys().cloned().collect();
        exts.sort();
        exts
    }
}

impl fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}

/// Returns the registry key for a path: lowercase extension with leading dot,
/// or an empty string when the path has no extension.
pub fn extension_key(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

fn normalize_extension(extension: &str) -> String {
    let lower = extension.to_lowercase();
    if lower.is_empty() || lower.starts_with('.') {
        lower
    } else {
        format!(".{lower}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_extension_key() {
        assert_eq!(extension_key(Path::new("/a/b/report.TXT")), ".txt");
        assert_eq!(extension_key(Path::new("archive.tar.gz")), ".gz");
        assert_eq!(extension_key(Path::new("Makefile")), "");
    }

    #[test]
    fn test_register_normalizes_keys() {
        let mut registry = LoaderRegistry::new();
        registry.register("TXT", PlainTextLoader);
        assert!(registry.get(".txt").is_some());
        assert!(registry.get("txt").is_some());
        assert_eq!(registry.extensions(), vec![".txt"]);
    }

    #[test]
    fn test_defaults_cover_text_and_json() {
        let registry = LoaderRegistry::with_defaults();
        assert!(registry.get(".md").is_some());
        assert!(registry.get(".json").is_some());
        assert!(registry.get(".pdf").is_none());
    }

    #[test]
    fn test_closure_loader() {
        let mut registry = LoaderRegistry::new();
        registry.register(
            ".upper",
            FnLoader::new(|path: &Path| -> anyhow::Result<String> {
                Ok(fs::read_to_string(path)?.to_uppercase())
            }),
        );

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("note.upper");
        fs::write(&path, "shout").unwrap();

        let loader = registry.get(".upper").unwrap();
        assert_eq!(loader.load(&path).unwrap(), "SHOUT");
    }

    #[test]
    fn test_json_loader_rejects_invalid_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(JsonLoader.load(&path).is_err());
    }

    #[test]
    fn test_json_loader_pretty_prints() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.json");
        fs::write(&path, r#"{"a":1}"#).unwrap();

        assert_eq!(JsonLoader.load(&path).unwrap(), "{\n  \"a\": 1\n}");
    }
}
