//! Placeholder scanning for template text.
//!
//! Three placeholder kinds share one buffer:
//!
//! - text: `<< name >>` (whitespace optional)
//! - file: `%% name %%` (whitespace required)
//! - output: `@@ name @@` (whitespace required)
//!
//! Names are made of word characters, `.` and `-`, so none of the delimiters
//! can appear inside a name and the kinds never overlap. Each kind is scanned
//! by its own regex in a single pass.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static TEXT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<<\s*([\w.-]+)\s*>>").expect("valid text placeholder regex"));

static FILE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%%\s+([\w.-]+)\s+%%").expect("valid file placeholder regex"));

static OUTPUT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@@\s+([\w.-]+)\s+@@").expect("valid output placeholder regex"));

// Stripping is looser than scanning: whitespace around the name is optional.
static OUTPUT_STRIP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@@\s*[\w.-]+\s*@@").expect("valid output strip regex"));

/// The kind of a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderKind {
    /// `<< name >>`, replaced by a caller-supplied string.
    Text,

    /// `%% name %%`, replaced by loaded file content.
    File,

    /// `@@ name @@`, declares a structured output field.
    Output,
}

impl PlaceholderKind {
    /// Returns the opening and closing delimiters for this kind.
    pub fn delimiters(&self) -> (&'static str, &'static str) {
        match self {
            PlaceholderKind::Text => ("<<", ">>"),
            PlaceholderKind::File => ("%%", "%%"),
            PlaceholderKind::Output => ("@@", "@@"),
        }
    }

    /// Renders the canonical token for `name`, e.g. `%% report %%`.
    pub fn token(&self, name: &str) -> String {
        let (open, close) = self.delimiters();
        format!("{open} {name} {close}")
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            PlaceholderKind::Text => &TEXT_PATTERN,
            PlaceholderKind::File => &FILE_PATTERN,
            PlaceholderKind::Output => &OUTPUT_PATTERN,
        }
    }
}

impl fmt::Display for PlaceholderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlaceholderKind::Text => "text",
            PlaceholderKind::File => "file",
            PlaceholderKind::Output => "output",
        };
        f.write_str(label)
    }
}

/// A named placeholder found in template text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Placeholder {
    /// Placeholder name, without delimiters or surrounding whitespace.
    pub name: String,

    /// Which micro-syntax the placeholder was written in.
    pub kind: PlaceholderKind,
}

/// Ordered, deduplicated placeholder names of every kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Text placeholder names in first-seen order.
    pub text: Vec<String>,

    /// File placeholder names in first-seen order.
    pub file: Vec<String>,

    /// Output placeholder names in first-seen order.
    pub output: Vec<String>,
}

impl ScanResult {
    /// Returns `true` when no placeholder of any kind was found.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.file.is_empty() && self.output.is_empty()
    }

    /// Returns `true` when there is something for a value provider to fill.
    pub fn needs_values(&self) -> bool {
        !self.text.is_empty() || !self.file.is_empty()
    }

    /// Returns the names for a single kind.
    pub fn names(&self, kind: PlaceholderKind) -> &[String] {
        match kind {
            PlaceholderKind::Text => &self.text,
            PlaceholderKind::File => &self.file,
            PlaceholderKind::Output => &self.output,
        }
    }

    /// Iterates over all placeholders: text first, then file, then output.
    pub fn placeholders(&self) -> impl Iterator<Item = Placeholder> + '_ {
        [
            PlaceholderKind::Text,
            PlaceholderKind::File,
            PlaceholderKind::Output,
        ]
        .into_iter()
        .flat_map(move |kind| {
            self.names(kind).iter().map(move |name| Placeholder {
                name: name.clone(),
                kind,
            })
        })
    }
}

/// Scans template text for placeholders.
///
/// # Examples
///
/// ```
/// use pmgr_pm::scanner::scan;
///
/// let found = scan("Summarize << doc >> using %% file %% and output @@ answer @@");
/// assert_eq!(found.text, vec!["doc"]);
/// assert_eq!(found.file, vec!["file"]);
/// assert_eq!(found.output, vec!["answer"]);
/// ```
pub fn scan(text: &str) -> ScanResult {
    let result = ScanResult {
        text: scan_kind(text, PlaceholderKind::Text),
        file: scan_kind(text, PlaceholderKind::File),
        output: scan_kind(text, PlaceholderKind::Output),
    };
    tracing::debug!(
        text = result.text.len(),
        file = result.file.len(),
        output = result.output.len(),
        "scanned placeholders"
    );
    result
}

/// Scans for a single placeholder kind, deduplicating by first appearance.
pub fn scan_kind(text: &str, kind: PlaceholderKind) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in kind.pattern().captures_iter(text) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Removes every `@@ name @@` token before text is handed to a model.
///
/// This is not part of resolution; it only ever touches output tokens.
pub fn strip_output_placeholders(text: &str) -> String {
    OUTPUT_STRIP_PATTERN.replace_all(text, "").into_owned()
}
