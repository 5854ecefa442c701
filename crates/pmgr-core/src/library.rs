//! Template library model.
//!
//! A library is a single JSON file:
//!
//! ```json
//! {
//!     "header": { "app_name": "", "data_version": "", "file_type": "" },
//!     "data": { "<name>": { "prompt_text": "...", "type": "user", ... } }
//! }
//! ```
//!
//! Templates keep their file order. Saving always runs the [`BackupRotator`]
//! first and writes nothing if the backup fails.

use crate::backup::BackupRotator;
use crate::config::DEFAULT_SYSTEM_PROMPT;
use crate::error::{PmgrError, Result};
use crate::tools::fs::FsAdapter;
use indexmap::IndexMap;
use pmgr_pm::ResponseFormat;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Attribute holding the structured response format.
pub const RESPONSE_FORMAT_KEY: &str = "response_format";

/// Attribute holding provider-specific parameters.
pub const VENICE_PARAMETERS_KEY: &str = "venice_parameters";

/// Library file header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryHeader {
    pub app_name: String,
    pub data_version: String,
    pub file_type: String,
}

/// Who a template speaks as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A prompt that can be run.
    #[default]
    User,

    /// A system prompt that other templates may select.
    System,
}

impl Role {
    /// Returns the string used in the library file.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "system" => Ok(Role::System),
            _ => Err(format!("invalid role: {}", s)),
        }
    }
}

/// Kind of user prompt. Ignored for system templates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subtype {
    Summary,
    Evaluate,
    #[default]
    Query,
}

impl Subtype {
    /// Returns the string used in the library file.
    pub fn as_str(&self) -> &'static str {
        match self {
            Subtype::Summary => "summary",
            Subtype::Evaluate => "evaluate",
            Subtype::Query => "query",
        }
    }
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Subtype {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "summary" => Ok(Subtype::Summary),
            "evaluate" => Ok(Subtype::Evaluate),
            "query" => Ok(Subtype::Query),
            _ => Err(format!("invalid subtype: {}", s)),
        }
    }
}

fn default_system_text() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

/// A single prompt template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub prompt_text: String,

    #[serde(rename = "type", default)]
    pub role: Role,

    #[serde(default)]
    pub subtype: Subtype,

    #[serde(default)]
    pub notes: String,

    /// Request attributes copied into every run of this template.
    #[serde(default)]
    pub default_attributes: Map<String, Value>,

    /// Use `prompt_system_text` instead of the configured system prompt.
    #[serde(default)]
    pub prompt_system_use: bool,

    #[serde(default = "default_system_text")]
    pub prompt_system_text: String,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            prompt_text: String::new(),
            role: Role::default(),
            subtype: Subtype::default(),
            notes: String::new(),
            default_attributes: Map::new(),
            prompt_system_use: false,
            prompt_system_text: default_system_text(),
        }
    }
}

fn non_empty(value: &Value) -> Option<&Value> {
    match value {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        other => Some(other),
    }
}

impl Template {
    /// Creates a user template with the given text.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            prompt_text: text.into(),
            ..Self::default()
        }
    }

    /// The stored response format, if any.
    ///
    /// `default_attributes.response_format` wins over
    /// `default_attributes.venice_parameters.response_format`. Null and empty
    /// objects count as absent.
    pub fn response_format(&self) -> Option<&Value> {
        if let Some(found) = self
            .default_attributes
            .get(RESPONSE_FORMAT_KEY)
            .and_then(non_empty)
        {
            return Some(found);
        }
        self.default_attributes
            .get(VENICE_PARAMETERS_KEY)
            .and_then(|params| params.get(RESPONSE_FORMAT_KEY))
            .and_then(non_empty)
    }

    /// Stores or clears the response format.
    ///
    /// Clearing also removes a copy nested under `venice_parameters` so the
    /// old value does not resurface on the next read.
    pub fn set_response_format(&mut self, format: Option<Value>) {
        match format.as_ref().and_then(non_empty) {
            Some(value) => {
                self.default_attributes
                    .insert(RESPONSE_FORMAT_KEY.to_string(), value.clone());
            }
            None => {
                self.default_attributes.remove(RESPONSE_FORMAT_KEY);
                if let Some(Value::Object(params)) =
                    self.default_attributes.get_mut(VENICE_PARAMETERS_KEY)
                {
                    params.remove(RESPONSE_FORMAT_KEY);
                }
            }
        }
    }

    /// Whether this template is a system prompt.
    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

/// All templates of one library file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateLibrary {
    #[serde(default)]
    pub header: LibraryHeader,

    #[serde(default)]
    data: IndexMap<String, Template>,
}

impl TemplateLibrary {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a library from its JSON text.
    ///
    /// `path` is only used in the error message.
    pub fn from_json(text: &str, path: &Path) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| PmgrError::LibraryParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Serializes the library with a four-space indent.
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| PmgrError::Anyhow(e.into()))
    }

    /// Loads a library file.
    ///
    /// # Errors
    ///
    /// Returns `PmgrError::PathNotFound` if the file is missing and
    /// `PmgrError::LibraryParseError` if it is not a valid library.
    #[tracing::instrument(skip(fs), fields(path = %path.display()))]
    pub fn load(fs: &dyn FsAdapter, path: &Path) -> Result<Self> {
        let text = fs.read_to_string(path)?;
        let library = Self::from_json(&text, path)?;
        tracing::debug!(templates = library.len(), "library loaded");
        Ok(library)
    }

    /// Backs up the current file, then writes the library.
    ///
    /// # Errors
    ///
    /// Returns `PmgrError::BackupFailed` without writing anything if the
    /// backup step fails.
    #[tracing::instrument(skip(self, fs), fields(path = %path.display()))]
    pub fn save(&self, fs: &dyn FsAdapter, path: &Path, max_backups: usize) -> Result<()> {
        let content = self.to_json()?;
        BackupRotator::new(path, max_backups).backup_current_file(fs)?;
        fs.write(path, &content)?;
        tracing::info!(templates = self.len(), "library saved");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Template names in file order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Templates in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Template)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.data.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Template> {
        self.data.get_mut(name)
    }

    /// Looks up a template, failing with `TemplateNotFound`.
    pub fn require(&self, name: &str) -> Result<&Template> {
        self.get(name)
            .ok_or_else(|| PmgrError::TemplateNotFound(name.to_string()))
    }

    /// Mutable variant of [`TemplateLibrary::require`].
    pub fn require_mut(&mut self, name: &str) -> Result<&mut Template> {
        self.get_mut(name)
            .ok_or_else(|| PmgrError::TemplateNotFound(name.to_string()))
    }

    /// Adds an empty user template.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTemplateName` for blank names and
    /// `TemplateAlreadyExists` for duplicates.
    pub fn create(&mut self, name: &str) -> Result<&mut Template> {
        self.insert(name, Template::default())
    }

    /// Adds a template under `name`, which is trimmed first.
    pub fn insert(&mut self, name: &str, template: Template) -> Result<&mut Template> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PmgrError::InvalidTemplateName(name.to_string()));
        }
        if self.data.contains_key(name) {
            return Err(PmgrError::TemplateAlreadyExists(name.to_string()));
        }
        let entry = self.data.entry(name.to_string()).or_insert(template);
        Ok(entry)
    }

    /// Removes a template, keeping the order of the rest.
    pub fn remove(&mut self, name: &str) -> Result<Template> {
        self.data
            .shift_remove(name)
            .ok_or_else(|| PmgrError::TemplateNotFound(name.to_string()))
    }

    /// Names of all system templates, in file order.
    pub fn system_prompt_names(&self) -> Vec<&str> {
        self.data
            .iter()
            .filter(|(_, t)| t.is_system())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Replaces a template's response format from user-edited JSON.
    ///
    /// Empty text or `{}` clears it. Malformed JSON is rejected and the
    /// stored value is left as it was.
    pub fn set_response_format_text(&mut self, name: &str, text: &str) -> Result<()> {
        let template = self.require_mut(name)?;
        let value = ResponseFormat::parse_fragment(text)?;
        template.set_response_format(Some(value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fs_mock::{FsOp, MockFsAdapter};
    use serde_json::json;
    use std::path::PathBuf;

    const SAMPLE: &str = r#"{
        "header": {"app_name": "ChatRecall", "data_version": "1", "file_type": "prompts"},
        "data": {
            "zeta": {"prompt_text": "Z << a >>", "type": "user", "subtype": "summary"},
            "alpha": {"prompt_text": "Be terse.", "type": "system"},
            "mid": {"prompt_text": "", "default_attributes": {}}
        }
    }"#;

    fn sample() -> TemplateLibrary {
        TemplateLibrary::from_json(SAMPLE, Path::new("sample.json")).unwrap()
    }

    #[test]
    fn test_parse_keeps_file_order_and_defaults() {
        let library = sample();
        assert_eq!(library.names().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(library.header.app_name, "ChatRecall");

        let mid = library.get("mid").unwrap();
        assert_eq!(mid.role, Role::User);
        assert_eq!(mid.subtype, Subtype::Query);
        assert_eq!(mid.prompt_system_text, "You are a helpful AI assistant.");
        assert!(!mid.prompt_system_use);
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let library = TemplateLibrary::from_json("{}", Path::new("x.json")).unwrap();
        assert!(library.is_empty());
        assert_eq!(library.header, LibraryHeader::default());
    }

    #[test]
    fn test_parse_error_names_path() {
        let err = TemplateLibrary::from_json("[1,", Path::new("broken.json")).unwrap_err();
        match err {
            PmgrError::LibraryParseError { path, .. } => {
                assert_eq!(path, PathBuf::from("broken.json"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_system_prompt_names() {
        assert_eq!(sample().system_prompt_names(), vec!["alpha"]);
    }

    #[test]
    fn test_create_rejects_blank_and_duplicate() {
        let mut library = sample();
        assert!(matches!(
            library.create("   "),
            Err(PmgrError::InvalidTemplateName(_))
        ));
        assert!(matches!(
            library.create("alpha"),
            Err(PmgrError::TemplateAlreadyExists(_))
        ));

        library.create("  fresh ").unwrap();
        assert_eq!(library.names().last(), Some("fresh"));
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut library = sample();
        library.remove("zeta").unwrap();
        assert_eq!(library.names().collect::<Vec<_>>(), vec!["alpha", "mid"]);
        assert!(matches!(
            library.remove("zeta"),
            Err(PmgrError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_to_json_uses_four_space_indent() {
        let mut library = TemplateLibrary::new();
        library.create("one").unwrap();
        let text = library.to_json().unwrap();
        assert!(text.contains("\n    \"header\": {"));
        assert!(text.contains("\n        \"one\": {"));
    }

    #[test]
    fn test_response_format_lookup_order() {
        let mut template = Template::with_text("x");
        template.default_attributes.insert(
            VENICE_PARAMETERS_KEY.to_string(),
            json!({"response_format": {"type": "json_schema", "from": "venice"}}),
        );
        assert_eq!(template.response_format().unwrap()["from"], "venice");

        template
            .default_attributes
            .insert(RESPONSE_FORMAT_KEY.to_string(), json!({"type": "json_schema", "from": "top"}));
        assert_eq!(template.response_format().unwrap()["from"], "top");

        template.set_response_format(None);
        assert!(template.response_format().is_none());
    }

    #[test]
    fn test_set_response_format_text() {
        let mut library = sample();
        library
            .set_response_format_text("zeta", r#"{"type": "json_schema"}"#)
            .unwrap();
        assert_eq!(
            library.get("zeta").unwrap().response_format(),
            Some(&json!({"type": "json_schema"}))
        );

        let err = library.set_response_format_text("zeta", "{not json");
        assert!(err.is_err());
        assert!(library.get("zeta").unwrap().response_format().is_some());

        library.set_response_format_text("zeta", "").unwrap();
        assert!(library.get("zeta").unwrap().response_format().is_none());
    }

    #[test]
    fn test_save_backs_up_before_writing() {
        let fs = MockFsAdapter::new();
        let path = Path::new("/lib/prompts.json");
        fs.write(path, SAMPLE).unwrap();

        let mut library = TemplateLibrary::load(&fs, path).unwrap();
        library.create("added").unwrap();
        library.save(&fs, path, 3).unwrap();

        let ops = fs.ops();
        assert_eq!(
            ops[1..].to_vec(),
            vec![
                FsOp::Copy(path.to_path_buf(), PathBuf::from("/lib/prompts.bak1")),
                FsOp::Write(path.to_path_buf()),
            ]
        );
        assert_eq!(
            fs.read_to_string(Path::new("/lib/prompts.bak1")).unwrap(),
            SAMPLE
        );
        let reloaded = TemplateLibrary::load(&fs, path).unwrap();
        assert!(reloaded.get("added").is_some());
    }

    #[test]
    fn test_failed_backup_aborts_save() {
        let fs = MockFsAdapter::new();
        let path = Path::new("/lib/prompts.json");
        fs.write(path, SAMPLE).unwrap();
        fs.fail_on("/lib/prompts.bak1");

        let mut library = sample();
        library.create("lost").unwrap();
        let err = library.save(&fs, path, 3).unwrap_err();

        assert!(matches!(err, PmgrError::BackupFailed { .. }));
        assert_eq!(fs.read_to_string(path).unwrap(), SAMPLE);
    }
}
