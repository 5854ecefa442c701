//! Model metadata cache.
//!
//! [`ModelCatalog`] is owned by whoever drives runs and is filled explicitly
//! through [`ModelCatalog::refresh`]. Nothing is looked up implicitly.

use crate::error::{PmgrError, Result};
use crate::tools::fs::FsAdapter;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Capabilities of a single model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Accepts a JSON Schema `response_format`.
    #[serde(default)]
    pub supports_response_schema: bool,

    #[serde(default)]
    pub supports_reasoning: bool,
}

impl ModelInfo {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            supports_response_schema: false,
            supports_reasoning: false,
        }
    }

    pub fn with_response_schema(mut self, supported: bool) -> Self {
        self.supports_response_schema = supported;
        self
    }
}

/// Where model metadata comes from.
pub trait ModelSource {
    /// Returns the full model list.
    fn fetch(&self) -> Result<Vec<ModelInfo>>;
}

/// A fixed list of models.
#[derive(Debug, Clone, Default)]
pub struct StaticModelSource(pub Vec<ModelInfo>);

impl ModelSource for StaticModelSource {
    fn fetch(&self) -> Result<Vec<ModelInfo>> {
        Ok(self.0.clone())
    }
}

/// Reads models from a JSON file.
///
/// Two layouts are accepted: a plain array of [`ModelInfo`], or a provider
/// listing `{"data": [{"id", "model_spec": {"name", "capabilities": {...}}}]}`
/// with camelCase capability flags.
pub struct JsonFileModelSource<'a> {
    path: PathBuf,
    fs: &'a dyn FsAdapter,
}

impl<'a> JsonFileModelSource<'a> {
    /// Reads `path` through `fs` on every fetch.
    pub fn new(path: impl Into<PathBuf>, fs: &'a dyn FsAdapter) -> Self {
        Self {
            path: path.into(),
            fs,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ModelsFile {
    Flat(Vec<ModelInfo>),
    Listing { data: Vec<ListedModel> },
}

#[derive(Deserialize)]
struct ListedModel {
    id: String,
    #[serde(default)]
    model_spec: ModelSpec,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ModelSpec {
    name: Option<String>,
    capabilities: Capabilities,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct Capabilities {
    supports_response_schema: bool,
    supports_reasoning: bool,
}

impl From<ListedModel> for ModelInfo {
    fn from(listed: ListedModel) -> Self {
        Self {
            name: listed.model_spec.name.unwrap_or_else(|| listed.id.clone()),
            id: listed.id,
            supports_response_schema: listed.model_spec.capabilities.supports_response_schema,
            supports_reasoning: listed.model_spec.capabilities.supports_reasoning,
        }
    }
}

impl ModelSource for JsonFileModelSource<'_> {
    fn fetch(&self) -> Result<Vec<ModelInfo>> {
        let text = self
            .fs
            .read_to_string(&self.path)
            .map_err(|e| PmgrError::ModelCatalog(format!("{}: {}", self.path.display(), e)))?;
        let parsed: ModelsFile = serde_json::from_str(&text)
            .map_err(|e| PmgrError::ModelCatalog(format!("{}: {}", self.path.display(), e)))?;
        Ok(match parsed {
            ModelsFile::Flat(models) => models,
            ModelsFile::Listing { data } => data.into_iter().map(ModelInfo::from).collect(),
        })
    }
}

/// Cached model metadata keyed by model id.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: IndexMap<String, ModelInfo>,
    fetched_at: Option<DateTime<Utc>>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cached models with a fresh list from `source`.
    ///
    /// On failure the previous contents are kept.
    pub fn refresh(&mut self, source: &dyn ModelSource) -> Result<usize> {
        let models = source.fetch()?;
        self.models = models.into_iter().map(|m| (m.id.clone(), m)).collect();
        self.fetched_at = Some(Utc::now());
        tracing::debug!(count = self.models.len(), "model catalog refreshed");
        Ok(self.models.len())
    }

    pub fn get(&self, id: &str) -> Option<&ModelInfo> {
        self.models.get(id)
    }

    /// Whether `id` is known and accepts a response schema.
    pub fn supports_response_schema(&self, id: &str) -> bool {
        self.get(id).is_some_and(|m| m.supports_response_schema)
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelInfo> {
        self.models.values()
    }

    /// When the cache was last refreshed, if ever.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }
}
