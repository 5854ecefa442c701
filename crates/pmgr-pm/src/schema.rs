//! Output schema reconciliation and building.
//!
//! Output placeholders (`@@ name @@`) declare the fields a model should
//! return. [`reconcile`] merges the current placeholder names with whatever
//! schema was stored before, and [`build`] turns the edited fields back into
//! a JSON Schema object.
//!
//! A stored schema is persisted inside a response-format envelope:
//!
//! ```json
//! {"type": "json_schema", "json_schema": {"name": "...", "strict": true, "schema": {...}}}
//! ```
//!
//! Both the envelope and the bare schema are accepted as input.

use crate::error::{PromptError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::str::FromStr;

/// Title used when no other title is supplied.
pub const DEFAULT_SCHEMA_TITLE: &str = "PromptOutputSchema";

/// JSON type of an output field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
}

impl FieldType {
    /// All field types, in the order an editor should offer them.
    pub const ALL: [FieldType; 5] = [
        FieldType::String,
        FieldType::Number,
        FieldType::Integer,
        FieldType::Boolean,
        FieldType::Array,
    ];

    /// Returns the JSON Schema spelling of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "string" => Ok(FieldType::String),
            "number" => Ok(FieldType::Number),
            "integer" => Ok(FieldType::Integer),
            "boolean" => Ok(FieldType::Boolean),
            "array" => Ok(FieldType::Array),
            _ => Err(format!("invalid field type: {}", s)),
        }
    }
}

/// JSON type of the elements of an array field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    #[default]
    String,
    Number,
    Integer,
    Boolean,
}

impl ItemType {
    /// Returns the JSON Schema spelling of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::String => "string",
            ItemType::Number => "number",
            ItemType::Integer => "integer",
            ItemType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "string" => Ok(ItemType::String),
            "number" => Ok(ItemType::Number),
            "integer" => Ok(ItemType::Integer),
            "boolean" => Ok(ItemType::Boolean),
            _ => Err(format!("invalid item type: {}", s)),
        }
    }
}

/// One field of an output schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Field name, taken from an output placeholder.
    pub name: String,

    /// JSON type of the field.
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Free-form description; may be empty.
    pub description: String,

    /// Whether the model must always return this field.
    pub required: bool,

    /// Element type; only set when `field_type` is [`FieldType::Array`].
    pub item_type: Option<ItemType>,
}

impl SchemaField {
    /// Creates an optional string field with no description.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::String,
            description: String::new(),
            required: false,
            item_type: None,
        }
    }

    /// Changes the field type, keeping `item_type` consistent with it.
    pub fn set_type(&mut self, field_type: FieldType, item_type: Option<ItemType>) {
        self.field_type = field_type;
        self.item_type = match field_type {
            FieldType::Array => Some(item_type.unwrap_or_default()),
            _ => None,
        };
    }
}

/// Returns the bare schema inside a response-format envelope, or the value
/// itself when it is not wrapped.
pub fn schema_body(value: &Value) -> &Value {
    value
        .get("json_schema")
        .and_then(|inner| inner.get("schema"))
        .unwrap_or(value)
}

/// Reconciles output placeholder names with a previously stored schema.
///
/// Fields keep their stored type, description, required flag and item type;
/// names the schema does not know become optional strings. The result is in
/// `names` order.
///
/// # Examples
///
/// ```
/// use pmgr_pm::schema::{build, reconcile, SchemaField};
///
/// let mut summary = SchemaField::new("summary");
/// summary.required = true;
/// let previous = build(&[summary], "Out");
///
/// let fields = reconcile(&["summary".to_string(), "topic".to_string()], Some(&previous));
/// assert!(fields[0].required);
/// assert!(!fields[1].required);
/// ```
pub fn reconcile(names: &[String], previous: Option<&Value>) -> Vec<SchemaField> {
    let Some(previous) = previous else {
        return names.iter().map(SchemaField::new).collect();
    };

    let body = schema_body(previous);
    let empty = Map::new();
    let properties = body
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let required: Vec<&str> = body
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    names
        .iter()
        .map(|name| match properties.get(name) {
            Some(prop) => reconcile_property(name, prop, required.contains(&name.as_str())),
            None => SchemaField::new(name),
        })
        .collect()
}

fn reconcile_property(name: &str, prop: &Value, required: bool) -> SchemaField {
    let declared = prop.get("type").and_then(Value::as_str).unwrap_or("string");
    let field_type = declared.parse::<FieldType>().unwrap_or_else(|_| {
        tracing::warn!(field = %name, declared, "unsupported field type, using string");
        FieldType::String
    });

    let item_type = (field_type == FieldType::Array).then(|| {
        let declared = prop
            .get("items")
            .and_then(|items| items.get("type"))
            .and_then(Value::as_str)
            .unwrap_or("string");
        declared.parse::<ItemType>().unwrap_or_else(|_| {
            tracing::warn!(field = %name, declared, "unsupported item type, using string");
            ItemType::String
        })
    });

    SchemaField {
        name: name.to_string(),
        field_type,
        description: prop
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        required,
        item_type,
    }
}

/// Builds a JSON Schema object from an ordered field list.
///
/// Pure: equal inputs serialize to identical bytes, with properties and
/// `required` in field order.
pub fn build(fields: &[SchemaField], title: &str) -> Value {
    let mut properties = Map::new();
    for field in fields {
        let mut shape = Map::new();
        shape.insert("type".into(), json!(field.field_type.as_str()));
        shape.insert("description".into(), json!(field.description));
        if field.field_type == FieldType::Array {
            let items = field.item_type.unwrap_or_default();
            shape.insert("items".into(), json!({ "type": items.as_str() }));
        }
        properties.insert(field.name.clone(), Value::Object(shape));
    }

    let required: Vec<&str> = fields
        .iter()
        .filter(|f| f.required)
        .map(|f| f.name.as_str())
        .collect();

    json!({
        "type": "object",
        "title": title,
        "properties": properties,
        "required": required,
    })
}

/// Helpers for the persisted response-format envelope.
pub struct ResponseFormat;

impl ResponseFormat {
    /// Wraps a schema artifact in the response-format envelope.
    pub fn wrap(schema: Value) -> Value {
        let name = schema
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SCHEMA_TITLE)
            .to_string();
        json!({
            "type": "json_schema",
            "json_schema": {
                "name": name,
                "strict": true,
                "schema": schema,
            }
        })
    }

    /// Parses a user-edited response-format fragment.
    ///
    /// Blank input means "no format" and parses to an empty object.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::SchemaParse`] when the text is not a JSON
    /// object.
    pub fn parse_fragment(text: &str) -> Result<Value> {
        if text.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        let value: Value = serde_json::from_str(text)
            .map_err(|e| PromptError::SchemaParse(format!("invalid JSON: {e}")))?;
        if !value.is_object() {
            return Err(PromptError::SchemaParse(
                "response format must be a JSON object".to_string(),
            ));
        }
        Ok(value)
    }
}

/// Pulls schema fields out of a model's JSON response, in schema order.
///
/// # Errors
///
/// Returns [`PromptError::SchemaParse`] if the response is not an object or
/// a required field is missing.
pub fn extract_response_fields(
    response: &Value,
    schema: &Value,
    include_missing_optionals: bool,
) -> Result<Vec<(String, Value)>> {
    let object = response
        .as_object()
        .ok_or_else(|| PromptError::SchemaParse("response is not a JSON object".to_string()))?;

    let names: Vec<String> = schema_body(schema)
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| props.keys().cloned().collect())
        .unwrap_or_default();
    let fields = reconcile(&names, Some(schema));

    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        match object.get(&field.name) {
            Some(value) => out.push((field.name, value.clone())),
            None if field.required => {
                return Err(PromptError::SchemaParse(format!(
                    "missing required field: {}",
                    field.name
                )));
            }
            None if include_missing_optionals => out.push((field.name, Value::Null)),
            None => {}
        }
    }
    Ok(out)
}
