//! Output schema workflow.
//!
//! Output placeholders (`@@ name @@`) in a template describe the fields of a
//! structured answer. This workflow reconciles them with the schema already
//! stored on the template and writes the edited result back.

use crate::error::{PmgrError, Result};
use crate::library::TemplateLibrary;
use pmgr_pm::scanner::{PlaceholderKind, scan_kind};
use pmgr_pm::{PromptError, ResponseFormat, SchemaField, schema};
use serde_json::Value;

/// Editable fields for the template's output placeholders.
///
/// Fields already described by the stored response format keep their type,
/// description and required flag; new names start as optional strings.
#[tracing::instrument(skip(library))]
pub fn output_fields(library: &TemplateLibrary, name: &str) -> Result<Vec<SchemaField>> {
    let template = library.require(name)?;
    let names = scan_kind(&template.prompt_text, PlaceholderKind::Output);
    let fields = schema::reconcile(&names, template.response_format());
    tracing::debug!(fields = fields.len(), "output fields reconciled");
    Ok(fields)
}

/// Builds the schema for `fields` and stores it as the template's response format.
///
/// An empty field list removes the response format instead.
#[tracing::instrument(skip(library, fields), fields(count = fields.len()))]
pub fn apply_output_schema(
    library: &mut TemplateLibrary,
    name: &str,
    fields: &[SchemaField],
    title: &str,
) -> Result<()> {
    let template = library.require_mut(name)?;
    if fields.is_empty() {
        template.set_response_format(None);
        tracing::info!("response format removed");
        return Ok(());
    }

    let artifact = schema::build(fields, title);
    template.set_response_format(Some(ResponseFormat::wrap(artifact)));
    tracing::info!("response format stored");
    Ok(())
}

/// Checks a model's JSON answer against the template's stored schema and
/// returns its fields in schema order.
///
/// With `include_missing_optionals`, absent optional fields are listed as
/// `null`.
///
/// # Errors
///
/// Returns `PmgrError::NoResponseFormat` when the template has no schema,
/// and a schema parse error when the answer is not JSON, not an object, or
/// lacks a required field.
#[tracing::instrument(skip(library, response))]
pub fn check_response(
    library: &TemplateLibrary,
    name: &str,
    response: &str,
    include_missing_optionals: bool,
) -> Result<Vec<(String, Value)>> {
    let format = library
        .require(name)?
        .response_format()
        .ok_or_else(|| PmgrError::NoResponseFormat(name.to_string()))?;

    let answer: Value = serde_json::from_str(response)
        .map_err(|e| PromptError::SchemaParse(format!("response is not valid JSON: {e}")))?;
    let fields = schema::extract_response_fields(&answer, format, include_missing_optionals)?;
    tracing::debug!(fields = fields.len(), "response checked");
    Ok(fields)
}
