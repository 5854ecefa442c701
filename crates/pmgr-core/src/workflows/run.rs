//! Run preparation workflow.
//!
//! Turns a stored template into the exact text and attributes a model call
//! would use: picks the system prompt, checks the response format against the
//! run mode and model, strips output placeholders and fills in the rest.
//! Sending the request is left to the caller.

use crate::error::{PmgrError, Result};
use crate::library::{TemplateLibrary, VENICE_PARAMETERS_KEY};
use crate::models::ModelCatalog;
use pmgr_pm::{PlaceholderResolver, Resolution, ValueProvider, strip_output_placeholders};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Attribute that must never reach the request; the system prompt travels separately.
const SYSTEM_PROMPT_KEY: &str = "system_prompt";

/// Attribute naming a system template to use instead of the default.
const CUSTOM_SYSTEM_PROMPT_KEY: &str = "custom_system_prompt_name";

/// Provider flag that enables the custom system prompt.
const INCLUDE_SYSTEM_PROMPT_FLAG: &str = "include_venice_system_prompt";

/// How the response will be consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseMode {
    /// Single question and answer; may use a structured response format.
    #[default]
    Question,

    /// Ongoing conversation; plain text only.
    Chat,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Question => "question",
            ResponseMode::Chat => "chat",
        }
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResponseMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "question" => Ok(ResponseMode::Question),
            "chat" => Ok(ResponseMode::Chat),
            _ => Err(format!("invalid response mode: {}", s)),
        }
    }
}

/// Per-run choices.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub mode: ResponseMode,

    /// Model id to run against.
    pub model: String,

    /// System prompt used when the template has no override.
    pub default_system_prompt: String,
}

/// Everything needed to issue the model call.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPrompt {
    pub template: String,
    pub model: String,
    pub mode: ResponseMode,
    pub system_prompt: String,
    /// Prompt text with output placeholders removed and all other placeholders filled.
    pub prompt_text: String,
    pub attributes: Map<String, Value>,
}

/// Result of [`prepare_run`].
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Ready(PreparedPrompt),

    /// The value form was dismissed. Carries the stripped, unresolved text.
    Cancelled { template: String, prompt_text: String },
}

impl RunOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Cancelled { .. })
    }
}

/// Prepares a template for a model run.
///
/// # Errors
///
/// Returns:
/// - `PmgrError::TemplateNotFound` if `name` is not in the library
/// - `PmgrError::SystemPromptNotRunnable` for system templates
/// - `PmgrError::InvalidSystemPrompt` if the selected custom system prompt is not a system template
/// - `PmgrError::ChatWithResponseFormat` for chat runs of templates with a response format
/// - `PmgrError::ModelLacksResponseSchema` if the model cannot honor the response format
/// - `PmgrError::Prompt` if the value provider fails
#[tracing::instrument(skip_all, fields(template = %name, mode = %request.mode, model = %request.model))]
pub fn prepare_run(
    library: &TemplateLibrary,
    name: &str,
    request: &RunRequest,
    catalog: &ModelCatalog,
    resolver: &PlaceholderResolver,
    provider: &mut dyn ValueProvider,
) -> Result<RunOutcome> {
    let template = library.require(name)?;
    if template.is_system() {
        return Err(PmgrError::SystemPromptNotRunnable(name.to_string()));
    }

    let mut attributes = template.default_attributes.clone();
    attributes.remove(SYSTEM_PROMPT_KEY);
    let custom_prompt = attributes.remove(CUSTOM_SYSTEM_PROMPT_KEY);

    let mut system_prompt = if template.prompt_system_use {
        template.prompt_system_text.clone()
    } else {
        request.default_system_prompt.clone()
    };

    let include_custom = attributes
        .get(VENICE_PARAMETERS_KEY)
        .and_then(|p| p.get(INCLUDE_SYSTEM_PROMPT_FLAG))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if let Some(custom) = custom_prompt.as_ref().and_then(Value::as_str)
        && !custom.is_empty()
        && include_custom
    {
        match library.get(custom) {
            Some(selected) if selected.is_system() => {
                system_prompt = selected.prompt_text.clone();
            }
            _ => return Err(PmgrError::InvalidSystemPrompt(custom.to_string())),
        }
    }

    if template.response_format().is_some() {
        if request.mode == ResponseMode::Chat {
            return Err(PmgrError::ChatWithResponseFormat);
        }
        if !catalog.supports_response_schema(&request.model) {
            return Err(PmgrError::ModelLacksResponseSchema(request.model.clone()));
        }
    }

    let stripped = strip_output_placeholders(&template.prompt_text);
    let prompt_text = match resolver.resolve(&stripped, provider)? {
        Resolution::Resolved(text) => text,
        Resolution::Cancelled(text) => {
            tracing::info!("run cancelled");
            return Ok(RunOutcome::Cancelled {
                template: name.to_string(),
                prompt_text: text,
            });
        }
    };

    tracing::debug!(chars = prompt_text.len(), "prompt prepared");
    Ok(RunOutcome::Ready(PreparedPrompt {
        template: name.to_string(),
        model: request.model.clone(),
        mode: request.mode,
        system_prompt,
        prompt_text,
        attributes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{Role, Template};
    use crate::models::{ModelInfo, StaticModelSource};
    use pmgr_pm::{PlaceholderValues, PresetProvider};
    use serde_json::json;

    fn request(mode: ResponseMode, model: &str) -> RunRequest {
        RunRequest {
            mode,
            model: model.to_string(),
            default_system_prompt: "default".to_string(),
        }
    }

    fn catalog() -> ModelCatalog {
        let mut catalog = ModelCatalog::new();
        catalog
            .refresh(&StaticModelSource(vec![
                ModelInfo::new("structured").with_response_schema(true),
                ModelInfo::new("plain"),
            ]))
            .unwrap();
        catalog
    }

    fn library() -> TemplateLibrary {
        let mut library = TemplateLibrary::new();
        library
            .insert("ask", Template::with_text("Tell me about << topic >>. @@ answer @@"))
            .unwrap();
        library
            .insert(
                "sys",
                Template {
                    role: Role::System,
                    ..Template::with_text("You are a pirate.")
                },
            )
            .unwrap();
        library
    }

    fn run(
        library: &TemplateLibrary,
        name: &str,
        request: &RunRequest,
        provider: &mut dyn ValueProvider,
    ) -> Result<RunOutcome> {
        prepare_run(
            library,
            name,
            request,
            &catalog(),
            &PlaceholderResolver::default(),
            provider,
        )
    }

    #[test]
    fn test_prepare_strips_output_and_resolves() {
        let mut provider =
            PresetProvider::new(PlaceholderValues::new().with_text("topic", "tides"));
        let outcome = run(&library(), "ask", &request(ResponseMode::Question, "plain"), &mut provider)
            .unwrap();

        match outcome {
            RunOutcome::Ready(prepared) => {
                assert_eq!(prepared.prompt_text, "Tell me about tides. ");
                assert_eq!(prepared.system_prompt, "default");
                assert_eq!(prepared.model, "plain");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_system_template_not_runnable() {
        let mut provider = PresetProvider::cancelling();
        let err = run(&library(), "sys", &request(ResponseMode::Question, "plain"), &mut provider)
            .unwrap_err();
        assert!(matches!(err, PmgrError::SystemPromptNotRunnable(_)));
    }

    #[test]
    fn test_missing_template() {
        let mut provider = PresetProvider::cancelling();
        let err = run(&library(), "nope", &request(ResponseMode::Question, "plain"), &mut provider)
            .unwrap_err();
        assert!(matches!(err, PmgrError::TemplateNotFound(_)));
    }

    #[test]
    fn test_cancel_returns_stripped_text() {
        let mut provider = PresetProvider::cancelling();
        let outcome = run(&library(), "ask", &request(ResponseMode::Question, "plain"), &mut provider)
            .unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Cancelled {
                template: "ask".to_string(),
                prompt_text: "Tell me about << topic >>. ".to_string(),
            }
        );
    }

    #[test]
    fn test_override_and_custom_system_prompt() {
        let mut library = library();
        {
            let ask = library.get_mut("ask").unwrap();
            ask.prompt_system_use = true;
            ask.prompt_system_text = "override".to_string();
            ask.default_attributes
                .insert("system_prompt".to_string(), json!("leaked"));
        }
        let mut provider =
            PresetProvider::new(PlaceholderValues::new().with_text("topic", "x"));
        let RunOutcome::Ready(prepared) =
            run(&library, "ask", &request(ResponseMode::Question, "plain"), &mut provider).unwrap()
        else {
            panic!("expected a prepared prompt");
        };
        assert_eq!(prepared.system_prompt, "override");
        assert!(!prepared.attributes.contains_key("system_prompt"));

        {
            let attrs = &mut library.get_mut("ask").unwrap().default_attributes;
            attrs.insert("custom_system_prompt_name".to_string(), json!("sys"));
            attrs.insert(
                "venice_parameters".to_string(),
                json!({"include_venice_system_prompt": true}),
            );
        }
        let RunOutcome::Ready(prepared) =
            run(&library, "ask", &request(ResponseMode::Question, "plain"), &mut provider).unwrap()
        else {
            panic!("expected a prepared prompt");
        };
        assert_eq!(prepared.system_prompt, "You are a pirate.");
        assert!(!prepared.attributes.contains_key("custom_system_prompt_name"));
    }

    #[test]
    fn test_custom_system_prompt_must_be_system_role() {
        let mut library = library();
        {
            let attrs = &mut library.get_mut("ask").unwrap().default_attributes;
            attrs.insert("custom_system_prompt_name".to_string(), json!("ask"));
            attrs.insert(
                "venice_parameters".to_string(),
                json!({"include_venice_system_prompt": true}),
            );
        }
        let mut provider = PresetProvider::cancelling();
        let err = run(&library, "ask", &request(ResponseMode::Question, "plain"), &mut provider)
            .unwrap_err();
        assert!(matches!(err, PmgrError::InvalidSystemPrompt(name) if name == "ask"));
    }

    #[test]
    fn test_custom_system_prompt_ignored_without_flag() {
        let mut library = library();
        library
            .get_mut("ask")
            .unwrap()
            .default_attributes
            .insert("custom_system_prompt_name".to_string(), json!("missing"));
        let mut provider =
            PresetProvider::new(PlaceholderValues::new().with_text("topic", "x"));
        let outcome =
            run(&library, "ask", &request(ResponseMode::Question, "plain"), &mut provider).unwrap();
        assert!(!outcome.is_cancelled());
    }

    #[test]
    fn test_response_format_checks() {
        let mut library = library();
        library
            .get_mut("ask")
            .unwrap()
            .set_response_format(Some(json!({"type": "json_schema"})));
        let mut provider =
            PresetProvider::new(PlaceholderValues::new().with_text("topic", "x"));

        let err = run(&library, "ask", &request(ResponseMode::Chat, "structured"), &mut provider)
            .unwrap_err();
        assert!(matches!(err, PmgrError::ChatWithResponseFormat));

        let err = run(&library, "ask", &request(ResponseMode::Question, "plain"), &mut provider)
            .unwrap_err();
        assert!(matches!(err, PmgrError::ModelLacksResponseSchema(m) if m == "plain"));

        let err = run(&library, "ask", &request(ResponseMode::Question, "unknown"), &mut provider)
            .unwrap_err();
        assert!(matches!(err, PmgrError::ModelLacksResponseSchema(_)));

        assert_eq!(provider.calls(), 0);

        let outcome =
            run(&library, "ask", &request(ResponseMode::Question, "structured"), &mut provider)
                .unwrap();
        assert!(!outcome.is_cancelled());
    }

    #[test]
    fn test_response_mode_parse() {
        assert_eq!("chat".parse::<ResponseMode>(), Ok(ResponseMode::Chat));
        assert_eq!(ResponseMode::Question.to_string(), "question");
        assert!("other".parse::<ResponseMode>().is_err());
    }
}
