//! Integration tests for run preparation with real files.

use pmgr_core::{
    LibraryRuntime, ModelInfo, PmgrConfig, PmgrError, ResponseMode, RunOutcome, StaticModelSource,
    Template,
};
use pmgr_pm::{PlaceholderValues, PresetProvider};
use std::fs;
use tempfile::TempDir;

fn runtime_with(temp_dir: &TempDir, name: &str, text: &str) -> LibraryRuntime {
    let config = PmgrConfig::new(temp_dir.path().to_path_buf());
    let mut runtime = LibraryRuntime::open(config).unwrap();
    runtime.add_template(name, Template::with_text(text)).unwrap();
    runtime
}

fn ready(outcome: RunOutcome) -> pmgr_core::PreparedPrompt {
    match outcome {
        RunOutcome::Ready(prepared) => prepared,
        other => panic!("expected a prepared prompt, got {other:?}"),
    }
}

#[test]
fn test_summarize_example_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let report = temp_dir.path().join("report.txt");
    fs::write(&report, "Revenue up 5%\n").unwrap();

    let runtime = runtime_with(
        &temp_dir,
        "summary",
        "Summarize << doc >> using %% file %% and output @@ answer @@",
    );

    let scanned = runtime.scan("summary").unwrap();
    assert_eq!(scanned.text, vec!["doc"]);
    assert_eq!(scanned.file, vec!["file"]);
    assert_eq!(scanned.output, vec!["answer"]);

    let mut provider = PresetProvider::new(
        PlaceholderValues::new()
            .with_text("doc", "Q3 results")
            .with_file("file", &report),
    );
    let prepared = ready(
        runtime
            .prepare_run("summary", ResponseMode::Question, None, &mut provider)
            .unwrap(),
    );

    // Output placeholders are stripped before the prompt is sent
    assert_eq!(
        prepared.prompt_text,
        "Summarize Q3 results using Revenue up 5% and output "
    );
}

#[test]
fn test_file_markers_in_prepared_prompt() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("data.bin");
    fs::write(&data, [0u8, 1, 2]).unwrap();

    let runtime = runtime_with(&temp_dir, "files", "A: %% a %%\nB: %% b %%");

    let mut provider = PresetProvider::new(
        PlaceholderValues::new()
            .with_file("a", temp_dir.path().join("gone.txt"))
            .with_file("b", &data),
    );
    let prepared = ready(
        runtime
            .prepare_run("files", ResponseMode::Chat, None, &mut provider)
            .unwrap(),
    );

    assert_eq!(
        prepared.prompt_text,
        "A: [Missing file: gone.txt]\nB: [Unsupported file type: .bin]"
    );
    assert_eq!(prepared.mode, ResponseMode::Chat);
}

#[test]
fn test_response_format_requires_capable_model() {
    let temp_dir = TempDir::new().unwrap();
    let mut runtime = runtime_with(&temp_dir, "structured", "Rate it: @@ score @@");

    let fields = runtime.output_fields("structured").unwrap();
    runtime
        .apply_output_schema("structured", &fields, None)
        .unwrap();

    let mut provider = PresetProvider::cancelling();
    let err = runtime
        .prepare_run("structured", ResponseMode::Question, Some("plain"), &mut provider)
        .unwrap_err();
    assert!(matches!(err, PmgrError::ModelLacksResponseSchema(_)));

    runtime
        .catalog
        .refresh(&StaticModelSource(vec![
            ModelInfo::new("capable").with_response_schema(true),
        ]))
        .unwrap();

    // No text or file placeholders, so the provider is never asked
    let prepared = ready(
        runtime
            .prepare_run("structured", ResponseMode::Question, Some("capable"), &mut provider)
            .unwrap(),
    );
    assert_eq!(prepared.prompt_text, "Rate it: ");
    assert!(prepared.attributes.contains_key("response_format"));
    assert_eq!(provider.calls(), 0);
}

#[test]
fn test_cancelled_run_leaves_text_unresolved() {
    let temp_dir = TempDir::new().unwrap();
    let runtime = runtime_with(&temp_dir, "ask", "Explain << topic >> @@ out @@");

    let mut provider = PresetProvider::cancelling();
    let outcome = runtime
        .prepare_run("ask", ResponseMode::Question, None, &mut provider)
        .unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Cancelled {
            template: "ask".to_string(),
            prompt_text: "Explain << topic >> ".to_string(),
        }
    );
}
