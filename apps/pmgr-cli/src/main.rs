//! pmgr CLI - prompt template manager
//!
//! Command-line interface for managing a prompt template library: create and
//! inspect templates, fill their placeholders for a run, and maintain the
//! output schema derived from `@@ name @@` placeholders.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pmgr_core::{LibraryRuntime, PmgrConfig, ResponseMode, Role, RunOutcome, Subtype, Template};
use pmgr_pm::{
    FieldType, ItemType, PlaceholderValues, PresetProvider, SchemaField, ValueProvider, scan,
    strip_output_placeholders,
};
use std::path::{Path, PathBuf};
use tracing::{error, info};

mod tui;

/// pmgr - prompt template manager
///
/// Keeps a JSON library of prompt templates with placeholders and
/// structured output schemas.
#[derive(Parser)]
#[command(name = "pmgr", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Directory holding .pmgr/ and the library (defaults to the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available pmgr commands
#[derive(Subcommand)]
enum Commands {
    /// Create the default config and an empty library
    Init,

    /// List templates in library order
    List,

    /// Create a template and save the library
    New {
        /// Template name
        name: String,

        /// Create a system prompt instead of a user prompt
        #[arg(long)]
        system: bool,

        /// Subtype of a user prompt (summary, evaluate, query)
        #[arg(long, default_value = "query")]
        subtype: Subtype,

        /// Initial prompt text
        #[arg(long, default_value = "")]
        text: String,
    },

    /// Show the placeholders of a template
    Scan {
        /// Template name
        name: String,
    },

    /// Fill a template's placeholders and print the prepared prompt
    ///
    /// Values missing from --set/--file are asked for in a terminal form.
    Run {
        /// Template name
        name: String,

        /// Prepare a chat prompt instead of a single question
        #[arg(long)]
        chat: bool,

        /// Model to validate against (defaults to the configured model)
        #[arg(long)]
        model: Option<String>,

        /// Text placeholder value
        #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_pair)]
        set: Vec<(String, String)>,

        /// File placeholder path
        #[arg(long = "file", value_name = "NAME=PATH", value_parser = parse_pair)]
        file: Vec<(String, String)>,
    },

    /// Derive and store the output schema of a template
    Schema {
        /// Template name
        name: String,

        /// Mark a field as required
        #[arg(long, value_name = "FIELD")]
        require: Vec<String>,

        /// Mark a field as optional
        #[arg(long, value_name = "FIELD")]
        optional: Vec<String>,

        /// Set a field type, e.g. `tags=array:string` or `score=number`
        #[arg(long = "type", value_name = "FIELD=TYPE", value_parser = parse_pair)]
        types: Vec<(String, String)>,

        /// Set a field description
        #[arg(long = "describe", value_name = "FIELD=TEXT", value_parser = parse_pair)]
        describe: Vec<(String, String)>,

        /// Schema title (defaults to the configured title)
        #[arg(long)]
        title: Option<String>,
    },

    /// Replace a template's response format with JSON from a file
    SetFormat {
        /// Template name
        name: String,

        /// JSON file; an empty file clears the response format
        json_file: PathBuf,
    },

    /// Check a model's JSON answer against a template's output schema
    Check {
        /// Template name
        name: String,

        /// File holding the JSON answer
        response_file: PathBuf,

        /// List absent optional fields as null
        #[arg(long)]
        all: bool,
    },

    /// Back up the library file without changing it
    Backup,
}

fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing subscriber
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = run_command(cli.command, cli.root) {
        // Log with tracing
        error!("Command failed: {:#}", e);
        // Also print to stderr for CLI users
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing subscriber for structured logging
///
/// `RUST_LOG` overrides the default filter.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let default = if verbose {
        "pmgr=debug,pmgr_core=debug,pmgr_pm=debug"
    } else {
        "pmgr=info,pmgr_core=info,pmgr_pm=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Execute the specified command
fn run_command(command: Commands, root: Option<PathBuf>) -> Result<()> {
    let root = match root {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let config = PmgrConfig::load(root).context("Failed to load pmgr configuration")?;

    match command {
        Commands::Init => run_init(config),
        Commands::List => run_list(config),
        Commands::New {
            name,
            system,
            subtype,
            text,
        } => run_new(config, &name, system, subtype, text),
        Commands::Scan { name } => run_scan(config, &name),
        Commands::Run {
            name,
            chat,
            model,
            set,
            file,
        } => run_prompt(config, &name, chat, model.as_deref(), set, file),
        Commands::Schema {
            name,
            require,
            optional,
            types,
            describe,
            title,
        } => run_schema(
            config,
            &name,
            SchemaEdits {
                require,
                optional,
                types,
                describe,
            },
            title.as_deref(),
        ),
        Commands::SetFormat { name, json_file } => run_set_format(config, &name, &json_file),
        Commands::Check {
            name,
            response_file,
            all,
        } => run_check(config, &name, &response_file, all),
        Commands::Backup => run_backup(config),
    }
}

fn open_runtime(config: PmgrConfig) -> Result<LibraryRuntime> {
    LibraryRuntime::open(config).context("Failed to open template library")
}

/// Run the init command
fn run_init(config: PmgrConfig) -> Result<()> {
    info!("Initializing {}", config.root.display());
    let runtime = open_runtime(config)?;
    let report = runtime.init().context("Failed to initialize")?;

    let mark = |created: bool| if created { "✔ Created" } else { "• Kept existing" };
    println!("{} {}", mark(report.config_created), runtime.config.config_file.display());
    println!("{} {}", mark(report.library_created), runtime.config.library_file.display());
    println!("\nNext steps:");
    println!("  pmgr new <name> --text \"...\"    Add a template");
    println!("  pmgr run <name>                 Fill placeholders and prepare a run");

    Ok(())
}

/// Run the list command
fn run_list(config: PmgrConfig) -> Result<()> {
    let runtime = open_runtime(config)?;
    if runtime.library.is_empty() {
        println!("No templates in {}", runtime.config.library_file.display());
        return Ok(());
    }

    for (name, template) in runtime.library.iter() {
        let subtype = match template.role {
            Role::User => template.subtype.as_str(),
            Role::System => "-",
        };
        println!("{name}\t{}\t{subtype}", template.role);
    }

    Ok(())
}

/// Run the new command
fn run_new(
    config: PmgrConfig,
    name: &str,
    system: bool,
    subtype: Subtype,
    text: String,
) -> Result<()> {
    let mut runtime = open_runtime(config)?;
    let template = Template {
        role: if system { Role::System } else { Role::User },
        subtype,
        ..Template::with_text(text)
    };

    runtime
        .add_template(name, template)
        .with_context(|| format!("Failed to create template {name:?}"))?;

    println!("✔ Created template {}", name.trim());
    Ok(())
}

/// Run the scan command
fn run_scan(config: PmgrConfig, name: &str) -> Result<()> {
    let runtime = open_runtime(config)?;
    let found = runtime.scan(name)?;

    println!("text:   {}", found.text.join(", "));
    println!("file:   {}", found.file.join(", "));
    println!("output: {}", found.output.join(", "));

    Ok(())
}

/// Run the run command
fn run_prompt(
    config: PmgrConfig,
    name: &str,
    chat: bool,
    model: Option<&str>,
    set: Vec<(String, String)>,
    file: Vec<(String, String)>,
) -> Result<()> {
    let runtime = open_runtime(config)?;
    let template = runtime.library.require(name)?;

    let values = set
        .into_iter()
        .fold(PlaceholderValues::new(), |v, (k, value)| v.with_text(k, value));
    let values = file
        .into_iter()
        .fold(values, |v, (k, path)| v.with_file(k, path));

    let needed = scan(&strip_output_placeholders(&template.prompt_text));
    let mut provider: Box<dyn ValueProvider> = if values.covers(&needed.text, &needed.file) {
        Box::new(PresetProvider::new(values))
    } else {
        info!("Collecting placeholder values interactively");
        Box::new(tui::FormProvider::new(name, values))
    };

    let mode = if chat {
        ResponseMode::Chat
    } else {
        ResponseMode::Question
    };

    match runtime.prepare_run(name, mode, model, provider.as_mut())? {
        RunOutcome::Ready(prepared) => {
            println!("model:  {}", prepared.model);
            println!("mode:   {}", prepared.mode);
            println!("system: {}", prepared.system_prompt);
            if !prepared.attributes.is_empty() {
                println!(
                    "attributes:\n{}",
                    serde_json::to_string_pretty(&prepared.attributes)?
                );
            }
            println!("\n{}", prepared.prompt_text);
        }
        RunOutcome::Cancelled { .. } => {
            println!("Run cancelled.");
        }
    }

    Ok(())
}

/// Field edits for the schema command.
struct SchemaEdits {
    require: Vec<String>,
    optional: Vec<String>,
    types: Vec<(String, String)>,
    describe: Vec<(String, String)>,
}

/// Run the schema command
fn run_schema(
    config: PmgrConfig,
    name: &str,
    edits: SchemaEdits,
    title: Option<&str>,
) -> Result<()> {
    let mut runtime = open_runtime(config)?;
    let mut fields = runtime.output_fields(name)?;

    for f in &edits.require {
        field_mut(&mut fields, name, f)?.required = true;
    }
    for f in &edits.optional {
        field_mut(&mut fields, name, f)?.required = false;
    }
    for (f, type_arg) in &edits.types {
        let (field_type, item_type) = parse_type(type_arg)?;
        field_mut(&mut fields, name, f)?.set_type(field_type, item_type);
    }
    for (f, text) in &edits.describe {
        field_mut(&mut fields, name, f)?.description = text.clone();
    }

    runtime
        .apply_output_schema(name, &fields, title)
        .context("Failed to store output schema")?;

    match runtime.library.require(name)?.response_format() {
        Some(format) => println!("{}", serde_json::to_string_pretty(format)?),
        None => println!("{name} has no output placeholders; response format removed."),
    }

    Ok(())
}

fn field_mut<'a>(
    fields: &'a mut [SchemaField],
    template: &str,
    field: &str,
) -> Result<&'a mut SchemaField> {
    fields
        .iter_mut()
        .find(|f| f.name == field)
        .with_context(|| format!("{template} has no output placeholder @@ {field} @@"))
}

/// Run the set-format command
fn run_set_format(config: PmgrConfig, name: &str, json_file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(json_file)
        .with_context(|| format!("Failed to read {}", json_file.display()))?;

    let mut runtime = open_runtime(config)?;
    runtime
        .set_response_format_text(name, &text)
        .context("Failed to set response format")?;

    println!("✔ Updated response format of {name}");
    Ok(())
}

/// Run the check command
fn run_check(config: PmgrConfig, name: &str, response_file: &Path, all: bool) -> Result<()> {
    let text = std::fs::read_to_string(response_file)
        .with_context(|| format!("Failed to read {}", response_file.display()))?;

    let runtime = open_runtime(config)?;
    let fields = runtime
        .check_response(name, &text, all)
        .context("Response does not match the output schema")?;

    for (field, value) in fields {
        println!("{field}: {value}");
    }
    Ok(())
}

/// Run the backup command
fn run_backup(config: PmgrConfig) -> Result<()> {
    let runtime = open_runtime(config)?;
    if runtime.backup().context("Backup failed")? {
        println!("✔ Backed up {}", runtime.config.library_file.display());
    } else {
        println!("Nothing to back up: {} does not exist", runtime.config.library_file.display());
    }
    Ok(())
}

/// Parses `NAME=VALUE`, splitting on the first `=`.
fn parse_pair(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected NAME=VALUE, got {s:?}")),
    }
}

/// Parses `type` or `array:item` into field and item types.
fn parse_type(type_arg: &str) -> Result<(FieldType, Option<ItemType>)> {
    let (base, item) = match type_arg.split_once(':') {
        Some((base, item)) => (base, Some(item)),
        None => (type_arg, None),
    };
    let field_type: FieldType = base.parse().map_err(anyhow::Error::msg)?;
    let item_type = item
        .map(|i| i.parse::<ItemType>().map_err(anyhow::Error::msg))
        .transpose()?;
    if item_type.is_some() && field_type != FieldType::Array {
        anyhow::bail!("item type only applies to arrays: {type_arg}");
    }
    Ok((field_type, item_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair() {
        assert_eq!(
            parse_pair("doc=a=b"),
            Ok(("doc".to_string(), "a=b".to_string()))
        );
        assert_eq!(parse_pair("doc="), Ok(("doc".to_string(), String::new())));
        assert!(parse_pair("novalue").is_err());
        assert!(parse_pair("=x").is_err());
    }

    #[test]
    fn test_parse_type() {
        assert_eq!(parse_type("number").unwrap(), (FieldType::Number, None));
        assert_eq!(
            parse_type("array:integer").unwrap(),
            (FieldType::Array, Some(ItemType::Integer))
        );
        assert!(parse_type("string:integer").is_err());
        assert!(parse_type("object").is_err());
    }

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "pmgr", "run", "ask", "--chat", "--set", "a=1", "--file", "f=/tmp/x.txt",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                name, chat, set, file, ..
            } => {
                assert_eq!(name, "ask");
                assert!(chat);
                assert_eq!(set, vec![("a".to_string(), "1".to_string())]);
                assert_eq!(file, vec![("f".to_string(), "/tmp/x.txt".to_string())]);
            }
            _ => panic!("expected run command"),
        }
    }
}
