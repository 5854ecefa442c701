//! Workflow modules for pmgr.
//!
//! - `init`: create the config and an empty library
//! - `run`: prepare a template for a model run
//! - `schema`: derive and store a template's output schema, check answers against it

pub mod init;
pub mod run;
pub mod schema;

// Re-export workflow functions
pub use init::{InitReport, init_workspace};
pub use run::{PreparedPrompt, ResponseMode, RunOutcome, RunRequest, prepare_run};
pub use schema::{apply_output_schema, check_response, output_fields};
