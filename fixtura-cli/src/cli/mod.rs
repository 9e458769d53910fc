//! Command-line interface for generating fixtures from a JSON schema file.
//!
//! The `generate` command loads type definitions, applies `--set` and
//! `--ignore` customisations and renders the populated value as JSON.

mod commands;
mod convert;
mod schema_file;

pub use commands::{
    Cli, CliError, Command, GenerateCommand, GenerateOutput, render_output, run_cli,
};
pub use convert::{ConvertError, from_json, to_json};
pub use schema_file::{FieldFile, SchemaFile, TypeFile};
