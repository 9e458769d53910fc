//! Argument parsing and the `generate` pipeline.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use fixtura_core::{
    FixturaError, FixtureBuilder, Schema, TypeDef, TypeExpr, TypeParseError, Value,
    select::{Selector, field, field_named, types},
};
use serde_json::Value as Json;
use thiserror::Error;
use tracing::{Span, field as span_field, info, instrument};

use super::convert::{ConvertError, from_json, to_json};
use super::schema_file::SchemaFile;

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(name = "fixtura", about = "Populate object graphs described by a schema file.")]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Generate fixtures for a type and print them as JSON.
    Generate(GenerateCommand),
}

/// Options accepted by the `generate` command.
#[derive(Debug, Args, Clone)]
pub struct GenerateCommand {
    /// JSON file defining the available types.
    #[arg(long)]
    pub schema: PathBuf,

    /// Type expression to populate, e.g. `Company` or `Vec<Employee>`.
    #[arg(long = "type", value_name = "TYPE")]
    pub root: String,

    /// Seed for reproducible output.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Maximum population depth.
    #[arg(long = "max-depth")]
    pub max_depth: Option<usize>,

    /// Fail instead of leaving members beyond the maximum depth empty.
    #[arg(long = "fail-on-max-depth")]
    pub fail_on_max_depth: bool,

    /// Do not fail when a target argument never matches.
    #[arg(long)]
    pub lenient: bool,

    /// Allow optional members to be generated empty.
    #[arg(long = "nullable-options")]
    pub nullable_options: bool,

    /// Number of fixtures to generate.
    #[arg(long, default_value_t = NonZeroUsize::MIN)]
    pub count: NonZeroUsize,

    /// Fixed value for a target, e.g. `Person.name="Ada"`.
    #[arg(long = "set", value_name = "TARGET=JSON")]
    pub set: Vec<String>,

    /// Leave a target empty.
    #[arg(long = "ignore", value_name = "TARGET")]
    pub ignore: Vec<String>,

    /// Let a target be generated empty at random.
    #[arg(long = "nullable", value_name = "TARGET")]
    pub nullable: Vec<String>,

    /// Populate a target as another type, e.g. `Vehicle=Car`.
    #[arg(long = "subtype", value_name = "TARGET=TYPE")]
    pub subtype: Vec<String>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pub pretty: bool,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The schema file could not be opened.
    #[error("failed to open `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The schema file is not a valid schema document.
    #[error("failed to read schema `{path}`: {source}")]
    SchemaFile {
        /// Path of the schema file.
        path: PathBuf,
        /// Deserialisation failure.
        #[source]
        source: serde_json::Error,
    },
    /// A type expression did not parse.
    #[error(transparent)]
    TypeExpr(#[from] TypeParseError),
    /// A target argument is malformed.
    #[error("invalid target `{raw}`: {reason}")]
    Target {
        /// Target as supplied.
        raw: String,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// A `--set` value is not valid JSON.
    #[error("invalid JSON in `--set {raw}`: {source}")]
    Literal {
        /// Argument as supplied.
        raw: String,
        /// Parse failure.
        #[source]
        source: serde_json::Error,
    },
    /// A `--set` value does not fit its target.
    #[error(transparent)]
    Convert(#[from] ConvertError),
    /// Population failed.
    #[error(transparent)]
    Core(#[from] FixturaError),
}

/// Fixtures produced by the `generate` command.
#[derive(Debug, Clone)]
pub struct GenerateOutput {
    /// Canonical spelling of the populated type.
    pub root: String,
    /// Populated values, in creation order.
    pub values: Vec<Value>,
    /// Whether the JSON should be pretty-printed.
    pub pretty: bool,
}

/// A parsed target of `--set`, `--ignore`, `--nullable` or `--subtype`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Target {
    /// `Type`: every node of the type.
    Type(String),
    /// `Type.member`: one member of one struct.
    Member { owner: String, member: String },
    /// `*.member`: the named member of any struct.
    AnyMember(String),
}

impl Target {
    pub(super) fn parse(raw: &str) -> Result<Self, CliError> {
        let invalid = |reason| CliError::Target {
            raw: raw.to_owned(),
            reason,
        };
        let raw = raw.trim();
        match raw.split_once('.') {
            None if raw.is_empty() => Err(invalid("the target is empty")),
            None if raw == "*" => Err(invalid("a wildcard needs a member name")),
            None => Ok(Self::Type(raw.to_owned())),
            Some((_, member)) if member.is_empty() || member.contains('.') => {
                Err(invalid("expected a single member name after `.`"))
            }
            Some(("*", member)) => Ok(Self::AnyMember(member.to_owned())),
            Some(("", _)) => Err(invalid("expected a type name or `*` before `.`")),
            Some((owner, member)) => Ok(Self::Member {
                owner: owner.to_owned(),
                member: member.to_owned(),
            }),
        }
    }

    fn selector(&self) -> Selector {
        match self {
            Self::Type(name) => types(name),
            Self::Member { owner, member } => field(owner, member),
            Self::AnyMember(member) => field_named(member),
        }
    }

    /// Declared type of the target, when the schema knows it.
    fn declared_type(&self, schema: &Schema) -> Result<Option<TypeExpr>, CliError> {
        match self {
            Self::Type(name) => Ok(Some(name.parse()?)),
            Self::Member { owner, member } => Ok(match schema.get(owner) {
                Some(TypeDef::Struct(def)) => def
                    .fields()
                    .iter()
                    .find(|candidate| candidate.name() == member)
                    .map(|candidate| candidate.ty().clone()),
                _ => None,
            }),
            Self::AnyMember(_) => Ok(None),
        }
    }
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when the schema cannot be loaded, an argument is
/// malformed, or population fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use std::num::NonZeroUsize;
/// # use fixtura_cli::cli::{Cli, Command, GenerateCommand, run_cli};
/// # use tempfile::NamedTempFile;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let file = NamedTempFile::new()?;
/// std::fs::write(
///     file.path(),
///     r#"{"types": {"Point": {"kind": "struct", "fields": [
///         {"name": "x", "type": "i32"}, {"name": "y", "type": "i32"}
///     ]}}}"#,
/// )?;
/// let cli = Cli {
///     command: Command::Generate(GenerateCommand {
///         schema: file.path().to_path_buf(),
///         root: "Point".into(),
///         seed: Some(7),
///         max_depth: None,
///         fail_on_max_depth: false,
///         lenient: false,
///         nullable_options: false,
///         count: NonZeroUsize::new(2).ok_or("two is non-zero")?,
///         set: vec!["Point.x=3".into()],
///         ignore: Vec::new(),
///         nullable: Vec::new(),
///         subtype: Vec::new(),
///         pretty: false,
///     }),
/// };
/// let output = run_cli(cli)?;
/// assert_eq!(output.values.len(), 2);
/// # Ok(())
/// # }
/// ```
#[instrument(name = "cli.run", err, skip(cli), fields(command = span_field::Empty))]
pub fn run_cli(cli: Cli) -> Result<GenerateOutput, CliError> {
    match cli.command {
        Command::Generate(generate) => {
            Span::current().record("command", span_field::display("generate"));
            run_generate(generate)
        }
    }
}

#[instrument(
    name = "cli.generate",
    err,
    skip(command),
    fields(root = %command.root, count = command.count.get(), declarations = span_field::Empty),
)]
pub(super) fn run_generate(command: GenerateCommand) -> Result<GenerateOutput, CliError> {
    let schema = load_schema(&command.schema)?;
    let root: TypeExpr = command.root.parse()?;
    let builder = build_fixture(schema, root.clone(), &command)?;

    let values = builder.create_values(command.count.get())?;
    info!(root = %root, count = values.len(), "fixtures generated");
    Ok(GenerateOutput {
        root: root.to_string(),
        values,
        pretty: command.pretty,
    })
}

pub(super) fn build_fixture(
    schema: Schema,
    root: TypeExpr,
    command: &GenerateCommand,
) -> Result<FixtureBuilder, CliError> {
    let mut literals = Vec::with_capacity(command.set.len());
    for raw in &command.set {
        let (target, literal) = split_assignment(raw, "expected `TARGET=JSON`")?;
        let target = Target::parse(target)?;
        let json: Json = serde_json::from_str(literal).map_err(|source| CliError::Literal {
            raw: raw.clone(),
            source,
        })?;
        let value = match target.declared_type(&schema)? {
            Some(ty) => from_json(&json, &ty, &schema, target_label(raw))?,
            None => from_json(&json, &TypeExpr::param("T"), &schema, target_label(raw))?,
        };
        literals.push((target, value));
    }
    let subtypes = command
        .subtype
        .iter()
        .map(|raw| {
            let (target, subtype) = split_assignment(raw, "expected `TARGET=TYPE`")?;
            Ok((Target::parse(target)?, subtype.parse::<TypeExpr>()?))
        })
        .collect::<Result<Vec<_>, CliError>>()?;
    let ignored = parse_targets(&command.ignore)?;
    let nullable = parse_targets(&command.nullable)?;
    Span::current().record(
        "declarations",
        literals.len() + subtypes.len() + ignored.len() + nullable.len(),
    );

    let mut builder = FixtureBuilder::from_schema(schema, root);
    for (target, subtype) in subtypes {
        builder = builder.subtype(target.selector(), subtype);
    }
    for target in ignored {
        builder = builder.ignore(target.selector());
    }
    for target in nullable {
        builder = builder.with_nullable(target.selector());
    }
    for (target, value) in literals {
        builder = builder.set(target.selector(), value);
    }
    if let Some(seed) = command.seed {
        builder = builder.with_seed(seed);
    }
    if let Some(max_depth) = command.max_depth {
        builder = builder.with_max_depth(max_depth);
    }
    if command.fail_on_max_depth {
        builder = builder.fail_on_max_depth();
    }
    if command.nullable_options {
        builder = builder.with_nullable_options();
    }
    if command.lenient {
        builder = builder.lenient();
    }
    Ok(builder)
}

fn parse_targets(raw: &[String]) -> Result<Vec<Target>, CliError> {
    raw.iter().map(|target| Target::parse(target)).collect()
}

fn split_assignment<'a>(
    raw: &'a str,
    reason: &'static str,
) -> Result<(&'a str, &'a str), CliError> {
    raw.split_once('=').ok_or_else(|| CliError::Target {
        raw: raw.to_owned(),
        reason,
    })
}

fn target_label(raw: &str) -> &str {
    raw.split_once('=').map_or(raw, |(target, _)| target.trim())
}

#[instrument(name = "cli.load_schema", err, fields(types = span_field::Empty))]
pub(super) fn load_schema(path: &Path) -> Result<Schema, CliError> {
    let file = File::open(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document: SchemaFile =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| CliError::SchemaFile {
            path: path.to_path_buf(),
            source,
        })?;
    Span::current().record("types", document.types.len());
    Ok(document.into_schema()?)
}

/// Writes `output` to `writer` as JSON followed by a newline.
///
/// A single fixture renders as one JSON document; several render as an
/// array.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use fixtura_cli::cli::{GenerateOutput, render_output};
/// # use fixtura_core::Value;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let output = GenerateOutput {
///     root: "u8".into(),
///     values: vec![Value::UInt(7)],
///     pretty: false,
/// };
/// let mut buffer = Vec::new();
/// render_output(&output, &mut buffer)?;
/// assert_eq!(String::from_utf8(buffer)?, "7\n");
/// # Ok(())
/// # }
/// ```
pub fn render_output(output: &GenerateOutput, mut writer: impl Write) -> io::Result<()> {
    let document = match output.values.as_slice() {
        [single] => to_json(single),
        values => Json::Array(values.iter().map(to_json).collect()),
    };
    if output.pretty {
        serde_json::to_writer_pretty(&mut writer, &document)?;
    } else {
        serde_json::to_writer(&mut writer, &document)?;
    }
    writeln!(writer)
}
