//! Purpose: `tabio` CLI entry point and argument model.
//! Role: Binary crate root; parses args, runs commands, emits JSON lines on stdout.
//! Invariants: Commands emit one JSON value per line on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: All file access goes through `api::Cursor` and `api::Writer`.
use std::error::Error as StdError;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use tabio::api::{
    Cursor, Dialect, Error, ErrorKind, EscapeStyle, TableConfig, Writer, WriterOptions,
    to_exit_code,
};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "tabio",
    version,
    about = "Read, seek, and convert delimiter-separated text files",
    after_help = r#"EXAMPLES
  $ tabio cat people.csv --header
  $ tabio keys people.tsv --preset tsv --header
  $ tabio seek people.csv 42 --header
  $ tabio convert people.csv people.psv --header --to psv --to-header

NOTES
  - Records are printed as JSON lines: {"row": N, "data": [...] or {...}}
  - `--enclosure ''` disables quoting entirely
  - `--config FILE` reads {fileName, separator, enclosure, escapeStyle, header, ...}"#,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Print records as JSON lines")]
    Cat {
        #[arg(value_hint = ValueHint::FilePath, help = "Input file (or fileName from --config)")]
        file: Option<PathBuf>,
        #[command(flatten)]
        dialect: DialectArgs,
        #[arg(long, allow_negative_numbers = true, help = "Start at this row (1-based)")]
        seek: Option<i64>,
        #[arg(long, help = "Print at most this many records")]
        limit: Option<usize>,
    },
    #[command(about = "Print the active key list as a JSON array")]
    Keys {
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
        #[command(flatten)]
        dialect: DialectArgs,
    },
    #[command(about = "Count data records")]
    Count {
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
        #[command(flatten)]
        dialect: DialectArgs,
    },
    #[command(about = "Print the record at ROW")]
    Seek {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        #[arg(allow_negative_numbers = true)]
        row: i64,
        #[command(flatten)]
        dialect: DialectArgs,
    },
    #[command(about = "Rewrite a file under a different dialect")]
    Convert {
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        #[arg(value_hint = ValueHint::FilePath)]
        output: PathBuf,
        #[command(flatten)]
        dialect: DialectArgs,
        #[command(flatten)]
        target: OutputArgs,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Preset {
    Csv,
    Tsv,
    Psv,
}

impl Preset {
    fn dialect(self) -> Dialect {
        match self {
            Preset::Csv => Dialect::csv(),
            Preset::Tsv => Dialect::tsv(),
            Preset::Psv => Dialect::psv(),
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum EscapeArg {
    Doubled,
    Backslash,
    Unenclosed,
}

impl From<EscapeArg> for EscapeStyle {
    fn from(value: EscapeArg) -> Self {
        match value {
            EscapeArg::Doubled => EscapeStyle::Doubled,
            EscapeArg::Backslash => EscapeStyle::Backslash,
            EscapeArg::Unenclosed => EscapeStyle::Unenclosed,
        }
    }
}

#[derive(Args, Debug, Clone)]
struct DialectArgs {
    #[arg(long, value_hint = ValueHint::FilePath, help = "JSON table configuration")]
    config: Option<PathBuf>,
    #[arg(long, value_enum, help = "Base dialect: csv|tsv|psv")]
    preset: Option<Preset>,
    #[arg(long, help = "Field separator (single character, `\\t` for TAB)")]
    separator: Option<String>,
    #[arg(long, help = "Enclosure character; empty disables quoting")]
    enclosure: Option<String>,
    #[arg(long, value_enum, help = "Escape style inside enclosures")]
    escape: Option<EscapeArg>,
    #[arg(long, help = "First record names the fields")]
    header: bool,
    #[arg(long, help = "Physical lines to discard before reading")]
    skip_lines: Option<usize>,
    #[arg(long, help = "Skip whitespace-only lines between records")]
    ignore_blank: bool,
    #[arg(long, value_delimiter = ',', help = "Explicit field names")]
    keys: Option<Vec<String>>,
    #[arg(long, help = "Explicit keys win over the header row")]
    override_keys: bool,
}

#[derive(Args, Debug, Clone)]
struct OutputArgs {
    #[arg(long = "to", value_enum, help = "Output dialect preset (default: input dialect)")]
    to_preset: Option<Preset>,
    #[arg(long)]
    to_separator: Option<String>,
    #[arg(long)]
    to_enclosure: Option<String>,
    #[arg(long, value_enum)]
    to_escape: Option<EscapeArg>,
    #[arg(long, help = "Write the input keys as a header line")]
    to_header: bool,
    #[arg(long, help = "Text written for null cells")]
    null_token: Option<String>,
    #[arg(long, help = "Use CRLF line breaks")]
    crlf: bool,
    #[arg(long, help = "Quote every non-empty value")]
    no_lazy_wrap: bool,
    #[arg(long, help = "Quote empty values and values with outer whitespace")]
    wrap_whitespace: bool,
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::FileSystem)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::InvalidArgument)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Try `tabio --help`."));
            }
        },
    };

    command_dispatch::dispatch_command(cli.command)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"FileSystem\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::FileSystem => "file system error".to_string(),
        ErrorKind::InvalidArgument => "invalid argument".to_string(),
        ErrorKind::OutOfBounds => "out of bounds".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(row) = err.row() {
        inner.insert("row".to_string(), json!(row));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    if let Some(path) = err.path() {
        lines.push(format!("path: {}", path.display()));
    }
    if let Some(row) = err.row() {
        lines.push(format!("row: {row}"));
    }
    for cause in error_causes(err) {
        lines.push(format!("caused by: {cause}"));
    }
    lines.join("\n")
}
