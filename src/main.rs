//! Purpose: `contactdb` CLI entry point.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Commands emit JSON on stdout (pretty on a TTY, compact otherwise).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Commands talk to a local database unless `--remote` is given.
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{
    Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint,
    error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};

mod command_dispatch;
mod render;
mod serve;

use contactdb::api::{ContactField, Error, ErrorKind, to_exit_code};
use render::colorize_json;

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

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
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
                let message = clap_error_summary(&err);
                let hint = clap_error_hint(&err);
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(message)
                        .with_hint(hint),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    let target = match cli.remote {
        Some(url) => Target::Remote(url),
        None => Target::Local(cli.db.unwrap_or_else(default_db_path)),
    };

    command_dispatch::dispatch_command(cli.command, target, color_mode)
        .map_err(add_io_hint)
        .map_err(add_internal_hint)
        .map_err(|err| (err, color_mode))
}

fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            let replacement = arg.to_str().and_then(|value| match value {
                "---help" => Some("--help"),
                "---version" => Some("--version"),
                _ => None,
            });
            replacement.map(OsString::from).unwrap_or_else(|| arg)
        })
        .collect()
}

/// Where contact commands are sent.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Target {
    Local(PathBuf),
    Remote(String),
}

fn default_db_path() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home)
        .join(".contactdb")
        .join("contacts.sqlite3")
}

#[derive(Parser)]
#[command(
    name = "contactdb",
    version,
    about = "Contact records over a typed JSON RPC API",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"Contacts live in a SQLite database. Commands use it directly, or talk to a
running `contactdb serve` when --remote (or CONTACTDB_URL) is set.
"#,
    after_help = r#"EXAMPLES
  $ contactdb add --name "John Doe" --email john@example.com
  $ contactdb list --search doe
  $ contactdb update 1 --clear email
  $ contactdb serve --port 2022
  $ contactdb --remote http://127.0.0.1:2022 list

LEARN MORE
  $ contactdb <command> --help"#,
    arg_required_else_help = true,
    disable_help_subcommand = false
)]
struct Cli {
    #[arg(
        long,
        env = "CONTACTDB_DB",
        value_name = "PATH",
        help = "SQLite database file (default: ~/.contactdb/contacts.sqlite3)",
        value_hint = ValueHint::FilePath
    )]
    db: Option<PathBuf>,
    #[arg(
        long,
        env = "CONTACTDB_URL",
        value_name = "URL",
        help = "Send commands to a running server instead of the local database",
        value_hint = ValueHint::Url
    )]
    remote: Option<String>,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics and pretty JSON output: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ListFormat {
    Json,
    Table,
}

/// Optional fields that `update --clear` may null out.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ClearField {
    Phone,
    Email,
    Address,
    Company,
    Notes,
}

impl From<ClearField> for ContactField {
    fn from(value: ClearField) -> Self {
        match value {
            ClearField::Phone => ContactField::PhoneNumber,
            ClearField::Email => ContactField::Email,
            ClearField::Address => ContactField::Address,
            ClearField::Company => ContactField::Company,
            ClearField::Notes => ContactField::Notes,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Serve the contact RPC API over HTTP",
        long_about = r#"Serve the contact procedures over HTTP/JSON.

Queries: GET or POST /rpc/{healthcheck,getContacts,getContact}
Mutations: POST /rpc/{createContact,updateContact,deleteContact}
Liveness: GET /healthz"#,
        after_help = r#"EXAMPLES
  $ contactdb serve
  $ contactdb serve --port 8080 --cors-origin http://localhost:3000
  $ SERVER_PORT=9000 contactdb serve"#
    )]
    Serve(ServeArgs),
    #[command(
        about = "Check that the API answers",
        after_help = r#"EXAMPLES
  $ contactdb health
  $ contactdb --remote http://127.0.0.1:2022 health"#
    )]
    Health,
    #[command(
        about = "List contacts ordered by name",
        after_help = r#"EXAMPLES
  $ contactdb list
  $ contactdb list --search acme --format table"#
    )]
    List {
        #[arg(
            long,
            value_name = "TERM",
            help = "Case-insensitive filter on name, email and company"
        )]
        search: Option<String>,
        #[arg(long, value_enum, default_value = "json", help = "Output format: json|table")]
        format: ListFormat,
    },
    #[command(
        arg_required_else_help = true,
        about = "Fetch one contact by id",
        after_help = r#"EXAMPLES
  $ contactdb get 1"#
    )]
    Get {
        #[arg(help = "Contact id")]
        id: i64,
    },
    #[command(
        arg_required_else_help = true,
        about = "Create a contact",
        after_help = r#"EXAMPLES
  $ contactdb add --name "John Doe"
  $ contactdb add --name "Ada Lovelace" --email ada@example.com --company Analytical"#
    )]
    Add(AddArgs),
    #[command(
        arg_required_else_help = true,
        about = "Change fields of a contact",
        long_about = r#"Change fields of a contact.

Only the fields you pass are written. Use --clear to remove an optional field.
Blank values also clear optional fields."#,
        after_help = r#"EXAMPLES
  $ contactdb update 1 --email john.doe@example.com
  $ contactdb update 1 --clear email --clear notes"#
    )]
    Update(UpdateArgs),
    #[command(
        arg_required_else_help = true,
        about = "Delete a contact by id",
        after_help = r#"EXAMPLES
  $ contactdb delete 1"#
    )]
    Delete {
        #[arg(help = "Contact id")]
        id: i64,
    },
    #[command(
        about = "Print version info as JSON",
        long_about = r#"Emit version info as JSON (stable, machine-readable)."#,
        after_help = r#"EXAMPLES
  $ contactdb version"#
    )]
    Version,
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        long_about = r#"Generate shell completion scripts.

Prints a completion script for the given shell to stdout."#,
        after_help = r#"EXAMPLES
  $ contactdb completion bash > ~/.local/share/bash-completion/completions/contactdb
  $ contactdb completion zsh > ~/.zfunc/_contactdb"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

#[derive(Args)]
struct ServeArgs {
    #[arg(
        long,
        value_name = "HOST:PORT",
        help = "Bind address (overrides --port)",
        help_heading = "Connection"
    )]
    bind: Option<String>,
    #[arg(
        long,
        env = "SERVER_PORT",
        default_value_t = 2022,
        help = "Port to listen on (loopback)",
        help_heading = "Connection"
    )]
    port: u16,
    #[arg(
        long = "cors-origin",
        value_name = "ORIGIN",
        help = "Allow browser requests from this origin (repeatable, explicit list)",
        help_heading = "Connection"
    )]
    cors_origin: Vec<String>,
}

#[derive(Args, Clone, Debug, Default)]
struct FieldArgs {
    #[arg(long, value_name = "PHONE", help = "Phone number")]
    phone: Option<String>,
    #[arg(long, value_name = "EMAIL", help = "Email address")]
    email: Option<String>,
    #[arg(long, value_name = "TEXT", help = "Postal address")]
    address: Option<String>,
    #[arg(long, value_name = "TEXT", help = "Company")]
    company: Option<String>,
    #[arg(long, value_name = "TEXT", help = "Free-form notes")]
    notes: Option<String>,
}

impl FieldArgs {
    fn values(&self) -> [(ContactField, Option<&str>); 5] {
        [
            (ContactField::PhoneNumber, self.phone.as_deref()),
            (ContactField::Email, self.email.as_deref()),
            (ContactField::Address, self.address.as_deref()),
            (ContactField::Company, self.company.as_deref()),
            (ContactField::Notes, self.notes.as_deref()),
        ]
    }
}

#[derive(Args)]
struct AddArgs {
    #[arg(long, value_name = "NAME", help = "Full name (required)")]
    name: String,
    #[command(flatten)]
    fields: FieldArgs,
}

#[derive(Args)]
struct UpdateArgs {
    #[arg(help = "Contact id")]
    id: i64,
    #[arg(long, value_name = "NAME", help = "Full name")]
    name: Option<String>,
    #[command(flatten)]
    fields: FieldArgs,
    #[arg(
        long,
        value_enum,
        value_name = "FIELD",
        help = "Clear an optional field (repeatable): phone|email|address|company|notes"
    )]
    clear: Vec<ClearField>,
}

fn parse_bind(args: &ServeArgs) -> Result<SocketAddr, Error> {
    match args.bind.as_deref() {
        Some(bind) => bind.parse().map_err(|_| {
            Error::new(ErrorKind::Usage)
                .with_message("invalid bind address")
                .with_hint("Use a host:port value like 127.0.0.1:2022.")
        }),
        None => Ok(SocketAddr::from(([127, 0, 0, 1], args.port))),
    }
}

fn emit_serve_startup_guidance(config: &serve::ServeConfig) {
    if !io::stderr().is_terminal() {
        return;
    }
    let base_url = format!("http://{}", config.bind);
    let cors = if config.cors_allowed_origins.is_empty() {
        "same-origin"
    } else {
        "allowlist"
    };
    let lines = [
        format!("Serving contacts on {base_url}"),
        String::new(),
        format!("  DB:   {}", config.db_path.display()),
        format!("  CORS: {cors}"),
        String::new(),
        "Try it:".to_string(),
        String::new(),
        format!("  contactdb --remote {base_url} add --name \"John Doe\""),
        format!("  curl -s '{base_url}/rpc/getContacts'"),
        String::new(),
        "Press Ctrl-C to stop.".to_string(),
    ];
    eprintln!("{}", lines.join("\n"));
}

fn emit_version_output(color_mode: ColorMode) {
    if io::stdout().is_terminal() {
        println!("contactdb {}", env!("CARGO_PKG_VERSION"));
    } else {
        emit_json(
            json!({
                "name": "contactdb",
                "version": env!("CARGO_PKG_VERSION"),
            }),
            color_mode,
        );
    }
}

fn emit_json(value: Value, color_mode: ColorMode) {
    let is_tty = io::stdout().is_terminal();
    let use_color = color_mode.use_color(is_tty);
    let pretty = is_tty || use_color;
    let json = if pretty {
        colorize_json(&value, use_color)
    } else {
        serde_json::to_string(&value)
            .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
    };
    println!("{json}");
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn add_io_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::Storage => err.with_hint(
            "Database error. Check that --db points at a writable contactdb database.",
        ),
        ErrorKind::Busy => err.with_hint("Another request is in flight. Retry once it finishes."),
        ErrorKind::Io => err.with_hint("I/O error. Check the path, filesystem, and disk space."),
        _ => err,
    }
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "Unexpected internal failure. Retry with RUST_BACKTRACE=1 and share command/context if it persists.",
    )
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Validation => "invalid input".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Busy => "request already in flight".to_string(),
        ErrorKind::Storage => "storage error".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
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
    inner.insert("kind".to_string(), json!(err.kind().as_str()));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(id) = err.id() {
        inner.insert("id".to_string(), json!(id));
    }
    if !err.issues().is_empty() {
        let issues = err
            .issues()
            .iter()
            .map(|issue| json!({ "field": issue.field, "message": issue.message }))
            .collect::<Vec<_>>();
        inner.insert("issues".to_string(), Value::Array(issues));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    for issue in err.issues() {
        lines.push(format!(
            "  {} {}",
            colorize_label(&format!("{}:", issue.field), use_color, AnsiColor::Yellow),
            issue.message
        ));
    }
    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(id) = err.id() {
        lines.push(format!(
            "{} {id}",
            colorize_label("id:", use_color, AnsiColor::Yellow)
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
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

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let usage = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .map(str::trim);

    let Some(usage) = usage else {
        return "Try `contactdb --help`.".to_string();
    };

    let tokens: Vec<&str> = usage.split_whitespace().collect();
    let Some(pos) = tokens.iter().position(|t| *t == "contactdb") else {
        return "Try `contactdb --help`.".to_string();
    };

    let parts: Vec<&str> = tokens
        .iter()
        .skip(pos + 1)
        .take_while(|token| {
            !(token.starts_with('-') || token.starts_with('<') || token.starts_with('['))
        })
        .copied()
        .collect();

    if parts.is_empty() {
        return "Try `contactdb --help`.".to_string();
    }
    if parts.as_slice() == ["add"] && rendered.contains("--name") {
        return "Provide a name, for example: `contactdb add --name \"John Doe\"`.".to_string();
    }

    format!("Try `contactdb {} --help`.", parts.join(" "))
}
