//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use dgm_utils::core::config::Config;
use dgm_utils::formats::ini::{DEFAULT_ENCODING, get_ini_value};
use dgm_utils::imaging::stats::{
    ImageSource, average_color, color_histogram, distinct_color_count, white_percentage,
};
use dgm_utils::logger::level::Severity;
use dgm_utils::logger::leveled::{Emitted, Logger, Record, Stream};
use dgm_utils::logger::reporter::{ErrorReport, Termination};
use dgm_utils::mail::{MailMessage, SmtpMailTransport, send_email};
use dgm_utils::net::fetch::{FetchRequest, HttpFetcher};
use dgm_utils::platform::command::run_command;
use dgm_utils::platform::env::{change_oracle_home, get_env, set_env};
use dgm_utils::text::balance::normalize_delimiters;

/// DGM utility toolkit.
#[derive(Debug, Parser)]
#[command(
    name = "dgmu",
    author,
    version,
    about = "DGM utility toolkit - logging, reporting and small helpers",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Override the logging threshold (debug, info, warning, error, production).
    #[arg(long, global = true, value_name = "LEVEL", value_parser = parse_severity)]
    level: Option<Severity>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Remove unmatched (), [] and {} from text.
    Normalize(NormalizeArgs),
    /// Write one record to a log sink.
    Log(LogArgs),
    /// Report an error, optionally ending the process.
    Report(ReportArgs),
    /// Run a shell command and print its stdout.
    Run(RunArgs),
    /// Read or change environment variables.
    Env(EnvArgs),
    /// Issue an HTTP request.
    Fetch(FetchArgs),
    /// Look up a value in an INI file.
    Ini(IniArgs),
    /// Send an e-mail over plaintext SMTP.
    Mail(MailArgs),
    /// Print color statistics of an image.
    Image(ImageArgs),
    /// Show the resolved log and files layout.
    Paths,
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct NormalizeArgs {
    /// Text to normalize.
    text: String,
}

#[derive(Debug, Clone, Args)]
struct LogArgs {
    /// Record text.
    text: String,
    /// Record severity.
    #[arg(long, default_value = "info", value_parser = parse_severity)]
    severity: Severity,
    /// Indentation level.
    #[arg(long, default_value_t = 0)]
    indent: usize,
    /// Write to the database sink.
    #[arg(long)]
    database: bool,
    /// Overwrite the sink and write its banner first.
    #[arg(long)]
    truncate: bool,
}

#[derive(Debug, Clone, Args)]
struct ReportArgs {
    /// Error message.
    message: String,
    /// Underlying cause, written as a `Reason:` line.
    #[arg(long)]
    cause: Option<String>,
    /// Indentation level.
    #[arg(long, default_value_t = 0)]
    indent: usize,
    /// Report to the database sink.
    #[arg(long)]
    database: bool,
    /// End the process after reporting.
    #[arg(long)]
    finish: bool,
    /// Exit status used with --finish.
    #[arg(long, requires = "finish", allow_negative_numbers = true)]
    code: Option<i32>,
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// Command line passed to the platform shell.
    command: String,
}

#[derive(Debug, Clone, Args)]
struct EnvArgs {
    #[command(subcommand)]
    command: EnvCommand,
}

#[derive(Debug, Clone, Subcommand)]
enum EnvCommand {
    /// Print a variable.
    Get { name: String },
    /// Replace the value of an existing variable (this process only).
    Set { name: String, value: String },
    /// Point ORACLE_HOME at a client install (this process only).
    OracleHome { path: String },
}

#[derive(Debug, Clone, Args)]
struct FetchArgs {
    /// Target URL; the scheme defaults to http.
    url: String,
    /// HTTP method.
    #[arg(long, default_value = "GET")]
    method: String,
    /// Query parameter as KEY=VALUE (repeatable).
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_pair)]
    params: Vec<(String, String)>,
    /// Request header as NAME=VALUE (repeatable).
    #[arg(long = "header", value_name = "NAME=VALUE", value_parser = parse_pair)]
    headers: Vec<(String, String)>,
    /// Deadline in seconds; defaults to http.timeout_secs.
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,
    /// Basic auth user.
    #[arg(long, requires = "password")]
    user: Option<String>,
    /// Basic auth password.
    #[arg(long, requires = "user")]
    password: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct IniArgs {
    /// INI file.
    file: PathBuf,
    /// Section name.
    section: String,
    /// Option name.
    option: String,
    /// Value printed when the option is absent.
    #[arg(long, default_value = "")]
    default: String,
    /// File encoding (UTF-8 or latin-1).
    #[arg(long, default_value = DEFAULT_ENCODING)]
    encoding: String,
}

#[derive(Debug, Clone, Args)]
struct MailArgs {
    /// Recipient (repeatable).
    #[arg(long, required = true)]
    to: Vec<String>,
    /// Subject line.
    #[arg(long)]
    subject: String,
    /// Plain-text body.
    #[arg(long, default_value = "")]
    body: String,
    /// Sender; defaults to mail.default_sender.
    #[arg(long)]
    from: Option<String>,
    /// File to attach (repeatable).
    #[arg(long = "attach", value_name = "PATH")]
    attachments: Vec<PathBuf>,
    /// SMTP server as host or host:port; defaults to mail.server.
    #[arg(long)]
    server: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct ImageArgs {
    /// Image file.
    path: PathBuf,
    /// Number of histogram entries to show.
    #[arg(long, default_value_t = 5)]
    top: usize,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Operation ran but reported failure.
    #[error("{0}")]
    Failed(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
            Self::Failed(_) => 4,
        }
    }
}

/// Everything a command needs, built once per invocation.
struct Context {
    mode: OutputMode,
    config: Config,
    logger: Logger,
}

impl Context {
    fn load(cli: &Cli) -> Result<Self, CliError> {
        let mode = output_mode(cli);
        let mut config =
            Config::load(cli.config.as_deref()).map_err(|e| CliError::Runtime(e.to_string()))?;
        if let Some(level) = cli.level {
            config.logging.level = level;
        }
        let logger = Logger::from_config(&config.logging)
            .with_stdout_mirror(config.logging.mirror_stdout && mode == OutputMode::Human);
        Ok(Self {
            mode,
            config,
            logger,
        })
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Normalize(args) => run_normalize(cli, args),
        Command::Log(args) => run_log(&Context::load(cli)?, args),
        Command::Report(args) => run_report(&Context::load(cli)?, args),
        Command::Run(args) => run_run(&Context::load(cli)?, args),
        Command::Env(args) => run_env(&Context::load(cli)?, args),
        Command::Fetch(args) => run_fetch(&Context::load(cli)?, args),
        Command::Ini(args) => run_ini(cli, args),
        Command::Mail(args) => run_mail(&Context::load(cli)?, args),
        Command::Image(args) => run_image(cli, args),
        Command::Paths => run_paths(&Context::load(cli)?),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn run_normalize(cli: &Cli, args: &NormalizeArgs) -> Result<(), CliError> {
    let output = normalize_delimiters(&args.text);
    match output_mode(cli) {
        OutputMode::Human => println!("{output}"),
        OutputMode::Json => write_json_line(&json!({
            "command": "normalize",
            "input": args.text,
            "output": output,
        }))?,
    }
    Ok(())
}

fn run_log(ctx: &Context, args: &LogArgs) -> Result<(), CliError> {
    let stream = if args.database {
        Stream::Database
    } else {
        Stream::General
    };
    let mut record = Record::new(args.severity, &args.text).indent(args.indent);
    if args.truncate {
        record = record.truncate();
    }

    let emitted = ctx
        .logger
        .try_emit(stream, &record)
        .map_err(|e| CliError::Runtime(e.to_string()))?;
    let sink = ctx.logger.sink(stream).path().display().to_string();

    if ctx.mode == OutputMode::Json {
        write_json_line(&json!({
            "command": "log",
            "severity": args.severity,
            "threshold": ctx.logger.level(),
            "written": emitted == Emitted::Written,
            "sink": sink,
        }))?;
    } else if emitted == Emitted::Suppressed {
        eprintln!(
            "dgmu: {} record suppressed (threshold {})",
            args.severity,
            ctx.logger.level()
        );
    }
    Ok(())
}

fn run_report(ctx: &Context, args: &ReportArgs) -> Result<(), CliError> {
    let mut report = ErrorReport::new(&args.message).indent(args.indent);
    if let Some(cause) = &args.cause {
        report = report.cause(cause);
    }
    if args.database {
        report = report.database();
    }
    let outcome = ctx.logger.report(&report);

    if args.finish {
        let status = args.code.map_or_else(
            || Termination::Message(args.message.clone()),
            Termination::Code,
        );
        ctx.logger.finish_processing(Some(&status));
    }

    if ctx.mode == OutputMode::Json {
        write_json_line(&json!({
            "command": "report",
            "lines_written": outcome.lines_written,
        }))?;
    }
    Ok(())
}

fn run_run(ctx: &Context, args: &RunArgs) -> Result<(), CliError> {
    let output = run_command(&ctx.logger, &args.command);
    match ctx.mode {
        OutputMode::Human => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            stdout.flush()?;
        }
        OutputMode::Json => write_json_line(&json!({
            "command": "run",
            "output": output,
        }))?,
    }
    Ok(())
}

fn run_env(ctx: &Context, args: &EnvArgs) -> Result<(), CliError> {
    match &args.command {
        EnvCommand::Get { name } => {
            let value = get_env(name).map_err(|e| CliError::User(e.to_string()))?;
            match ctx.mode {
                OutputMode::Human => println!("{value}"),
                OutputMode::Json => write_json_line(&json!({
                    "command": "env get",
                    "name": name,
                    "value": value,
                }))?,
            }
            Ok(())
        }
        EnvCommand::Set { name, value } => {
            let changed = set_env(&ctx.logger, name, value);
            report_change(ctx, "env set", name, changed)
        }
        EnvCommand::OracleHome { path } => {
            let changed = change_oracle_home(&ctx.logger, path);
            report_change(ctx, "env oracle-home", "ORACLE_HOME", changed)
        }
    }
}

fn report_change(ctx: &Context, command: &str, name: &str, changed: bool) -> Result<(), CliError> {
    if ctx.mode == OutputMode::Json {
        write_json_line(&json!({
            "command": command,
            "name": name,
            "changed": changed,
        }))?;
    }
    if changed {
        Ok(())
    } else {
        Err(CliError::Failed(format!("{name} was not changed")))
    }
}

fn run_fetch(ctx: &Context, args: &FetchArgs) -> Result<(), CliError> {
    let fetcher = HttpFetcher::new(&ctx.config.http, &ctx.logger)
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    let mut request = FetchRequest::get(&args.url).method(&args.method);
    for (key, value) in &args.params {
        request = request.param(key, value);
    }
    for (name, value) in &args.headers {
        request = request.header(name, value);
    }
    if let Some(secs) = args.timeout {
        request = request.timeout(Duration::from_secs(secs));
    }
    if let (Some(user), Some(password)) = (&args.user, &args.password) {
        request = request.basic_auth(user, password);
    }

    let outcome = fetcher.fetch(&ctx.logger, &request);
    match ctx.mode {
        OutputMode::Human => match &outcome.response {
            Some(response) => {
                println!("{} {}", "status".bold(), response.status);
                println!("{}", response.body);
            }
            None => println!("{} {}", "status".bold(), outcome.status.to_string().red()),
        },
        OutputMode::Json => write_json_line(&json!({
            "command": "fetch",
            "status": outcome.status,
            "url": outcome.response.as_ref().map(|r| r.url.clone()),
            "body": outcome.response.as_ref().map(|r| r.body.clone()),
        }))?,
    }

    if outcome.is_success() {
        Ok(())
    } else {
        Err(CliError::Failed(format!(
            "request failed with status {}",
            outcome.status
        )))
    }
}

fn run_ini(cli: &Cli, args: &IniArgs) -> Result<(), CliError> {
    let value = get_ini_value(
        &args.file,
        &args.section,
        &args.option,
        &args.default,
        &args.encoding,
    )
    .map_err(|e| CliError::User(e.to_string()))?;

    match output_mode(cli) {
        OutputMode::Human => println!("{value}"),
        OutputMode::Json => write_json_line(&json!({
            "command": "ini",
            "file": args.file.display().to_string(),
            "section": args.section,
            "option": args.option,
            "value": value,
        }))?,
    }
    Ok(())
}

fn run_mail(ctx: &Context, args: &MailArgs) -> Result<(), CliError> {
    let sender = args
        .from
        .clone()
        .unwrap_or_else(|| ctx.config.mail.default_sender.clone());
    let mut message = MailMessage::new(sender, args.to.clone(), &args.subject, &args.body);
    for path in &args.attachments {
        message = message.attach(path);
    }
    let server = args.server.as_deref().or(ctx.config.mail.server.as_deref());

    let sent = send_email(&ctx.logger, &SmtpMailTransport::new(), &message, server, 0);
    if ctx.mode == OutputMode::Json {
        write_json_line(&json!({
            "command": "mail",
            "sent": sent,
            "recipients": args.to,
        }))?;
    }
    if sent {
        Ok(())
    } else {
        Err(CliError::Failed("email not sent".to_string()))
    }
}

fn run_image(cli: &Cli, args: &ImageArgs) -> Result<(), CliError> {
    let source = ImageSource::from(args.path.as_path());
    let Some(rgb) = source.rgb() else {
        return Err(CliError::User(format!(
            "{} is not a readable image",
            args.path.display()
        )));
    };
    let decoded = image::DynamicImage::ImageRgb8(rgb);
    let source = ImageSource::from(&decoded);

    let average = average_color(source);
    let distinct = distinct_color_count(source);
    let white = white_percentage(source);
    let mut histogram = color_histogram(source).unwrap_or_default();
    histogram.truncate(args.top);

    match output_mode(cli) {
        OutputMode::Human => {
            if let Some([r, g, b]) = average {
                println!("{:<16} ({r:.1}, {g:.1}, {b:.1})", "average".bold());
            }
            println!("{:<16} {}", "distinct colors".bold(), distinct.unwrap_or(0));
            println!("{:<16} {:.2}%", "white".bold(), white.unwrap_or(0.0));
            for share in &histogram {
                let [r, g, b] = share.rgb;
                println!("  #{r:02x}{g:02x}{b:02x}  {:>6.2}%", share.percentage);
            }
        }
        OutputMode::Json => write_json_line(&json!({
            "command": "image",
            "path": args.path.display().to_string(),
            "average": average,
            "distinct_colors": distinct,
            "white_percentage": white,
            "histogram": histogram,
        }))?,
    }
    Ok(())
}

fn run_paths(ctx: &Context) -> Result<(), CliError> {
    let paths = ctx.logger.paths();
    match ctx.mode {
        OutputMode::Human => print!("{}", paths.banner()),
        OutputMode::Json => {
            let mut payload = serde_json::to_value(paths)?;
            if let Value::Object(map) = &mut payload {
                map.insert("command".to_string(), json!("paths"));
                map.insert("threshold".to_string(), json!(ctx.logger.level()));
            }
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn parse_severity(raw: &str) -> Result<Severity, String> {
    raw.parse::<Severity>().map_err(|e| e.to_string())
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(key, _)| !key.trim().is_empty())
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("DGM_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_subcommand() {
        let cases: Vec<Vec<&str>> = vec![
            vec!["dgmu", "normalize", "(a"],
            vec!["dgmu", "log", "hello", "--severity", "warning", "--indent", "2"],
            vec!["dgmu", "log", "x", "--database", "--truncate"],
            vec!["dgmu", "report", "boom", "--cause", "disk"],
            vec!["dgmu", "report", "boom", "--finish", "--code", "3"],
            vec!["dgmu", "run", "echo hi"],
            vec!["dgmu", "env", "get", "HOME"],
            vec!["dgmu", "env", "set", "HOME", "/tmp"],
            vec!["dgmu", "env", "oracle-home", "/opt/oracle/client"],
            vec!["dgmu", "fetch", "example.com", "--param", "q=1", "--timeout", "3"],
            vec!["dgmu", "ini", "a.ini", "db", "host", "--default", "x"],
            vec!["dgmu", "mail", "--to", "a@b.c", "--subject", "s"],
            vec!["dgmu", "image", "x.png", "--top", "3"],
            vec!["dgmu", "paths", "--level", "error"],
            vec!["dgmu", "--json", "--no-color", "paths"],
        ];

        for case in cases {
            let parsed = Cli::try_parse_from(case.clone());
            assert!(parsed.is_ok(), "failed to parse case: {case:?}");
        }
    }

    #[test]
    fn code_requires_finish() {
        assert!(Cli::try_parse_from(["dgmu", "report", "x", "--code", "2"]).is_err());
    }

    #[test]
    fn level_flag_accepts_names_and_ordinals() {
        let cli = Cli::try_parse_from(["dgmu", "--level", "warning", "paths"]).unwrap();
        assert_eq!(cli.level, Some(Severity::Warning));
        let cli = Cli::try_parse_from(["dgmu", "--level", "3", "paths"]).unwrap();
        assert_eq!(cli.level, Some(Severity::Error));
        assert!(Cli::try_parse_from(["dgmu", "--level", "loud", "paths"]).is_err());
    }

    #[test]
    fn mail_requires_recipient() {
        assert!(Cli::try_parse_from(["dgmu", "mail", "--subject", "s"]).is_err());
    }

    #[test]
    fn completions_support_bash_zsh_and_fish() {
        for shell in ["bash", "zsh", "fish"] {
            let parsed = Cli::try_parse_from(["dgmu", "completions", shell]);
            assert!(parsed.is_ok(), "failed shell parse for {shell}");
        }
    }

    #[test]
    fn pairs_split_on_first_equals() {
        assert_eq!(
            parse_pair("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert!(parse_pair("novalue").is_err());
        assert!(parse_pair("=v").is_err());
    }

    #[test]
    fn output_mode_resolution_honors_precedence() {
        assert_eq!(
            resolve_output_mode(true, Some("human"), true),
            OutputMode::Json
        );
        assert_eq!(
            resolve_output_mode(false, Some("json"), true),
            OutputMode::Json
        );
        assert_eq!(
            resolve_output_mode(false, Some("human"), false),
            OutputMode::Human
        );
        assert_eq!(
            resolve_output_mode(false, Some("auto"), true),
            OutputMode::Human
        );
        assert_eq!(resolve_output_mode(false, None, false), OutputMode::Json);
    }

    #[test]
    fn exit_codes_are_distinct_per_class() {
        assert_eq!(CliError::User(String::new()).exit_code(), 1);
        assert_eq!(CliError::Runtime(String::new()).exit_code(), 2);
        assert_eq!(CliError::Failed(String::new()).exit_code(), 4);
    }
}
