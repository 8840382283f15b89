// crates/arp-conformance-cli/src/main.rs
// ============================================================================
// Module: ARP Conformance CLI Entry Point
// Description: Command dispatcher for conformance runs against ARP services.
// Purpose: Parse flags and config, run checks, render reports, set exit status.
// Dependencies: arp-conformance, clap, thiserror, tracing-subscriber
// ============================================================================

//! ## Overview
//! `arp-conformance check <service>` runs one service; `check all` runs every
//! service given a URL. Reports go to stdout or `--out`; logs go to stderr.
//!
//! Exit status: 0 when the aggregate verdict passes (strict or lenient), 1
//! when it fails, 2 when the CLI fails before a run starts.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod config;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use arp_conformance::ConformanceReport;
use arp_conformance::RunnerOptions;
use arp_conformance::ServiceTargets;
use arp_conformance::Tier;
use arp_conformance::reports_to_json;
use arp_conformance::reports_to_junit_xml;
use arp_conformance::reports_to_text;
use arp_conformance_contract::DEFAULT_VERSION;
use arp_conformance_contract::ServiceKind;
use arp_conformance_contract::spec_ref;
use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::ConfigFile;
use crate::config::OptionOverrides;
use crate::config::load_headers_file;
use crate::config::parse_header_pair;
use crate::config::resolve_options;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable holding the log filter.
const LOG_ENV: &str = "ARP_CONFORMANCE_LOG";
/// Log filter used when `LOG_ENV` is unset.
const DEFAULT_LOG_FILTER: &str = "warn";
/// Exit status for failures before a run starts.
const USAGE_EXIT: u8 = 2;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "arp-conformance", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Log at debug level (overrides `ARP_CONFORMANCE_LOG`).
    #[arg(long, short = 'v', action = ArgAction::SetTrue, global = true)]
    verbose: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run conformance checks.
    Check {
        /// Service to check.
        #[command(subcommand)]
        command: CheckCommand,
    },
}

/// Services accepted by `check`.
#[derive(Subcommand, Debug)]
enum CheckCommand {
    /// Check an ARP runtime service.
    Runtime(SingleServiceArgs),
    /// Check an ARP tool registry service.
    ToolRegistry(ToolRegistryArgs),
    /// Check an ARP daemon service.
    Daemon(DaemonArgs),
    /// Check several ARP services in one invocation.
    All(AllServicesArgs),
}

/// Arguments for `check runtime`.
#[derive(Args, Debug)]
struct SingleServiceArgs {
    /// Service base URL.
    #[arg(long, value_name = "URL")]
    url: String,
    /// Shared run flags.
    #[command(flatten)]
    common: CommonArgs,
}

/// Arguments for `check tool-registry`.
#[derive(Args, Debug)]
struct ToolRegistryArgs {
    /// Service base URL.
    #[arg(long, value_name = "URL")]
    url: String,
    /// Tool selection hints.
    #[command(flatten)]
    tools: ToolHintArgs,
    /// Shared run flags.
    #[command(flatten)]
    common: CommonArgs,
}

/// Arguments for `check daemon`.
#[derive(Args, Debug)]
struct DaemonArgs {
    /// Service base URL.
    #[arg(long, value_name = "URL")]
    url: String,
    /// Runtime profile used for created instances.
    #[arg(long, value_name = "NAME")]
    runtime_profile: Option<String>,
    /// Shared run flags.
    #[command(flatten)]
    common: CommonArgs,
}

/// Arguments for `check all`.
#[derive(Args, Debug)]
struct AllServicesArgs {
    /// Runtime base URL.
    #[arg(long, value_name = "URL")]
    runtime_url: Option<String>,
    /// Tool registry base URL.
    #[arg(long, value_name = "URL")]
    tool_registry_url: Option<String>,
    /// Daemon base URL.
    #[arg(long, value_name = "URL")]
    daemon_url: Option<String>,
    /// Tool selection hints.
    #[command(flatten)]
    tools: ToolHintArgs,
    /// Runtime profile used for created instances.
    #[arg(long, value_name = "NAME")]
    runtime_profile: Option<String>,
    /// Shared run flags.
    #[command(flatten)]
    common: CommonArgs,
}

/// Tool selection hints.
#[derive(Args, Debug, Default)]
struct ToolHintArgs {
    /// Tool id to invoke.
    #[arg(long, value_name = "ID")]
    tool_id: Option<String>,
    /// Tool name to invoke when no id matches.
    #[arg(long, value_name = "NAME")]
    tool_name: Option<String>,
}

/// Flags shared by every `check` subcommand.
#[derive(Args, Debug)]
struct CommonArgs {
    /// Highest tier to run (smoke, surface, core, deep); lower tiers always run first.
    #[arg(long, value_name = "TIER", value_parser = Tier::from_str, default_value = "smoke")]
    tier: Tier,
    /// Extra request header (repeatable).
    #[arg(long = "headers", value_name = "KEY=VALUE", value_parser = parse_header_pair)]
    headers: Vec<(String, String)>,
    /// File with one `KEY=VALUE` header per line.
    #[arg(long, value_name = "PATH")]
    headers_file: Option<PathBuf>,
    /// Per-request timeout in seconds.
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<f64>,
    /// Retries for idempotent requests and connection failures.
    #[arg(long, value_name = "COUNT")]
    retries: Option<u32>,
    /// Deadline for a run to reach a terminal state, in seconds.
    #[arg(long, value_name = "SECONDS")]
    poll_timeout: Option<f64>,
    /// Delay between status polls, in seconds.
    #[arg(long, value_name = "SECONDS")]
    poll_interval: Option<f64>,
    /// Allow checks that create resources (required for core and deep).
    #[arg(long, action = ArgAction::SetTrue)]
    allow_mutations: bool,
    /// Leave created resources in place.
    #[arg(long, action = ArgAction::SetTrue)]
    no_cleanup: bool,
    /// Treat WARN and SKIP as failures for the exit status.
    #[arg(long, action = ArgAction::SetTrue)]
    strict: bool,
    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write the report to a file instead of stdout.
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,
    /// Contract version.
    #[arg(long = "spec", value_name = "VERSION")]
    spec: Option<String>,
    /// Contract directory containing `<version>/` (defaults to the bundled contract).
    #[arg(long, value_name = "DIR")]
    spec_path: Option<PathBuf>,
    /// TOML config file with `[runner]` and `[headers]` tables.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Report formats.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Pretty JSON.
    Json,
    /// `JUnit` XML.
    Junit,
}

/// Service-specific selection hints.
#[derive(Debug, Default)]
struct SelectionHints {
    /// Tool id hint.
    tool_id: Option<String>,
    /// Tool name hint.
    tool_name: Option<String>,
    /// Runtime profile hint.
    runtime_profile: Option<String>,
}

/// CLI error carrying a one-line message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout(&format!("arp-conformance {version} ({})\n", spec_ref(DEFAULT_VERSION)))?;
        return Ok(ExitCode::SUCCESS);
    }
    init_logging(cli.verbose)?;

    let Some(command) = cli.command else {
        let help = Cli::command().render_help().to_string();
        write_stdout(&help)?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Check {
            command,
        } => command_check(command),
    }
}

/// Installs the stderr log subscriber.
fn init_logging(verbose: bool) -> CliResult<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .map_err(|err| CliError::new(format!("failed to initialize logging: {err}")))
}

// ============================================================================
// SECTION: Check Commands
// ============================================================================

/// Dispatches `check` subcommands.
fn command_check(command: CheckCommand) -> CliResult<ExitCode> {
    match command {
        CheckCommand::Runtime(args) => {
            check_single(ServiceKind::Runtime, &args.url, &args.common, SelectionHints::default())
        }
        CheckCommand::ToolRegistry(args) => check_single(
            ServiceKind::ToolRegistry,
            &args.url,
            &args.common,
            SelectionHints {
                tool_id: args.tools.tool_id,
                tool_name: args.tools.tool_name,
                runtime_profile: None,
            },
        ),
        CheckCommand::Daemon(args) => check_single(
            ServiceKind::Daemon,
            &args.url,
            &args.common,
            SelectionHints {
                runtime_profile: args.runtime_profile,
                ..SelectionHints::default()
            },
        ),
        CheckCommand::All(args) => check_all(args),
    }
}

/// Runs one service and emits its report.
fn check_single(
    service: ServiceKind,
    url: &str,
    common: &CommonArgs,
    hints: SelectionHints,
) -> CliResult<ExitCode> {
    let options = build_options(common, hints)?;
    let tier = common.tier;
    debug!(service = %service, url, tier = %tier, "starting conformance check");
    let report = arp_conformance::run(service, url, tier, &options);
    let rendered = render_reports(std::slice::from_ref(&report), common.format, false)?;
    emit_report(&rendered, common.out.as_deref())?;
    Ok(exit_code(std::slice::from_ref(&report), &options))
}

/// Runs every service with a URL and emits the combined report.
fn check_all(args: AllServicesArgs) -> CliResult<ExitCode> {
    let targets = ServiceTargets {
        runtime: args.runtime_url,
        tool_registry: args.tool_registry_url,
        daemon: args.daemon_url,
    };
    if targets.in_order().is_empty() {
        return Err(CliError::new(
            "no service URLs provided (use --runtime-url/--tool-registry-url/--daemon-url)"
                .to_string(),
        ));
    }
    let hints = SelectionHints {
        tool_id: args.tools.tool_id,
        tool_name: args.tools.tool_name,
        runtime_profile: args.runtime_profile,
    };
    let options = build_options(&args.common, hints)?;
    let tier = args.common.tier;
    debug!(services = targets.in_order().len(), tier = %tier, "starting conformance checks");
    let reports = arp_conformance::run_all(tier, &targets, &options);
    let rendered = render_reports(&reports, args.common.format, true)?;
    emit_report(&rendered, args.common.out.as_deref())?;
    Ok(exit_code(&reports, &options))
}

/// Resolves runner options from config, files, and flags.
fn build_options(common: &CommonArgs, hints: SelectionHints) -> CliResult<RunnerOptions> {
    let config = common.config.as_deref().map(ConfigFile::load).transpose()?;
    let mut headers: Vec<(String, String)> = match &common.headers_file {
        Some(path) => load_headers_file(path)?.into_iter().collect(),
        None => Vec::new(),
    };
    headers.extend(common.headers.iter().cloned());
    resolve_options(
        config,
        OptionOverrides {
            timeout: common.timeout,
            retries: common.retries,
            poll_timeout: common.poll_timeout,
            poll_interval: common.poll_interval,
            allow_mutations: common.allow_mutations,
            no_cleanup: common.no_cleanup,
            strict: common.strict,
            spec_path: common.spec_path.clone(),
            spec_version: common.spec.clone(),
            tool_id: hints.tool_id,
            tool_name: hints.tool_name,
            runtime_profile: hints.runtime_profile,
            headers,
        },
    )
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Renders reports; `multi` selects the combined layout for `check all`.
fn render_reports(
    reports: &[ConformanceReport],
    format: OutputFormat,
    multi: bool,
) -> CliResult<String> {
    let mut rendered = match (format, reports) {
        (OutputFormat::Json, [report]) if !multi => report.to_json(),
        (OutputFormat::Json, _) => reports_to_json(reports),
        (OutputFormat::Text, _) => Ok(reports_to_text(reports)),
        (OutputFormat::Junit, _) => Ok(reports_to_junit_xml(reports)),
    }
    .map_err(|err| CliError::new(format!("failed to render report: {err}")))?;
    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }
    Ok(rendered)
}

/// Writes the report to `out` or stdout.
fn emit_report(rendered: &str, out: Option<&Path>) -> CliResult<()> {
    match out {
        Some(path) => {
            fs::write(path, rendered).map_err(|err| {
                CliError::new(format!("failed to write report to {}: {err}", path.display()))
            })?;
            write_stdout(&format!("Wrote report: {}\n", path.display()))
        }
        None => write_stdout(rendered),
    }
}

/// Maps aggregate verdicts to the process exit status.
fn exit_code(reports: &[ConformanceReport], options: &RunnerOptions) -> ExitCode {
    if reports.iter().all(|report| report.exit_ok(options.strict)) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Writes text to stdout.
fn write_stdout(text: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|err| CliError::new(format!("failed to write to stdout: {err}")))
}

/// Writes one line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns the usage exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::from(USAGE_EXIT)
}
