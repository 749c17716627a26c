// crates/abac-pep-cli/src/main.rs
// ============================================================================
// Module: ABAC PEP CLI Entry Point
// Description: Command dispatcher for PDP queries and offline enforcement.
// Purpose: Exercise the enforcement client from the command line.
// Dependencies: clap, abac-pep-config, abac-pep-core, abac-pep-enforcement,
// abac-pep-pdp, tokio, tracing-subscriber
// ============================================================================

//! ## Overview
//! The `abac-pep` binary asks a PDP for one decision, follows a decision
//! stream, enforces a stored decision against a stored result offline, and
//! checks configuration files. Diagnostics go to stderr through `tracing`
//! (filter via `ABAC_PEP_LOG`); command output goes to stdout as JSON.
//! Security posture: input files are untrusted and size-limited.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use abac_pep_config::AbacPepConfig;
use abac_pep_core::ConstraintEnforcer;
use abac_pep_core::ConstraintRegistry;
use abac_pep_core::Decision;
use abac_pep_core::EnforcementAuditSink;
use abac_pep_core::NoopAuditSink;
use abac_pep_core::Subscription;
use abac_pep_enforcement::PepError;
use abac_pep_enforcement::PostEnforcementPoint;
use abac_pep_pdp::HttpPdpClient;
use abac_pep_pdp::PdpAuth;
use abac_pep_pdp::PolicyDecisionPoint;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable holding the log filter.
const LOG_ENV: &str = "ABAC_PEP_LOG";
/// Log filter used when `ABAC_PEP_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "warn";
/// Maximum size of a subscription, decision, or result input file.
const MAX_INPUT_BYTES: usize = 4 * 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "abac-pep", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Request a single decision from the PDP.
    DecideOnce(PdpCommand),
    /// Follow the decision stream for a subscription.
    Watch(WatchCommand),
    /// Enforce a stored decision against a stored result.
    Enforce(EnforceCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments shared by commands that talk to the PDP.
#[derive(Args, Debug)]
struct PdpCommand {
    /// Config file (defaults to `ABAC_PEP_CONFIG`, then `abac-pep.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Subscription JSON file.
    #[arg(long, value_name = "PATH")]
    subscription: PathBuf,
}

/// Arguments for `watch`.
#[derive(Args, Debug)]
struct WatchCommand {
    /// PDP connection and subscription.
    #[command(flatten)]
    pdp: PdpCommand,
    /// Stop after this many decisions.
    #[arg(long, value_name = "N")]
    count: Option<usize>,
}

/// Arguments for `enforce`.
#[derive(Args, Debug)]
struct EnforceCommand {
    /// Decision JSON file.
    #[arg(long, value_name = "PATH")]
    decision: PathBuf,
    /// Result JSON file to enforce the decision on.
    #[arg(long, value_name = "PATH")]
    result: PathBuf,
    /// Subscription JSON file, used to tag audit records.
    #[arg(long, value_name = "PATH")]
    subscription: Option<PathBuf>,
    /// Config file providing audit settings; auditing is off without one.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a config file.
    Check {
        /// Config file (defaults to `ABAC_PEP_CONFIG`, then `abac-pep.toml`).
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
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

/// Errors raised while reading size-limited input files.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    init_logging();
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Installs the stderr log subscriber.
fn init_logging() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::DecideOnce(command) => command_decide_once(&command).await,
        Commands::Watch(command) => command_watch(&command).await,
        Commands::Enforce(command) => command_enforce(&command),
        Commands::Config {
            command,
        } => command_config(command),
    }
}

// ============================================================================
// SECTION: PDP Commands
// ============================================================================

/// Executes `decide-once`.
async fn command_decide_once(command: &PdpCommand) -> CliResult<ExitCode> {
    let (pdp, subscription) = connect(command)?;
    let decision = pdp.decide_once(&subscription).await;
    write_json_line(&decision)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `watch`.
async fn command_watch(command: &WatchCommand) -> CliResult<ExitCode> {
    let (pdp, subscription) = connect(&command.pdp)?;
    let mut handle = pdp.subscribe_to_decision(&subscription);
    let mut seen = 0_usize;
    while command.count.is_none_or(|limit| seen < limit) {
        let Some(decision) = handle.changed().await else {
            break;
        };
        write_json_line(&decision)?;
        seen = seen.saturating_add(1);
    }
    handle.release();
    pdp.end_transmission();
    Ok(ExitCode::SUCCESS)
}

/// Builds a decision point from config and reads the subscription.
fn connect(command: &PdpCommand) -> CliResult<(PolicyDecisionPoint, Subscription)> {
    let config = load_config(command.config.as_deref())?;
    let subscription: Subscription = read_json(&command.subscription, "subscription")?;
    let client_config = config
        .pdp
        .client_config()
        .map_err(|err| CliError::new(err.to_string()))?;
    let client = HttpPdpClient::new(client_config)
        .map_err(|err| CliError::new(format!("failed to build PDP client: {err}")))?;
    tracing::info!(
        subscription = %subscription.short_id(),
        endpoint = %client.decide_url(),
        "connecting to PDP"
    );
    let pdp = PolicyDecisionPoint::new(Arc::new(client), config.pdp.reconnect_delay());
    Ok((pdp, subscription))
}

// ============================================================================
// SECTION: Enforce Command
// ============================================================================

/// Executes `enforce`.
fn command_enforce(command: &EnforceCommand) -> CliResult<ExitCode> {
    let decision: Decision = read_json(&command.decision, "decision")?;
    let result: Value = read_json(&command.result, "result")?;
    let subscription = match &command.subscription {
        Some(path) => read_json(path, "subscription")?,
        None => Subscription::builder().build(),
    };
    let audit: Arc<dyn EnforcementAuditSink> = match &command.config {
        Some(path) => load_config(Some(path))?
            .audit
            .build_sink()
            .map_err(|err| CliError::new(err.to_string()))?,
        None => Arc::new(NoopAuditSink),
    };
    match enforce_offline(&subscription, &decision, result, audit) {
        Ok(released) => {
            write_json_line(&released)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            write_json_line(&err.denial_payload())?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Post-enforces `decision` on `result` with the built-in providers.
fn enforce_offline(
    subscription: &Subscription,
    decision: &Decision,
    result: Value,
    audit: Arc<dyn EnforcementAuditSink>,
) -> Result<Value, PepError> {
    let registry = ConstraintRegistry::builder().with_builtin_providers().build();
    let enforcer = ConstraintEnforcer::new(Arc::new(registry)).with_audit_sink(audit);
    PostEnforcementPoint::new(Arc::new(enforcer)).enforce_decision(
        subscription,
        Some(decision),
        result,
    )
}

// ============================================================================
// SECTION: Config Command
// ============================================================================

/// Summary printed by `config check`.
#[derive(Debug, Serialize)]
struct ConfigSummary {
    /// Validation status.
    status: &'static str,
    /// Resolved one-shot endpoint.
    decide_once_url: String,
    /// Resolved streaming endpoint.
    decide_url: String,
    /// Credential style in use.
    auth: &'static str,
    /// Whether enforcement auditing is enabled.
    audit_enabled: bool,
}

/// Executes `config` subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Check {
            config,
        } => {
            let config = load_config(config.as_deref())?;
            write_json_line(&summarize_config(&config)?)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Builds the `config check` summary.
fn summarize_config(config: &AbacPepConfig) -> CliResult<ConfigSummary> {
    let client_config =
        config.pdp.client_config().map_err(|err| CliError::new(err.to_string()))?;
    let auth = match client_config.auth {
        PdpAuth::None => "none",
        PdpAuth::Bearer(_) => "bearer",
        PdpAuth::Basic {
            ..
        } => "basic",
    };
    let client = HttpPdpClient::new(client_config)
        .map_err(|err| CliError::new(format!("failed to build PDP client: {err}")))?;
    Ok(ConfigSummary {
        status: "ok",
        decide_once_url: client.decide_once_url().to_string(),
        decide_url: client.decide_url().to_string(),
        auth,
        audit_enabled: config.audit.enabled,
    })
}

/// Loads and validates configuration.
fn load_config(path: Option<&Path>) -> CliResult<AbacPepConfig> {
    AbacPepConfig::load(path).map_err(|err| CliError::new(err.to_string()))
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Reads a file while enforcing a hard byte limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let metadata = file.metadata().map_err(ReadLimitError::Io)?;
    let size = metadata.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        let actual = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        return Err(ReadLimitError::TooLarge {
            size: actual,
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Reads and parses a size-limited JSON input file.
fn read_json<T: DeserializeOwned>(path: &Path, label: &str) -> CliResult<T> {
    let bytes = read_bytes_with_limit(path, MAX_INPUT_BYTES).map_err(|err| match err {
        ReadLimitError::Io(err) => {
            CliError::new(format!("failed to read {label} file {}: {err}", path.display()))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(format!(
            "{label} file {} is {size} bytes, limit is {limit} bytes",
            path.display()
        )),
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|err| CliError::new(format!("invalid {label} json in {}: {err}", path.display())))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a value as one JSON line on stdout.
fn write_json_line<T: Serialize>(value: &T) -> CliResult<()> {
    let line = serde_json::to_string(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    write_stdout_line(&line).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
