// crates/remote-trigger-cli/src/main.rs
// ============================================================================
// Module: Remote Trigger CLI Entry Point
// Description: Command dispatcher for triggering and following remote builds.
// Purpose: Provide a small CLI over the trigger engine and persisted handles.
// Dependencies: clap, remote-trigger-core, remote-trigger-config, remote-trigger-http
// ============================================================================

//! ## Overview
//! `remote-trigger` submits builds to remote servers and persists the
//! resulting handle as JSON so later invocations can refresh status or read
//! artifacts. Diagnostics go to stderr; machine-readable status goes to
//! stdout.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use remote_trigger_config::RemoteTriggerConfig;
use remote_trigger_core::CancelToken;
use remote_trigger_core::ExecutionContext;
use remote_trigger_core::Handle;
use remote_trigger_core::JsonLinesListener;
use remote_trigger_core::RemoteBuildConfig;
use remote_trigger_core::RemoteBuildResult;
use remote_trigger_core::RemoteBuildStatus;
use remote_trigger_core::RemoteTrigger;
use remote_trigger_http::ReqwestTransport;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable carrying the ambient caller identity.
const IDENTITY_ENV: &str = "REMOTE_TRIGGER_IDENTITY";
/// Maximum size of a persisted handle file.
const MAX_HANDLE_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "remote-trigger", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Trigger a build on a remote server.
    Trigger(TriggerCommand),
    /// Refresh the status of a previously triggered build.
    Status(StatusCommand),
    /// Read a JSON artifact of a previously triggered build.
    Artifact(ArtifactCommand),
}

/// Arguments for `remote-trigger trigger`.
#[derive(Args, Debug)]
struct TriggerCommand {
    /// Configuration file (defaults to `REMOTE_TRIGGER_CONFIG` or `remote-trigger.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Job name (`Folder/Job`) or absolute job URL.
    #[arg(long)]
    job: String,
    /// Named remote server from the configuration.
    #[arg(long, value_name = "NAME")]
    server: Option<String>,
    /// Remote server address overriding the named server.
    #[arg(long, value_name = "URL")]
    server_url: Option<String>,
    /// Build parameter as `KEY=VALUE` (repeatable).
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    params: Vec<(String, String)>,
    /// Remote job trigger token.
    #[arg(long, value_name = "TOKEN")]
    job_token: Option<String>,
    /// Wait for the remote build to finish.
    #[arg(long)]
    block: bool,
    /// Seconds between status polls.
    #[arg(long, value_name = "SECONDS")]
    poll_interval: Option<u64>,
    /// Maximum concurrent connections to the remote server.
    #[arg(long, value_name = "N")]
    max_connections: Option<u32>,
    /// Abort the remote build when the wait is cancelled.
    #[arg(long)]
    abort_on_cancel: bool,
    /// Echo the remote console output when the build finishes.
    #[arg(long)]
    enhanced_logging: bool,
    /// Report a failed remote build without failing this command.
    #[arg(long)]
    should_not_fail_build: bool,
    /// Wait until the remote job is idle before submitting.
    #[arg(long)]
    prevent_queue: bool,
    /// Identity path of the caller (checked against `REMOTE_TRIGGER_IDENTITY`).
    #[arg(long, value_name = "PATH")]
    identity: Option<String>,
    /// File to write the resumable handle to.
    #[arg(long, value_name = "PATH")]
    handle_out: Option<PathBuf>,
    /// Cancel the blocking wait after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    wait_timeout: Option<u64>,
    /// Emit structured events as JSON lines on stderr.
    #[arg(long)]
    events: bool,
}

/// Arguments for `remote-trigger status`.
#[derive(Args, Debug)]
struct StatusCommand {
    /// Configuration file (defaults to `REMOTE_TRIGGER_CONFIG` or `remote-trigger.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Handle file written by `trigger --handle-out`.
    #[arg(long, value_name = "PATH")]
    handle: PathBuf,
    /// Wait until the build finishes.
    #[arg(long)]
    wait: bool,
    /// Cancel the wait after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    wait_timeout: Option<u64>,
}

/// Arguments for `remote-trigger artifact`.
#[derive(Args, Debug)]
struct ArtifactCommand {
    /// Configuration file (defaults to `REMOTE_TRIGGER_CONFIG` or `remote-trigger.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Handle file written by `trigger --handle-out`.
    #[arg(long, value_name = "PATH")]
    handle: PathBuf,
    /// Artifact path relative to the build's artifact root.
    #[arg(long, value_name = "PATH")]
    path: String,
}

/// Status summary printed to stdout.
#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    /// Job name or URL as configured.
    job: &'a str,
    /// Remote job URL.
    job_url: &'a str,
    /// Queue item id, once submitted.
    queue_id: Option<&'a str>,
    /// Build number, once running.
    build_number: Option<u64>,
    /// Build URL, once running.
    build_url: Option<&'a str>,
    /// Current build status.
    status: RemoteBuildStatus,
    /// Final result, once finished.
    result: Option<RemoteBuildResult>,
}

impl<'a> StatusReport<'a> {
    /// Summarizes a handle.
    fn from_handle(handle: &'a Handle) -> Self {
        Self {
            job: handle.configured_job_name_or_url(),
            job_url: handle.job_url(),
            queue_id: handle.queue_id().map(|id| id.as_str()),
            build_number: handle.build_number(),
            build_url: handle.build_url().map(|url| url.as_str()),
            status: handle.build_status(),
            result: handle.build_result(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a single-line message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }

    /// Wraps any displayable error with a context prefix.
    fn context(prefix: &str, error: impl fmt::Display) -> Self {
        Self::new(format!("{prefix}: {error}"))
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Errors from bounded file reads.
#[derive(Debug, Error)]
enum ReadLimitError {
    /// I/O failure while reading.
    #[error("{0}")]
    Io(std::io::Error),
    /// File is larger than the allowed limit.
    #[error("file size {size} exceeds limit {limit}")]
    TooLarge {
        /// Observed size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Commands::Trigger(command) => command_trigger(&command),
        Commands::Status(command) => command_status(&command),
        Commands::Artifact(command) => command_artifact(&command),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Triggers a remote build and optionally persists its handle.
fn command_trigger(command: &TriggerCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let engine = build_engine(&config)?;
    let mut build = config.build_config(&command.job);
    apply_trigger_overrides(&mut build, command);
    let ambient = std::env::var(IDENTITY_ENV).ok();
    let cancel = cancel_after(command.wait_timeout);
    let listener = JsonLinesListener::new(std::io::stderr());
    let mut stderr = std::io::stderr();
    let outcome = {
        let mut context =
            ExecutionContext::resolve(command.identity.as_deref(), ambient.as_deref(), &mut stderr)
                .map_err(|err| CliError::context("identity", err))?;
        if command.events {
            context = context.with_listener(&listener);
        }
        engine.trigger(build, context, &cancel)
    };
    let Some(handle) = outcome.map_err(|err| CliError::context("trigger failed", err))? else {
        return Ok(ExitCode::SUCCESS);
    };
    if let Some(path) = &command.handle_out {
        write_handle(path, &handle)?;
    }
    write_status(&handle)?;
    Ok(ExitCode::SUCCESS)
}

/// Refreshes a persisted handle and rewrites it.
///
/// The handle is rewritten before a refresh error is reported so progress
/// committed during a blocking wait is kept.
fn command_status(command: &StatusCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let engine = build_engine(&config)?;
    let mut handle = read_handle(&command.handle)?;
    let outcome = if command.wait {
        handle.update_build_status_blocking(&engine, &cancel_after(command.wait_timeout))
    } else {
        handle.update_build_status(&engine)
    };
    write_log(&handle.last_log())?;
    write_handle(&command.handle, &handle)?;
    outcome.map_err(|err| CliError::context("status refresh failed", err))?;
    write_status(&handle)?;
    if let Some(result) = handle.build_result()
        && !result.is_success()
        && !handle.config().should_not_fail_build
    {
        return Err(CliError::new(format!("remote build finished with status {result}")));
    }
    Ok(ExitCode::SUCCESS)
}

/// Reads a JSON artifact through a persisted handle.
fn command_artifact(command: &ArtifactCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let engine = build_engine(&config)?;
    let mut handle = read_handle(&command.handle)?;
    let outcome = handle.read_remote_artifact(&engine, &command.path);
    write_log(&handle.last_log())?;
    let value = outcome
        .map_err(|err| CliError::context("artifact read failed", err))?
        .ok_or_else(|| CliError::new(format!("artifact '{}' is not available", command.path)))?;
    write_json(&value)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a `KEY=VALUE` build parameter.
fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (key, value) =
        raw.split_once('=').ok_or_else(|| format!("parameter '{raw}' must be KEY=VALUE"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("parameter '{raw}' has an empty name"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Applies command-line overrides on top of configured defaults.
fn apply_trigger_overrides(build: &mut RemoteBuildConfig, command: &TriggerCommand) {
    if let Some(server) = &command.server {
        build.remote_server_name = Some(server.clone());
    }
    if let Some(url) = &command.server_url {
        build.remote_server_url = Some(url.clone());
    }
    for (key, value) in &command.params {
        build.parameters.insert(key.clone(), value.clone());
    }
    if let Some(token) = &command.job_token {
        build.job_token = Some(token.clone());
    }
    if let Some(interval) = command.poll_interval {
        build.poll_interval_secs = interval;
    }
    if let Some(max) = command.max_connections {
        build.max_connections = max;
    }
    build.block_until_complete |= command.block;
    build.abort_on_cancel |= command.abort_on_cancel;
    build.enhanced_logging |= command.enhanced_logging;
    build.should_not_fail_build |= command.should_not_fail_build;
    build.prevent_remote_build_queue |= command.prevent_queue;
}

/// Loads and validates the configuration file.
fn load_config(path: Option<&Path>) -> CliResult<RemoteTriggerConfig> {
    RemoteTriggerConfig::load(path).map_err(|err| CliError::new(err.to_string()))
}

/// Builds the trigger engine from configuration.
fn build_engine(config: &RemoteTriggerConfig) -> CliResult<RemoteTrigger> {
    let transport =
        ReqwestTransport::new(config.http.clone()).map_err(|err| CliError::new(err.to_string()))?;
    let credentials = config.credential_store().map_err(|err| CliError::new(err.to_string()))?;
    Ok(RemoteTrigger::builder(Arc::new(transport))
        .servers(Arc::new(config.server_lookup()))
        .credentials(Arc::new(credentials))
        .build())
}

/// Returns a token cancelled after `timeout_secs`, if given.
fn cancel_after(timeout_secs: Option<u64>) -> CancelToken {
    let token = CancelToken::new();
    if let Some(secs) = timeout_secs {
        let timer = token.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(secs));
            timer.cancel();
        });
    }
    token
}

/// Reads a file while enforcing a maximum size.
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

    let read_limit = limit.saturating_add(1);
    let mut limited = file.take(read_limit);
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

/// Loads a persisted handle.
fn read_handle(path: &Path) -> CliResult<Handle> {
    let bytes = read_bytes_with_limit(path, MAX_HANDLE_BYTES).map_err(|err| {
        CliError::new(format!("failed to read handle {}: {err}", path.display()))
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|err| CliError::new(format!("invalid handle {}: {err}", path.display())))
}

/// Persists a handle, replacing the file atomically.
fn write_handle(path: &Path, handle: &Handle) -> CliResult<()> {
    let mut bytes = serde_json::to_vec_pretty(handle)
        .map_err(|err| CliError::context("failed to serialize handle", err))?;
    bytes.push(b'\n');
    let staging = path.with_extension("tmp");
    fs::write(&staging, &bytes)
        .and_then(|()| fs::rename(&staging, path))
        .map_err(|err| CliError::new(format!("failed to write handle {}: {err}", path.display())))
}

/// Writes the status summary of a handle to stdout.
fn write_status(handle: &Handle) -> CliResult<()> {
    write_json(&StatusReport::from_handle(handle))
}

/// Writes compact JSON plus a newline to stdout.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut bytes =
        serde_json::to_vec(value).map_err(|err| CliError::context("failed to encode json", err))?;
    bytes.push(b'\n');
    std::io::stdout().write_all(&bytes).map_err(|err| CliError::context("stdout", err))
}

/// Writes a drained operation log to stderr, if any.
fn write_log(log: &str) -> CliResult<()> {
    if log.is_empty() {
        return Ok(());
    }
    write_stderr_line(log).map_err(|err| CliError::context("stderr", err))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
