// crates/remote-trigger-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing, overrides, and bounded reads.
// Purpose: Ensure CLI inputs map onto trigger configuration and fail closed.
// Dependencies: remote-trigger-cli main helpers
// ============================================================================

//! ## Overview
//! Exercises the helpers behind the subcommands without network access.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use clap::Parser;
use remote_trigger_config::RemoteTriggerConfig;

use super::Cli;
use super::Commands;
use super::ReadLimitError;
use super::TriggerCommand;
use super::apply_trigger_overrides;
use super::parse_param;
use super::read_bytes_with_limit;
use super::read_handle;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn trigger_args(extra: &[&str]) -> TriggerCommand {
    let mut args = vec!["remote-trigger", "trigger", "--job", "Folder/app"];
    args.extend_from_slice(extra);
    match Cli::try_parse_from(args).unwrap().command {
        Commands::Trigger(command) => command,
        other => panic!("unexpected command {other:?}"),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn parse_param_splits_on_first_equals() {
    assert_eq!(parse_param("A=b=c").unwrap(), ("A".to_string(), "b=c".to_string()));
    assert_eq!(parse_param(" KEY =").unwrap(), ("KEY".to_string(), String::new()));
    assert!(parse_param("novalue").unwrap_err().contains("KEY=VALUE"));
    assert!(parse_param("=x").unwrap_err().contains("empty name"));
}

#[test]
fn overrides_layer_on_configured_defaults() {
    let config = RemoteTriggerConfig::from_toml_str(
        r#"
[defaults]
server = "main"
poll_interval_secs = 30
abort_on_cancel = true

[[servers]]
name = "main"
address = "https://ci.example"
"#,
    )
    .unwrap();
    let command = trigger_args(&[
        "--param",
        "BRANCH=main",
        "--param",
        "BRANCH=release",
        "--poll-interval",
        "2",
        "--block",
        "--server-url",
        "https://other.example",
    ]);
    let mut build = config.build_config(&command.job);

    apply_trigger_overrides(&mut build, &command);

    assert_eq!(build.remote_server_name.as_deref(), Some("main"));
    assert_eq!(build.remote_server_url.as_deref(), Some("https://other.example"));
    assert_eq!(build.parameters.get("BRANCH").map(String::as_str), Some("release"));
    assert_eq!(build.poll_interval_secs, 2);
    assert!(build.block_until_complete);
    assert!(build.abort_on_cancel);
    assert!(!build.enhanced_logging);
}

#[test]
fn missing_job_is_a_usage_error() {
    assert!(Cli::try_parse_from(["remote-trigger", "trigger"]).is_err());
}

#[test]
fn bounded_read_rejects_oversized_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("handle.json");
    fs::write(&path, vec![b'x'; 64]).unwrap();

    assert!(matches!(
        read_bytes_with_limit(&path, 16),
        Err(ReadLimitError::TooLarge {
            size: 64,
            limit: 16
        })
    ));
    assert_eq!(read_bytes_with_limit(&path, 64).unwrap().len(), 64);
}

#[test]
fn corrupt_handle_is_reported_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("handle.json");
    fs::write(&path, b"{ not json").unwrap();

    let err = read_handle(&path).unwrap_err();

    assert!(err.to_string().contains("invalid handle"));
    assert!(err.to_string().contains("handle.json"));
}
