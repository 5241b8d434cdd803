// crates/remote-trigger-core/tests/handle.rs
// ============================================================================
// Module: Handle Tests
// Description: Non-blocking refresh, resume after serialization, artifacts.
// Purpose: Verify the handle stays correct across refreshes and restarts.
// ============================================================================

//! ## Overview
//! Covers one-step refresh semantics, log buffer draining, atomic failure
//! handling, serde resume, cancellation with abort, and artifact reads.

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
#![allow(dead_code, reason = "Common module may have unused helpers.")]

mod common;

use std::time::Duration;
use std::time::Instant;

use remote_trigger_core::CancelToken;
use remote_trigger_core::Handle;
use remote_trigger_core::HttpMethod;
use remote_trigger_core::RemoteBuildResult;
use remote_trigger_core::RemoteBuildStatus;
use remote_trigger_core::RemoteTrigger;
use remote_trigger_core::TransportError;
use remote_trigger_core::TriggerError;

use crate::common::ScriptedTransport;
use crate::common::build_api_path;
use crate::common::build_finished;
use crate::common::build_path;
use crate::common::build_running;
use crate::common::config;
use crate::common::context;
use crate::common::created;
use crate::common::engine;
use crate::common::happy_path;
use crate::common::json;
use crate::common::queue_path;
use crate::common::queue_started;
use crate::common::queue_waiting;
use crate::common::status;
use crate::common::submit_path;
use crate::common::user_token;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn queued_handle(engine: &RemoteTrigger) -> Handle {
    engine.trigger(config(), context(&mut Vec::new()), &CancelToken::new()).unwrap().unwrap()
}

// ============================================================================
// SECTION: Refresh
// ============================================================================

#[test]
fn refresh_runs_one_step_at_a_time() {
    let transport = ScriptedTransport::new();
    transport.on(HttpMethod::Post, &submit_path(), created());
    transport.on(HttpMethod::Get, &queue_path(), queue_waiting());
    transport.on(HttpMethod::Get, &queue_path(), queue_started());
    transport.on(HttpMethod::Get, &build_api_path(), build_running());
    transport.on(HttpMethod::Get, &build_api_path(), build_finished("SUCCESS"));
    let engine = engine(transport);
    let mut handle = queued_handle(&engine);

    assert_eq!(handle.update_build_status(&engine).unwrap(), RemoteBuildStatus::Queued);
    assert!(handle.last_log().contains("Waiting in the remote queue"));
    assert_eq!(handle.update_build_status(&engine).unwrap(), RemoteBuildStatus::Running);
    assert_eq!(handle.build_number(), Some(7));
    assert_eq!(handle.update_build_status(&engine).unwrap(), RemoteBuildStatus::Running);
    assert_eq!(handle.update_build_status(&engine).unwrap(), RemoteBuildStatus::Finished);
    assert_eq!(handle.build_result(), Some(RemoteBuildResult::Success));
}

#[test]
fn last_log_drains_and_trims() {
    let transport = happy_path("SUCCESS");
    let engine = engine(transport);
    let mut handle = queued_handle(&engine);

    handle.update_build_status(&engine).unwrap();
    let log = handle.last_log();

    assert!(log.starts_with("Remote build started: #7"));
    assert!(!log.ends_with('\n'));
    assert_eq!(handle.last_log(), "");
}

#[test]
fn log_buffer_is_replaced_by_each_operation() {
    let transport = happy_path("SUCCESS");
    let engine = engine(transport);
    let mut handle = queued_handle(&engine);

    handle.update_build_status(&engine).unwrap();
    handle.update_build_status(&engine).unwrap();
    let log = handle.last_log();

    assert!(!log.contains("Remote build started"));
    assert!(log.contains("finished with status SUCCESS"));
}

#[test]
fn finished_handle_makes_no_requests() {
    let transport = happy_path("SUCCESS");
    let engine = engine(transport.clone());
    let mut handle = queued_handle(&engine);
    handle.update_build_status(&engine).unwrap();
    handle.update_build_status(&engine).unwrap();
    assert!(handle.is_finished());
    let before = transport.request_count();

    for _ in 0 .. 3 {
        assert_eq!(handle.update_build_status(&engine).unwrap(), RemoteBuildStatus::Finished);
    }
    handle.update_build_status_blocking(&engine, &CancelToken::new()).unwrap();

    assert_eq!(transport.request_count(), before);
    assert_eq!(handle.build_result(), Some(RemoteBuildResult::Success));
}

#[test]
fn finished_handle_blocking_refresh_skips_config_checks() {
    let transport = happy_path("SUCCESS");
    let engine = engine(transport.clone());
    let mut handle = queued_handle(&engine);
    handle.update_build_status(&engine).unwrap();
    handle.update_build_status(&engine).unwrap();
    let mut value = serde_json::to_value(&handle).unwrap();
    value["config"]["poll_interval_secs"] = serde_json::json!(0);
    let mut stored: Handle = serde_json::from_value(value).unwrap();
    let before = transport.request_count();

    let status = stored.update_build_status_blocking(&engine, &CancelToken::new()).unwrap();

    assert_eq!(status, RemoteBuildStatus::Finished);
    assert_eq!(transport.request_count(), before);
}

#[test]
fn stopped_build_without_result_finishes_unknown() {
    let transport = ScriptedTransport::new();
    transport.on(HttpMethod::Post, &submit_path(), created());
    transport.on(HttpMethod::Get, &queue_path(), queue_started());
    transport.on(
        HttpMethod::Get,
        &build_api_path(),
        json(&serde_json::json!({ "building": false, "result": null })),
    );
    let engine = engine(transport);
    let mut handle = queued_handle(&engine);

    let status = handle.update_build_status_blocking(&engine, &CancelToken::new()).unwrap();

    assert_eq!(status, RemoteBuildStatus::Finished);
    assert_eq!(handle.build_result(), Some(RemoteBuildResult::Unknown));
}

#[test]
fn stored_handle_with_inconsistent_build_record_is_rejected() {
    let transport = happy_path("SUCCESS");
    let engine = engine(transport);
    let mut handle = queued_handle(&engine);
    handle.update_build_status(&engine).unwrap();
    let mut value = serde_json::to_value(&handle).unwrap();
    value["build_info"]["result"] = serde_json::json!("FAILURE");

    let err = serde_json::from_value::<Handle>(value).unwrap_err();

    assert!(err.to_string().contains("inconsistent RUNNING build record"), "{err}");
}

#[test]
fn failed_refresh_leaves_state_unchanged() {
    let transport = ScriptedTransport::new();
    transport.on(HttpMethod::Post, &submit_path(), created());
    transport.on(HttpMethod::Get, &queue_path(), status(500));
    transport.on(HttpMethod::Get, &queue_path(), queue_started());
    let engine = engine(transport);
    let mut handle = queued_handle(&engine);
    let before = handle.build_info().clone();

    let err = handle.update_build_status(&engine).unwrap_err();

    assert!(matches!(err, TriggerError::RemoteRejected { status: 500, .. }));
    assert_eq!(handle.build_info(), &before);
    assert_eq!(handle.update_build_status(&engine).unwrap(), RemoteBuildStatus::Running);
}

#[test]
fn malformed_queue_document_is_protocol_error() {
    let transport = ScriptedTransport::new();
    transport.on(HttpMethod::Post, &submit_path(), created());
    transport.on(HttpMethod::Get, &queue_path(), json(&serde_json::json!({ "cancelled": "nope" })));
    let engine = engine(transport);
    let mut handle = queued_handle(&engine);

    let err = handle.update_build_status(&engine).unwrap_err();

    assert!(matches!(err, TriggerError::RemoteProtocol(_)));
    assert!(handle.is_queued());
}

#[test]
fn blocking_refresh_waits_until_finished() {
    let transport = ScriptedTransport::new();
    transport.on(HttpMethod::Post, &submit_path(), created());
    transport.on(HttpMethod::Get, &queue_path(), queue_started());
    transport.on(HttpMethod::Get, &build_api_path(), build_finished("ABORTED"));
    let engine = engine(transport);
    let mut handle = queued_handle(&engine);

    let status = handle.update_build_status_blocking(&engine, &CancelToken::new()).unwrap();

    assert_eq!(status, RemoteBuildStatus::Finished);
    assert_eq!(handle.build_result(), Some(RemoteBuildResult::Aborted));
    assert!(handle.last_log().contains("ABORTED"));
}

#[test]
fn cancelled_blocking_refresh_stops_running_build() {
    let transport = ScriptedTransport::new();
    transport.on(HttpMethod::Post, &submit_path(), created());
    transport.on(HttpMethod::Get, &queue_path(), queue_started());
    transport.on(HttpMethod::Post, &build_path("stop"), status(302));
    let engine = engine(transport.clone());
    let mut config = config();
    config.abort_on_cancel = true;
    let mut handle =
        engine.trigger(config, context(&mut Vec::new()), &CancelToken::new()).unwrap().unwrap();
    handle.update_build_status(&engine).unwrap();
    assert_eq!(handle.build_status(), RemoteBuildStatus::Running);

    let cancel = CancelToken::new();
    cancel.cancel();
    let err = handle.update_build_status_blocking(&engine, &cancel).unwrap_err();

    assert_eq!(err, TriggerError::Interrupted);
    assert_eq!(transport.requests_to(HttpMethod::Post, &build_path("stop")).len(), 1);
    assert_eq!(handle.build_status(), RemoteBuildStatus::Running);
    assert!(handle.last_log().contains("interrupted"));
}

#[test]
fn abort_after_cancel_is_attempted_once() {
    let transport = ScriptedTransport::new();
    transport.on(HttpMethod::Post, &submit_path(), created());
    transport.on(HttpMethod::Get, &queue_path(), queue_started());
    transport.on(
        HttpMethod::Post,
        &build_path("stop"),
        Err(TransportError::Connect("connection refused".to_string())),
    );
    let engine = engine(transport.clone());
    let mut config = config();
    config.abort_on_cancel = true;
    config.retry_backoff_ms = 200;
    let mut handle =
        engine.trigger(config, context(&mut Vec::new()), &CancelToken::new()).unwrap().unwrap();
    handle.update_build_status(&engine).unwrap();
    assert_eq!(handle.build_status(), RemoteBuildStatus::Running);

    let cancel = CancelToken::new();
    cancel.cancel();
    let started = Instant::now();
    let err = handle.update_build_status_blocking(&engine, &cancel).unwrap_err();

    assert_eq!(err, TriggerError::Interrupted);
    assert_eq!(transport.requests_to(HttpMethod::Post, &build_path("stop")).len(), 1);
    assert!(started.elapsed() < Duration::from_secs(2));
    let log = handle.last_log();
    assert!(log.contains("Could not abort remote build"), "{log}");
    assert!(!log.contains("retry 1 of"), "{log}");
}

#[test]
fn cancel_without_abort_flag_sends_no_abort() {
    let transport = happy_path("SUCCESS");
    let engine = engine(transport.clone());
    let mut handle = queued_handle(&engine);
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = handle.update_build_status_blocking(&engine, &cancel).unwrap_err();

    assert_eq!(err, TriggerError::Interrupted);
    assert!(transport.requests_to(HttpMethod::Post, "/queue/cancelItem").is_empty());
}

// ============================================================================
// SECTION: Resume
// ============================================================================

#[test]
fn serialized_handle_resumes_with_new_engine() {
    let transport = happy_path("SUCCESS");
    let first = engine(transport.clone());
    let mut running = queued_handle(&first);
    running.update_build_status(&first).unwrap();
    assert!(!running.last_log().is_empty());

    let stored = serde_json::to_string(&running).unwrap();
    let value: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert!(value.get("log").is_none());
    assert_eq!(value["build_info"]["status"], "RUNNING");
    drop(first);

    let second = engine(transport);
    let mut resumed: Handle = serde_json::from_str(&stored).unwrap();
    assert_eq!(resumed.build_number(), Some(7));
    assert_eq!(resumed.update_build_status(&second).unwrap(), RemoteBuildStatus::Finished);
    assert_eq!(resumed.build_result(), Some(RemoteBuildResult::Success));
}

#[test]
fn serialized_handle_keeps_inline_token_for_resume() {
    let transport = ScriptedTransport::new();
    transport.on(HttpMethod::Post, &submit_path(), created());
    let engine = engine(transport);
    let mut config = config();
    config.auth = Some(user_token("robot", "t0ken"));
    let handle =
        engine.trigger(config, context(&mut Vec::new()), &CancelToken::new()).unwrap().unwrap();

    let restored: Handle = serde_json::from_str(&serde_json::to_string(&handle).unwrap()).unwrap();

    assert_eq!(restored.server().auth, user_token("robot", "t0ken"));
    assert!(!format!("{restored:?}").contains("t0ken"));
}

// ============================================================================
// SECTION: Artifacts
// ============================================================================

#[test]
fn artifact_reads_follow_build_state() {
    let transport = happy_path("SUCCESS");
    transport.on(
        HttpMethod::Get,
        &build_path("artifact/reports/summary.json"),
        json(&serde_json::json!({ "passed": 12 })),
    );
    let engine = engine(transport.clone());
    let mut handle = queued_handle(&engine);

    assert_eq!(handle.read_remote_artifact(&engine, "reports/summary.json").unwrap(), None);
    handle.update_build_status(&engine).unwrap();

    assert_eq!(handle.read_remote_artifact(&engine, "   ").unwrap(), None);
    assert_eq!(
        handle.read_remote_artifact(&engine, "reports/summary.json").unwrap(),
        Some(serde_json::json!({ "passed": 12 }))
    );
    assert_eq!(handle.read_remote_artifact(&engine, "missing.json").unwrap(), None);
    assert!(handle.last_log().contains("not found"));
}

#[test]
fn artifact_with_invalid_json_is_protocol_error() {
    let transport = happy_path("SUCCESS");
    transport.on(
        HttpMethod::Get,
        &build_path("artifact/out.json"),
        Ok(remote_trigger_core::HttpResponse::new(200, "not json")),
    );
    let engine = engine(transport);
    let mut handle = queued_handle(&engine);
    handle.update_build_status(&engine).unwrap();

    let err = handle.read_remote_artifact(&engine, "out.json").unwrap_err();

    assert!(matches!(err, TriggerError::RemoteProtocol(_)));
}

// ============================================================================
// SECTION: Display
// ============================================================================

#[test]
fn display_names_queue_and_status() {
    let transport = happy_path("SUCCESS");
    let engine = engine(transport);
    let mut handle = queued_handle(&engine);

    assert!(handle.to_string().contains("queue id=42"));
    assert!(handle.to_string().contains("status=QUEUED"));

    handle.update_build_status(&engine).unwrap();
    handle.update_build_status(&engine).unwrap();
    let shown = handle.to_string();
    assert!(shown.contains("/7/"));
    assert!(shown.ends_with("status=FINISHED, result=SUCCESS"));
}
