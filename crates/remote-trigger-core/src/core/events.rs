// crates/remote-trigger-core/src/core/events.rs
// ============================================================================
// Module: Remote Trigger Events
// Description: Structured lifecycle events emitted by the trigger engine.
// Purpose: Give callers machine-readable progress without parsing log text.
// Dependencies: crate::core::{build, identifiers}, serde, serde_json
// ============================================================================

//! ## Overview
//! The engine writes human-readable lines to the context's log sink and, in
//! parallel, emits [`TriggerEvent`] values to an optional
//! [`TriggerListener`]. [`JsonLinesListener`] renders each event as a single
//! JSON object per line.
//!
//! Security posture: events carry URLs and identifiers only, never secrets.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;

use crate::core::build::RemoteBuildResult;
use crate::core::build::RemoteBuildStatus;
use crate::core::identifiers::QueueId;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Lifecycle event emitted while triggering or polling a remote build.
///
/// # Invariants
/// - Variants are stable for serialization (`event` tag, snake case).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TriggerEvent {
    /// The remote server accepted the build request.
    Submitted {
        /// Job URL the build was submitted to.
        job_url: String,
        /// Queue reference returned by the server.
        queue_id: QueueId,
    },
    /// The build state machine advanced.
    StatusChanged {
        /// Previous status.
        from: RemoteBuildStatus,
        /// New status.
        to: RemoteBuildStatus,
    },
    /// The remote build finished.
    Finished {
        /// Build URL when known.
        build_url: Option<String>,
        /// Final result.
        result: RemoteBuildResult,
    },
    /// A request failed at the transport level and will be retried.
    Retry {
        /// Request URL.
        url: String,
        /// Attempt number that failed (1-based).
        attempt: u32,
        /// Failure description.
        error: String,
    },
    /// A cached crumb was rejected and has been refetched.
    CrumbRefreshed {
        /// Server address the crumb belongs to.
        server: String,
    },
    /// A best-effort remote abort was issued.
    AbortRequested {
        /// Abort endpoint that was called.
        url: String,
        /// True when the remote server acknowledged the abort.
        acknowledged: bool,
    },
}

// ============================================================================
// SECTION: Listener Trait
// ============================================================================

/// Receiver of structured trigger events.
pub trait TriggerListener: Send + Sync {
    /// Handles one event. Implementations must not panic.
    fn on_event(&self, event: &TriggerEvent);
}

/// Listener that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl TriggerListener for NoopListener {
    fn on_event(&self, _event: &TriggerEvent) {}
}

// ============================================================================
// SECTION: JSON Lines Listener
// ============================================================================

/// Listener that writes each event as one JSON line.
///
/// # Invariants
/// - Each event produces exactly one `\n`-terminated line.
/// - Write and serialization failures are swallowed.
#[derive(Debug)]
pub struct JsonLinesListener<W: Write + Send> {
    /// Output writer guarded for concurrent emitters.
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesListener<W> {
    /// Creates a listener writing to `writer`.
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> TriggerListener for JsonLinesListener<W> {
    fn on_event(&self, event: &TriggerEvent) {
        let Ok(mut bytes) = serde_json::to_vec(event) else {
            return;
        };
        bytes.push(b'\n');
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.write_all(&bytes);
            let _ = writer.flush();
        }
    }
}
