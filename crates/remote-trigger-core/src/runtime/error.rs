// crates/remote-trigger-core/src/runtime/error.rs
// ============================================================================
// Module: Remote Trigger Errors
// Description: Error taxonomy for trigger and refresh operations.
// Purpose: Give callers one stable error type across all engine operations.
// Dependencies: crate::core, crate::interfaces, thiserror
// ============================================================================

//! ## Overview
//! [`TriggerError`] wraps the component errors and adds the failures that
//! only the engine can observe: exhausted retries, rejected requests,
//! malformed remote documents, cancellation, and unsuccessful remote builds.
//!
//! Security posture: URLs in messages have their query string removed so job
//! tokens never reach logs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::AuthError;
use crate::core::BuildStateError;
use crate::core::ConfigError;
use crate::core::ContextError;
use crate::core::RemoteBuildResult;
use crate::interfaces::TransportError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned by trigger and refresh operations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - A returned error never leaves a partially updated build record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TriggerError {
    /// Invalid or incomplete configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Identity could not be established.
    #[error(transparent)]
    Context(#[from] ContextError),
    /// Credentials missing or rejected.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Transport failed and retries were exhausted.
    #[error("request to {url} failed after {attempts} attempt(s): {source}")]
    Transport {
        /// Request URL without query string.
        url: String,
        /// Attempts made, including the first.
        attempts: u32,
        /// Last transport failure.
        source: TransportError,
    },
    /// Remote server answered with an unexpected status.
    #[error("remote server returned status {status} for {url}")]
    RemoteRejected {
        /// HTTP status code.
        status: u16,
        /// Request URL without query string.
        url: String,
    },
    /// Remote server answered with a document that cannot be interpreted.
    #[error("unexpected response from remote server: {0}")]
    RemoteProtocol(String),
    /// The wait was cancelled locally.
    #[error("interrupted while waiting for the remote build")]
    Interrupted,
    /// The build record rejected a transition.
    #[error(transparent)]
    BuildState(#[from] BuildStateError),
    /// The remote build finished without success.
    #[error("remote build finished with status {result}")]
    RemoteBuildFailed {
        /// Final remote result.
        result: RemoteBuildResult,
        /// Remote build URL when known.
        build_url: Option<String>,
    },
}
