// crates/remote-trigger-core/src/core/context.rs
// ============================================================================
// Module: Remote Trigger Execution Context
// Description: Who is running a trigger and where its diagnostics go.
// Purpose: Reconcile identity sources and carry the log sink for one operation.
// Dependencies: crate::core::{events, identifiers}, thiserror
// ============================================================================

//! ## Overview
//! An [`ExecutionContext`] bundles the identity path used for credential
//! scoping, the text sink receiving diagnostics, and an optional structured
//! listener. It lives for exactly one operation. A later refresh of a
//! [`crate::Handle`] builds a fresh, minimal context because the original
//! sink may be gone by then.
//!
//! Invariants:
//! - The identity path is never blank.
//! - Two identity sources that are both present must be equal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::io::Write;

use thiserror::Error;

use crate::core::events::TriggerEvent;
use crate::core::events::TriggerListener;
use crate::core::identifiers::IdentityPath;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Execution context construction errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextError {
    /// Declared and ambient identities disagree.
    #[error("current item ('{declared}') and parent item of the running job ('{ambient}') differ")]
    IdentityMismatch {
        /// Identity declared by the caller.
        declared: String,
        /// Identity of the ambient running job.
        ambient: String,
    },
    /// Neither identity source is present.
    #[error("no identity available: both the running job and the current item are missing")]
    MissingIdentity,
}

// ============================================================================
// SECTION: Execution Context
// ============================================================================

/// Identity, log sink, and listener for a single trigger operation.
pub struct ExecutionContext<'a> {
    /// Identity path used for credential scoping.
    identity: IdentityPath,
    /// Destination for human-readable diagnostics.
    logger: &'a mut dyn Write,
    /// Optional structured event listener.
    listener: Option<&'a dyn TriggerListener>,
}

impl<'a> ExecutionContext<'a> {
    /// Creates a context for an already-resolved identity.
    pub fn new(identity: IdentityPath, logger: &'a mut dyn Write) -> Self {
        Self {
            identity,
            logger,
            listener: None,
        }
    }

    /// Resolves the identity from the declared and ambient sources.
    ///
    /// Blank values count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::IdentityMismatch`] when both sources are
    /// present and differ, and [`ContextError::MissingIdentity`] when neither
    /// is present.
    pub fn resolve(
        declared: Option<&str>,
        ambient: Option<&str>,
        logger: &'a mut dyn Write,
    ) -> Result<Self, ContextError> {
        let declared = declared.and_then(IdentityPath::parse);
        let ambient = ambient.and_then(IdentityPath::parse);
        let identity = match (declared, ambient) {
            (Some(declared), Some(ambient)) => {
                if declared != ambient {
                    return Err(ContextError::IdentityMismatch {
                        declared: declared.to_string(),
                        ambient: ambient.to_string(),
                    });
                }
                ambient
            }
            (Some(identity), None) | (None, Some(identity)) => identity,
            (None, None) => return Err(ContextError::MissingIdentity),
        };
        Ok(Self::new(identity, logger))
    }

    /// Attaches a structured event listener.
    #[must_use]
    pub fn with_listener(mut self, listener: &'a dyn TriggerListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Returns the resolved identity path.
    #[must_use]
    pub const fn identity(&self) -> &IdentityPath {
        &self.identity
    }

    /// Writes one diagnostic line to the log sink.
    ///
    /// Sink failures are ignored; diagnostics never fail an operation.
    pub fn log(&mut self, message: impl fmt::Display) {
        let _ = writeln!(self.logger, "{message}");
    }

    /// Writes raw text (such as remote console output) to the log sink.
    pub fn log_raw(&mut self, text: &str) {
        let _ = self.logger.write_all(text.as_bytes());
        if !text.ends_with('\n') {
            let _ = self.logger.write_all(b"\n");
        }
    }

    /// Forwards a structured event to the listener, if any.
    pub fn emit(&self, event: &TriggerEvent) {
        if let Some(listener) = self.listener {
            listener.on_event(event);
        }
    }
}

impl fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("identity", &self.identity)
            .field("listener", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}
