// crates/remote-trigger-core/src/runtime/handle.rs
// ============================================================================
// Module: Remote Build Handle
// Description: Resumable view of a triggered remote build.
// Purpose: Decouple triggering from observing across a suspend boundary.
// Dependencies: crate::core, crate::runtime, serde, serde_json, url
// ============================================================================

//! ## Overview
//! A [`Handle`] is returned by [`crate::RemoteTrigger::trigger`] and holds
//! plain values only: the configuration, the resolved server, the job URL,
//! job metadata, the identity path, and the build record. It can be
//! serialized, stored, and refreshed later from a different process.
//!
//! Each refresh builds a minimal execution context from the stored identity
//! and a fresh in-memory log sink. The captured text replaces the handle's
//! log buffer, which [`Handle::last_log`] drains.
//!
//! Security posture: a serialized handle contains the server's authorization
//! settings, including inline API tokens. Store it accordingly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use url::Url;

use crate::core::ExecutionContext;
use crate::core::IdentityPath;
use crate::core::JobMetadata;
use crate::core::QueueId;
use crate::core::RemoteBuildConfig;
use crate::core::RemoteBuildInfo;
use crate::core::RemoteBuildResult;
use crate::core::RemoteBuildStatus;
use crate::core::RemoteServerDescriptor;
use crate::runtime::cancel::CancelToken;
use crate::runtime::engine::RemoteTrigger;
use crate::runtime::engine::Target;
use crate::runtime::error::TriggerError;

// ============================================================================
// SECTION: Handle
// ============================================================================

/// Serializable handle to one triggered remote build.
///
/// # Invariants
/// - The log buffer is never serialized.
/// - A failed refresh leaves the build record unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Handle {
    /// Configuration the build was triggered with.
    config: RemoteBuildConfig,
    /// Remote server the build runs on.
    server: RemoteServerDescriptor,
    /// Remote job URL.
    job_url: Url,
    /// Remote job metadata captured at trigger time.
    #[serde(default)]
    job_metadata: JobMetadata,
    /// Identity path of the triggering job.
    identity: IdentityPath,
    /// Build state machine.
    build_info: RemoteBuildInfo,
    /// Log output of the most recent operation.
    #[serde(skip)]
    log: String,
}

impl Handle {
    /// Creates a handle for a submitted build.
    pub(crate) const fn new(
        config: RemoteBuildConfig,
        server: RemoteServerDescriptor,
        job_url: Url,
        job_metadata: JobMetadata,
        identity: IdentityPath,
        build_info: RemoteBuildInfo,
    ) -> Self {
        Self {
            config,
            server,
            job_url,
            job_metadata,
            identity,
            build_info,
            log: String::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Returns the configuration the build was triggered with.
    #[must_use]
    pub const fn config(&self) -> &RemoteBuildConfig {
        &self.config
    }

    /// Returns the resolved remote server.
    #[must_use]
    pub const fn server(&self) -> &RemoteServerDescriptor {
        &self.server
    }

    /// Returns the identity path used for credential scoping.
    #[must_use]
    pub const fn identity(&self) -> &IdentityPath {
        &self.identity
    }

    /// Returns the build record.
    #[must_use]
    pub const fn build_info(&self) -> &RemoteBuildInfo {
        &self.build_info
    }

    /// Returns the build status.
    #[must_use]
    pub const fn build_status(&self) -> RemoteBuildStatus {
        self.build_info.status()
    }

    /// Returns the final result, once finished.
    #[must_use]
    pub const fn build_result(&self) -> Option<RemoteBuildResult> {
        self.build_info.result()
    }

    /// Returns true only while the build waits in the remote queue.
    #[must_use]
    pub fn is_queued(&self) -> bool {
        self.build_info.is_queued()
    }

    /// Returns true once the build finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.build_info.is_finished()
    }

    /// Returns the queue reference.
    #[must_use]
    pub const fn queue_id(&self) -> Option<&QueueId> {
        self.build_info.queue_id()
    }

    /// Returns the remote build URL, once running.
    #[must_use]
    pub const fn build_url(&self) -> Option<&Url> {
        self.build_info.build_url()
    }

    /// Returns the remote build number, once running.
    #[must_use]
    pub const fn build_number(&self) -> Option<u64> {
        self.build_info.build_number()
    }

    /// Returns the job name or URL exactly as configured.
    #[must_use]
    pub fn configured_job_name_or_url(&self) -> &str {
        &self.config.job
    }

    /// Returns the job metadata captured at trigger time.
    #[must_use]
    pub const fn job_metadata(&self) -> &JobMetadata {
        &self.job_metadata
    }

    /// Returns the remote job's short name.
    #[must_use]
    pub fn job_name(&self) -> Option<&str> {
        self.job_metadata.name.as_deref()
    }

    /// Returns the remote job's full name.
    #[must_use]
    pub fn job_full_name(&self) -> Option<&str> {
        self.job_metadata.full_name.as_deref()
    }

    /// Returns the remote job's display name.
    #[must_use]
    pub fn job_display_name(&self) -> Option<&str> {
        self.job_metadata.display_name.as_deref()
    }

    /// Returns the remote job's full display name.
    #[must_use]
    pub fn job_full_display_name(&self) -> Option<&str> {
        self.job_metadata.full_display_name.as_deref()
    }

    /// Returns the remote job URL, preferring the server-reported one.
    #[must_use]
    pub fn job_url(&self) -> &str {
        self.job_metadata.url.as_deref().unwrap_or_else(|| self.job_url.as_str())
    }

    // ------------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------------

    /// Runs one engine step and returns the resulting status.
    ///
    /// A finished build is returned as-is without contacting the server.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerError`] when the step fails; the build record is left
    /// unchanged.
    pub fn update_build_status(
        &mut self,
        engine: &RemoteTrigger,
    ) -> Result<RemoteBuildStatus, TriggerError> {
        let mut buffer = Vec::new();
        let outcome = {
            let mut context = ExecutionContext::new(self.identity.clone(), &mut buffer);
            let target = Target {
                config: &self.config,
                server: &self.server,
                job_url: &self.job_url,
            };
            engine.step(&target, &mut self.build_info, &mut context, None)
        };
        self.log = String::from_utf8_lossy(&buffer).into_owned();
        outcome.map(|()| self.build_info.status())
    }

    /// Refreshes until the build finishes or `cancel` fires.
    ///
    /// On cancellation a best-effort remote abort is issued when the
    /// configuration asks for it.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerError::Interrupted`] on cancellation and any step
    /// failure otherwise.
    pub fn update_build_status_blocking(
        &mut self,
        engine: &RemoteTrigger,
        cancel: &CancelToken,
    ) -> Result<RemoteBuildStatus, TriggerError> {
        if self.build_info.is_finished() {
            self.log.clear();
            return Ok(self.build_info.status());
        }
        self.config.validate()?;
        let mut buffer = Vec::new();
        let outcome = {
            let mut context = ExecutionContext::new(self.identity.clone(), &mut buffer);
            let target = Target {
                config: &self.config,
                server: &self.server,
                job_url: &self.job_url,
            };
            engine.follow(&target, &mut self.build_info, &mut context, cancel)
        };
        self.log = String::from_utf8_lossy(&buffer).into_owned();
        outcome.map(|()| self.build_info.status())
    }

    /// Reads a JSON artifact of the remote build.
    ///
    /// Returns `None` for a blank path, a build that has not started, or a
    /// missing artifact.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerError`] for transport, authorization, or parse
    /// failures.
    pub fn read_remote_artifact(
        &mut self,
        engine: &RemoteTrigger,
        path: &str,
    ) -> Result<Option<serde_json::Value>, TriggerError> {
        let mut buffer = Vec::new();
        let outcome = {
            let mut context = ExecutionContext::new(self.identity.clone(), &mut buffer);
            let target = Target {
                config: &self.config,
                server: &self.server,
                job_url: &self.job_url,
            };
            engine.read_artifact(&target, &self.build_info, path, &mut context)
        };
        self.log = String::from_utf8_lossy(&buffer).into_owned();
        outcome
    }

    /// Returns the trimmed log of the most recent operation and clears it.
    pub fn last_log(&mut self) -> String {
        let drained = std::mem::take(&mut self.log);
        drained.trim().to_string()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job={}", self.job_url())?;
        if let Some(queue_id) = self.queue_id() {
            write!(f, ", queue id={queue_id}")?;
        }
        if let Some(build_url) = self.build_url() {
            write!(f, ", build={build_url}")?;
        }
        write!(f, ", {}", self.build_info)
    }
}
