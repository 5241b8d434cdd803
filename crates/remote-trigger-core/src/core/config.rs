// crates/remote-trigger-core/src/core/config.rs
// ============================================================================
// Module: Remote Build Configuration
// Description: Per-trigger options and remote job metadata.
// Purpose: Describe what to trigger and how to follow it.
// Dependencies: crate::core::{auth, server}, serde, serde_json
// ============================================================================

//! ## Overview
//! [`RemoteBuildConfig`] is the serializable description of one trigger: the
//! remote job, how to find its server, parameters, and the polling/retry
//! knobs. A [`crate::Handle`] keeps a copy so later refreshes use the same
//! settings even when no caller configuration is reachable anymore.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::core::auth::AuthorizationProvider;
use crate::core::server::ConfigError;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default seconds between status polls.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
/// Default bound on concurrent outbound requests.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 1;
/// Default number of retries for transport failures.
pub const DEFAULT_CONNECTION_RETRY_LIMIT: u32 = 5;
/// Default initial backoff between transport retries, in milliseconds.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 1_000;

// ============================================================================
// SECTION: Build Configuration
// ============================================================================

/// Options for triggering and following one remote build.
///
/// # Invariants
/// - `job` is a job name (`/`-separated folders) or an absolute job URL.
/// - `poll_interval_secs` and `max_connections` must be at least 1 when used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteBuildConfig {
    /// Remote job name or full job URL.
    pub job: String,
    /// Name of a configured remote server.
    pub remote_server_name: Option<String>,
    /// Remote server URL overriding the named server's address.
    pub remote_server_url: Option<String>,
    /// Authorization override; replaces the server's default when set.
    pub auth: Option<AuthorizationProvider>,
    /// Build parameters sent with the submission.
    pub parameters: BTreeMap<String, String>,
    /// Remote job's "trigger builds remotely" token.
    pub job_token: Option<String>,
    /// Wait for the remote build to finish before returning.
    pub block_until_complete: bool,
    /// Seconds between status polls while waiting.
    pub poll_interval_secs: u64,
    /// Upper bound on concurrent outbound requests.
    pub max_connections: u32,
    /// Number of retries after a transport failure.
    pub connection_retry_limit: u32,
    /// Initial backoff between transport retries (doubles per attempt).
    pub retry_backoff_ms: u64,
    /// Abort the remote build when the local wait is cancelled.
    pub abort_on_cancel: bool,
    /// Report non-success results without failing the trigger.
    pub should_not_fail_build: bool,
    /// Wait until the remote job is idle before submitting.
    pub prevent_remote_build_queue: bool,
    /// Echo the remote console output once the build finishes.
    pub enhanced_logging: bool,
    /// Cache anti-forgery crumbs per server and identity.
    pub use_crumb_cache: bool,
    /// Cache remote job metadata per job URL.
    pub use_job_info_cache: bool,
    /// Skip the trigger entirely.
    pub disabled: bool,
}

impl Default for RemoteBuildConfig {
    fn default() -> Self {
        Self {
            job: String::new(),
            remote_server_name: None,
            remote_server_url: None,
            auth: None,
            parameters: BTreeMap::new(),
            job_token: None,
            block_until_complete: false,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connection_retry_limit: DEFAULT_CONNECTION_RETRY_LIMIT,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            abort_on_cancel: false,
            should_not_fail_build: false,
            prevent_remote_build_queue: false,
            enhanced_logging: false,
            use_crumb_cache: false,
            use_job_info_cache: false,
            disabled: false,
        }
    }
}

impl RemoteBuildConfig {
    /// Creates a configuration for `job` with default options.
    #[must_use]
    pub fn new(job: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            ..Self::default()
        }
    }

    /// Returns the poll interval as a duration.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Returns the initial retry backoff as a duration.
    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Checks numeric options that would stall or disable the engine.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when `poll_interval_secs` or
    /// `max_connections` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval_secs".to_string(),
                value: self.poll_interval_secs.to_string(),
            });
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_connections".to_string(),
                value: self.max_connections.to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Job Metadata
// ============================================================================

/// Static identity of a remote job, as reported by the remote server.
///
/// # Invariants
/// - Fields are best effort; blank remote values are stored as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobMetadata {
    /// Short job name.
    pub name: Option<String>,
    /// Full name including folders.
    pub full_name: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
    /// Display name including folders.
    pub full_display_name: Option<String>,
    /// Canonical job URL.
    pub url: Option<String>,
}

impl JobMetadata {
    /// Extracts metadata from a remote `api/json` document.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        let field = |key: &str| {
            value
                .get(key)
                .and_then(serde_json::Value::as_str)
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
        };
        Self {
            name: field("name"),
            full_name: field("fullName"),
            display_name: field("displayName"),
            full_display_name: field("fullDisplayName"),
            url: field("url"),
        }
    }
}
