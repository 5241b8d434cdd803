// crates/remote-trigger-core/src/core/build.rs
// ============================================================================
// Module: Remote Build State
// Description: Forward-only state machine for a remote build.
// Purpose: Record the lifecycle and outcome of one triggered remote build.
// Dependencies: serde, thiserror, url
// ============================================================================

//! ## Overview
//! [`RemoteBuildInfo`] is the authoritative record of a remote build. Its
//! status advances `NotStarted -> Queued -> Running -> Finished` and never
//! moves back. `Queued` may be skipped when the remote scheduler starts the
//! build immediately. Fields fill in monotonically: once a queue id, build
//! number, or result is recorded it is never cleared or replaced.
//!
//! Rejected transitions return [`BuildStateError`] and leave the record
//! untouched. Deserialized records are checked against the same invariants.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::core::identifiers::QueueId;

// ============================================================================
// SECTION: Status and Result
// ============================================================================

/// Lifecycle status of a remote build.
///
/// # Invariants
/// - Declaration order is the lifecycle order; `Ord` compares progress.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteBuildStatus {
    /// Submission in progress; no queue reference yet.
    #[default]
    NotStarted,
    /// Waiting in the remote queue.
    Queued,
    /// Executing on the remote server.
    Running,
    /// Completed; a result is recorded.
    Finished,
}

impl RemoteBuildStatus {
    /// Returns the lifecycle index (0 through 3).
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::Queued => 1,
            Self::Running => 2,
            Self::Finished => 3,
        }
    }

    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Finished => "FINISHED",
        }
    }
}

impl fmt::Display for RemoteBuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a finished remote build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteBuildResult {
    /// Build succeeded.
    Success,
    /// Build failed.
    Failure,
    /// Build completed with test failures or warnings.
    Unstable,
    /// Build (or queue item) was aborted.
    Aborted,
    /// Remote reported no classifiable result.
    Unknown,
}

impl RemoteBuildResult {
    /// Maps the remote server's result string.
    #[must_use]
    pub fn from_remote(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("SUCCESS") => Self::Success,
            Some("FAILURE") => Self::Failure,
            Some("UNSTABLE") => Self::Unstable,
            Some("ABORTED") => Self::Aborted,
            _ => Self::Unknown,
        }
    }

    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Unstable => "UNSTABLE",
            Self::Aborted => "ABORTED",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Returns true only for [`RemoteBuildResult::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for RemoteBuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Rejected state machine transitions.
///
/// # Invariants
/// - Returning this error never mutates the record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildStateError {
    /// Transition would move the status backwards.
    #[error("build status cannot move from {from} back to {to}")]
    Regression {
        /// Current status.
        from: RemoteBuildStatus,
        /// Requested status.
        to: RemoteBuildStatus,
    },
    /// A different queue id is already recorded.
    #[error("queue id already set to {existing}, refusing {requested}")]
    QueueIdConflict {
        /// Recorded queue id.
        existing: QueueId,
        /// Requested queue id.
        requested: QueueId,
    },
    /// A different build number is already recorded.
    #[error("build number already set to {existing}, refusing {requested}")]
    BuildNumberConflict {
        /// Recorded build number.
        existing: u64,
        /// Requested build number.
        requested: u64,
    },
    /// The build already finished with a different result.
    #[error("build already finished with result {existing}, refusing {requested}")]
    AlreadyFinished {
        /// Recorded result.
        existing: RemoteBuildResult,
        /// Requested result.
        requested: RemoteBuildResult,
    },
    /// A stored record violates the state machine invariants.
    #[error("inconsistent {status} build record: {reason}")]
    Inconsistent {
        /// Stored status.
        status: RemoteBuildStatus,
        /// Violated rule.
        reason: &'static str,
    },
}

// ============================================================================
// SECTION: Build Info
// ============================================================================

/// State machine instance for one remote build.
///
/// # Invariants
/// - `status` never decreases.
/// - `queue_id`, `build_number`, `build_url` are never unset once populated.
/// - `result` is `Some` if and only if `status` is `Finished`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "StoredBuildInfo")]
pub struct RemoteBuildInfo {
    /// Lifecycle status.
    status: RemoteBuildStatus,
    /// Queue reference returned on submission.
    queue_id: Option<QueueId>,
    /// Remote build number once resolved.
    build_number: Option<u64>,
    /// Remote build URL once resolved.
    build_url: Option<Url>,
    /// Final result once finished.
    result: Option<RemoteBuildResult>,
}

impl RemoteBuildInfo {
    /// Creates a record in the `NotStarted` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> RemoteBuildStatus {
        self.status
    }

    /// Returns the queue reference, if submitted.
    #[must_use]
    pub const fn queue_id(&self) -> Option<&QueueId> {
        self.queue_id.as_ref()
    }

    /// Returns the remote build number, if resolved.
    #[must_use]
    pub const fn build_number(&self) -> Option<u64> {
        self.build_number
    }

    /// Returns the remote build URL, if resolved.
    #[must_use]
    pub const fn build_url(&self) -> Option<&Url> {
        self.build_url.as_ref()
    }

    /// Returns the final result, if finished.
    #[must_use]
    pub const fn result(&self) -> Option<RemoteBuildResult> {
        self.result
    }

    /// Returns true while submission has not produced a queue reference.
    #[must_use]
    pub fn is_not_started(&self) -> bool {
        self.status == RemoteBuildStatus::NotStarted
    }

    /// Returns true only in the `Queued` state.
    #[must_use]
    pub fn is_queued(&self) -> bool {
        self.status == RemoteBuildStatus::Queued
    }

    /// Returns true only in the `Running` state.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == RemoteBuildStatus::Running
    }

    /// Returns true only in the `Finished` state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status == RemoteBuildStatus::Finished
    }

    /// Records the queue reference and moves to `Queued`.
    ///
    /// Re-recording the same id is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`BuildStateError`] when a different id is recorded or the
    /// build already progressed past submission without this id.
    pub fn set_queued(&mut self, queue_id: QueueId) -> Result<(), BuildStateError> {
        if let Some(existing) = &self.queue_id {
            if *existing == queue_id {
                return Ok(());
            }
            return Err(BuildStateError::QueueIdConflict {
                existing: existing.clone(),
                requested: queue_id,
            });
        }
        self.check_forward(RemoteBuildStatus::Queued)?;
        self.queue_id = Some(queue_id);
        self.status = RemoteBuildStatus::Queued;
        Ok(())
    }

    /// Records the build number and URL and moves to `Running`.
    ///
    /// Allowed from `NotStarted` (queue skipped) and `Queued`. Re-recording
    /// the same number while running is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`BuildStateError`] when a different build number is recorded
    /// or the build already finished.
    pub fn set_running(&mut self, build_number: u64, build_url: Url) -> Result<(), BuildStateError> {
        if let Some(existing) = self.build_number {
            if existing != build_number {
                return Err(BuildStateError::BuildNumberConflict {
                    existing,
                    requested: build_number,
                });
            }
            return self.check_forward(RemoteBuildStatus::Running);
        }
        self.check_forward(RemoteBuildStatus::Running)?;
        self.build_number = Some(build_number);
        self.build_url = Some(build_url);
        self.status = RemoteBuildStatus::Running;
        Ok(())
    }

    /// Records the final result and moves to `Finished`.
    ///
    /// Re-recording the same result is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`BuildStateError::AlreadyFinished`] for a different result.
    pub fn set_finished(&mut self, result: RemoteBuildResult) -> Result<(), BuildStateError> {
        if let Some(existing) = self.result {
            if existing == result {
                return Ok(());
            }
            return Err(BuildStateError::AlreadyFinished {
                existing,
                requested: result,
            });
        }
        self.result = Some(result);
        self.status = RemoteBuildStatus::Finished;
        Ok(())
    }

    /// Rejects transitions to an earlier status.
    fn check_forward(&self, to: RemoteBuildStatus) -> Result<(), BuildStateError> {
        if to < self.status {
            return Err(BuildStateError::Regression {
                from: self.status,
                to,
            });
        }
        Ok(())
    }
}

/// Serialized form of [`RemoteBuildInfo`], checked before it becomes a record.
#[derive(Deserialize)]
struct StoredBuildInfo {
    /// Lifecycle status.
    status: RemoteBuildStatus,
    /// Queue reference.
    queue_id: Option<QueueId>,
    /// Remote build number.
    build_number: Option<u64>,
    /// Remote build URL.
    build_url: Option<Url>,
    /// Final result.
    result: Option<RemoteBuildResult>,
}

impl TryFrom<StoredBuildInfo> for RemoteBuildInfo {
    type Error = BuildStateError;

    fn try_from(stored: StoredBuildInfo) -> Result<Self, Self::Error> {
        let StoredBuildInfo {
            status,
            queue_id,
            build_number,
            build_url,
            result,
        } = stored;
        let inconsistent = |reason| BuildStateError::Inconsistent {
            status,
            reason,
        };
        if result.is_some() != (status == RemoteBuildStatus::Finished) {
            return Err(inconsistent("result must be present exactly when finished"));
        }
        if build_number.is_some() != build_url.is_some() {
            return Err(inconsistent("build number and build url must be set together"));
        }
        match status {
            RemoteBuildStatus::NotStarted if queue_id.is_some() || build_number.is_some() => {
                return Err(inconsistent("an unsubmitted build has no queue or build reference"));
            }
            RemoteBuildStatus::Queued if queue_id.is_none() => {
                return Err(inconsistent("a queued build needs a queue id"));
            }
            RemoteBuildStatus::Queued if build_number.is_some() => {
                return Err(inconsistent("a queued build has no build number yet"));
            }
            RemoteBuildStatus::Running if build_number.is_none() => {
                return Err(inconsistent("a running build needs a build number and url"));
            }
            _ => {}
        }
        Ok(Self {
            status,
            queue_id,
            build_number,
            build_url,
            result,
        })
    }
}

impl fmt::Display for RemoteBuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status={}", self.status)?;
        if let Some(result) = self.result {
            write!(f, ", result={result}")?;
        }
        Ok(())
    }
}
