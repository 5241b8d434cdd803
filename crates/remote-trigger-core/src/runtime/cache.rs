// crates/remote-trigger-core/src/runtime/cache.rs
// ============================================================================
// Module: Remote Trigger Caches
// Description: Crumb and job metadata caches shared by an engine.
// Purpose: Avoid repeated lookups of values that rarely change.
// Dependencies: crate::core, std
// ============================================================================

//! ## Overview
//! Both caches are `Mutex`-guarded maps. Crumbs are keyed by server address
//! and identity path because a crumb is bound to the session that fetched
//! it. Job metadata is keyed by job URL and holds static identity only,
//! never build state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::PoisonError;

use crate::core::JobMetadata;

// ============================================================================
// SECTION: Crumbs
// ============================================================================

/// Anti-forgery token issued by a remote server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    /// Header name the server expects.
    pub field: String,
    /// Token value.
    pub value: String,
}

/// Cache key for crumbs: server address and identity path.
type CrumbKey = (String, String);

/// Crumb cache keyed by server address and identity.
///
/// # Invariants
/// - A cached `None` records that the server does not require crumbs.
#[derive(Debug, Default)]
pub struct CrumbCache {
    /// Cached crumbs.
    entries: Mutex<HashMap<CrumbKey, Option<Crumb>>>,
}

impl CrumbCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached entry; the outer `None` means not cached.
    #[must_use]
    pub fn get(&self, address: &str, identity: &str) -> Option<Option<Crumb>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(&(address.to_string(), identity.to_string())).cloned()
    }

    /// Stores an entry.
    pub fn insert(&self, address: &str, identity: &str, crumb: Option<Crumb>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert((address.to_string(), identity.to_string()), crumb);
    }

    /// Drops an entry.
    pub fn invalidate(&self, address: &str, identity: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(&(address.to_string(), identity.to_string()));
    }

    /// Returns the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// SECTION: Job Metadata
// ============================================================================

/// Job metadata cache keyed by job URL.
#[derive(Debug, Default)]
pub struct JobInfoCache {
    /// Cached metadata.
    entries: Mutex<HashMap<String, JobMetadata>>,
}

impl JobInfoCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns cached metadata for `job_url`.
    #[must_use]
    pub fn get(&self, job_url: &str) -> Option<JobMetadata> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).get(job_url).cloned()
    }

    /// Stores metadata for `job_url`.
    pub fn insert(&self, job_url: &str, metadata: JobMetadata) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job_url.to_string(), metadata);
    }

    /// Returns the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
