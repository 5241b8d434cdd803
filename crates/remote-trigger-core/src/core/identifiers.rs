// crates/remote-trigger-core/src/core/identifiers.rs
// ============================================================================
// Module: Remote Trigger Identifiers
// Description: Opaque identifiers for local identities and remote queue items.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers serialize as plain strings. [`IdentityPath`] rejects blank
//! input at construction so every holder can rely on a usable credential
//! scope.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identity Path
// ============================================================================

/// Path of the local job or pipeline that invokes the trigger.
///
/// # Invariants
/// - Never blank; surrounding whitespace is trimmed at construction.
/// - Segments are separated by `/` (folder semantics).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityPath(String);

impl IdentityPath {
    /// Creates an identity path, returning `None` for blank input.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    /// Returns the identity path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the enclosing folders, most specific first.
    ///
    /// `"teamA/sub/pipeline"` yields `["teamA/sub", "teamA"]`.
    #[must_use]
    pub fn ancestors(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let mut current = self.0.as_str();
        while let Some(idx) = current.rfind('/') {
            current = &current[..idx];
            if !current.is_empty() {
                out.push(current);
            }
        }
        out
    }
}

impl TryFrom<String> for IdentityPath {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| "identity path must not be blank".to_string())
    }
}

impl From<IdentityPath> for String {
    fn from(value: IdentityPath) -> Self {
        value.0
    }
}

impl fmt::Display for IdentityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SECTION: Queue Identifier
// ============================================================================

/// Opaque identifier of a queued remote build.
///
/// # Invariants
/// - Opaque UTF-8 string; compared byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueId(String);

impl QueueId {
    /// Creates a new queue identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
