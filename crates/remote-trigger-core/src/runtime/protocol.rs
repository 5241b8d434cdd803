// crates/remote-trigger-core/src/runtime/protocol.rs
// ============================================================================
// Module: Remote Build Server Protocol
// Description: Endpoint paths and JSON documents of the remote build server.
// Purpose: Keep wire details out of the engine's control flow.
// Dependencies: crate::core, serde, serde_json, url
// ============================================================================

//! ## Overview
//! Remote documents are decoded into narrow structs that only carry the
//! fields the engine reads. Unknown fields are ignored so newer servers stay
//! compatible.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;
use url::form_urlencoded;

use crate::core::QueueId;
use crate::interfaces::HttpResponse;
use crate::runtime::error::TriggerError;

// ============================================================================
// SECTION: Documents
// ============================================================================

/// Queue item document (`queue/item/<id>/api/json`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueueItem {
    /// True when the item was cancelled before it started.
    pub cancelled: bool,
    /// Build that left the queue, once started.
    pub executable: Option<Executable>,
    /// Human-readable reason the item is still waiting.
    pub why: Option<String>,
}

/// Build reference inside a queue item.
#[derive(Debug, Clone, Deserialize)]
pub struct Executable {
    /// Build number.
    pub number: u64,
    /// Build URL.
    pub url: String,
}

/// Build status document (`<build>/api/json?tree=result,building`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BuildStatusDocument {
    /// Result string, absent while building.
    pub result: Option<String>,
    /// True while the build executes.
    pub building: bool,
}

impl BuildStatusDocument {
    /// Returns true once the build stopped executing.
    ///
    /// A stopped build without a result string is classified as
    /// [`RemoteBuildResult::Unknown`](crate::core::RemoteBuildResult::Unknown).
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        !self.building
    }
}

/// Crumb issuer document (`crumbIssuer/api/json`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrumbDocument {
    /// Crumb value.
    pub crumb: String,
    /// Header name for the crumb.
    pub crumb_request_field: String,
}

/// Job activity document (`<job>/api/json`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobActivity {
    /// True when a build of the job waits in the queue.
    pub in_queue: bool,
    /// Status ball color; an `_anime` suffix means a build is running.
    pub color: Option<String>,
}

impl JobActivity {
    /// Returns true when the job is neither queued nor building.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        !self.in_queue && !self.color.as_deref().is_some_and(|color| color.ends_with("_anime"))
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Decodes a JSON response body.
///
/// # Errors
///
/// Returns [`TriggerError::RemoteProtocol`] when the body does not match.
pub fn parse_json<T: DeserializeOwned>(response: &HttpResponse, what: &str) -> Result<T, TriggerError> {
    serde_json::from_slice(&response.body)
        .map_err(|err| TriggerError::RemoteProtocol(format!("invalid {what} document: {err}")))
}

/// Extracts the queue reference from a submission response.
///
/// Prefers the `Location` header (`.../queue/item/<id>/`) and falls back to
/// an `id` field in a JSON body.
#[must_use]
pub fn parse_queue_id(response: &HttpResponse) -> Option<QueueId> {
    if let Some(location) = response.header("location") {
        let trimmed = location.trim().trim_end_matches('/');
        if let Some((_, tail)) = trimmed.rsplit_once("/queue/item/") {
            let id = tail.split('/').next().unwrap_or_default().trim();
            if !id.is_empty() {
                return Some(QueueId::new(id));
            }
        }
    }
    let body: serde_json::Value = serde_json::from_slice(&response.body).ok()?;
    match body.get("id")? {
        serde_json::Value::Number(number) => Some(QueueId::new(number.to_string())),
        serde_json::Value::String(text) if !text.trim().is_empty() => {
            Some(QueueId::new(text.trim()))
        }
        _ => None,
    }
}

/// Encodes build parameters as an `application/x-www-form-urlencoded` body.
#[must_use]
pub fn form_body(parameters: &BTreeMap<String, String>) -> Vec<u8> {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, value) in parameters {
        serializer.append_pair(name, value);
    }
    serializer.finish().into_bytes()
}

// ============================================================================
// SECTION: URLs
// ============================================================================

/// Appends path segments to `base`, percent-encoding each one.
#[must_use]
pub fn append_path(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty();
        path.extend(segments.iter().filter(|segment| !segment.is_empty()));
    }
    url
}

/// Returns the URL without query and fragment, for logs and errors.
#[must_use]
pub fn display_url(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.set_fragment(None);
    shown.to_string()
}
