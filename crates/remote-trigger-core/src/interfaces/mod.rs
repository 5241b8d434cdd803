// crates/remote-trigger-core/src/interfaces/mod.rs
// ============================================================================
// Module: Remote Trigger Interfaces
// Description: Capabilities consumed by the trigger engine.
// Purpose: Decouple the engine from HTTP clients, config stores, and secrets.
// Dependencies: crate::core, thiserror, url
// ============================================================================

//! ## Overview
//! The engine talks to the outside world through three capabilities:
//! [`RemoteTransport`] for HTTP, [`ServerLookup`] for named remote servers,
//! and [`CredentialStore`] for scoped credentials. Reference in-memory
//! implementations are provided for lookups and credentials; the HTTP
//! implementation lives in `remote-trigger-http`.
//!
//! Security posture: credentials never appear in `Debug` output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use url::Url;

use crate::core::IdentityPath;
use crate::core::RemoteServerDescriptor;

// ============================================================================
// SECTION: HTTP Request / Response
// ============================================================================

/// HTTP methods used by the trigger protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
}

impl HttpMethod {
    /// Returns the canonical method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Outbound HTTP request prepared by the engine.
///
/// # Invariants
/// - Header names are stored lowercase; lookups are case-insensitive.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method.
    pub method: HttpMethod,
    /// Absolute request URL.
    pub url: Url,
    /// Request headers keyed by lowercase name.
    headers: BTreeMap<String, String>,
    /// Optional request body.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a request without headers or body.
    #[must_use]
    pub const fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Returns a header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Sets (or replaces) a header.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Removes a header, returning the previous value.
    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.headers.remove(&name.to_ascii_lowercase())
    }

    /// Returns all headers in name order.
    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Attaches a body with the given content type.
    #[must_use]
    pub fn with_body(mut self, content_type: &str, body: Vec<u8>) -> Self {
        self.set_header("content-type", content_type);
        self.body = Some(body);
        self
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: BTreeMap<&str, &str> = self
            .headers
            .iter()
            .map(|(name, value)| {
                let shown = if name == "authorization" { "<redacted>" } else { value.as_str() };
                (name.as_str(), shown)
            })
            .collect();
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &headers)
            .field("body_len", &self.body.as_ref().map(Vec::len))
            .finish()
    }
}

/// HTTP response returned by a transport.
///
/// # Invariants
/// - Header names are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response headers keyed by lowercase name.
    pub headers: BTreeMap<String, String>,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with the given status and body.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Adds a header (builder style).
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Returns a header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Returns true for 2xx status codes.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Returns the body as lossy UTF-8 text.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Transport-level failures.
///
/// # Invariants
/// - Variants are stable for retry classification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),
    /// Request timed out.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// Connection broke while sending or reading.
    #[error("i/o failure: {0}")]
    Io(String),
    /// Request could not be built (never retried).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Response body exceeded the configured size limit (never retried).
    #[error("response exceeds size limit of {max_bytes} bytes")]
    ResponseTooLarge {
        /// Configured limit in bytes.
        max_bytes: usize,
    },
}

impl TransportError {
    /// Returns true when the failure is worth retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Timeout(_) | Self::Io(_))
    }
}

/// Capability to perform HTTP requests against remote servers.
pub trait RemoteTransport: Send + Sync {
    /// Executes the request and returns the full response.
    ///
    /// Non-2xx statuses are returned as responses, not errors.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no response could be obtained.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

// ============================================================================
// SECTION: Server Lookup
// ============================================================================

/// Resolves named remote servers from configuration.
pub trait ServerLookup: Send + Sync {
    /// Returns the server registered under exactly `name`.
    fn lookup_server(&self, name: &str) -> Option<RemoteServerDescriptor>;
}

/// Fixed list of servers, matched by exact name.
#[derive(Debug, Clone, Default)]
pub struct StaticServerLookup {
    /// Registered servers.
    servers: Vec<RemoteServerDescriptor>,
}

impl StaticServerLookup {
    /// Creates a lookup over the given servers.
    #[must_use]
    pub const fn new(servers: Vec<RemoteServerDescriptor>) -> Self {
        Self {
            servers,
        }
    }
}

impl ServerLookup for StaticServerLookup {
    fn lookup_server(&self, name: &str) -> Option<RemoteServerDescriptor> {
        self.servers.iter().find(|server| server.name.as_deref() == Some(name)).cloned()
    }
}

// ============================================================================
// SECTION: Credentials
// ============================================================================

/// Username and secret pair resolved from a credential store.
#[derive(Clone, PartialEq, Eq)]
pub struct UsernamePassword {
    /// Account name.
    pub username: String,
    /// Secret (password or API token).
    pub password: String,
}

impl fmt::Debug for UsernamePassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsernamePassword")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Resolves credentials visible to a local identity.
pub trait CredentialStore: Send + Sync {
    /// Finds the credential `credential_id` as seen from `identity`.
    ///
    /// Implementations must prefer credentials scoped to the identity (or its
    /// enclosing folders, most specific first) over global ones.
    fn find(&self, credential_id: &str, identity: &IdentityPath) -> Option<UsernamePassword>;
}

/// Credential entry with an optional folder scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedCredential {
    /// Credential identifier.
    pub id: String,
    /// Folder or item path the credential is bound to; `None` means global.
    pub scope: Option<String>,
    /// Credential material.
    pub credential: UsernamePassword,
}

/// In-memory credential store with folder scoping.
///
/// # Invariants
/// - Lookup order: exact identity scope, enclosing folders (innermost
///   first), then global entries.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
    /// Registered credentials.
    entries: Vec<ScopedCredential>,
}

impl InMemoryCredentialStore {
    /// Creates a store over the given entries.
    #[must_use]
    pub const fn new(entries: Vec<ScopedCredential>) -> Self {
        Self {
            entries,
        }
    }

    /// Adds a credential entry.
    pub fn insert(&mut self, entry: ScopedCredential) {
        self.entries.push(entry);
    }

    /// Returns the entry with `id` bound to exactly `scope`.
    fn scoped(&self, id: &str, scope: Option<&str>) -> Option<&ScopedCredential> {
        self.entries.iter().find(|entry| entry.id == id && entry.scope.as_deref() == scope)
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn find(&self, credential_id: &str, identity: &IdentityPath) -> Option<UsernamePassword> {
        let mut scopes = vec![identity.as_str()];
        scopes.extend(identity.ancestors());
        scopes
            .into_iter()
            .find_map(|scope| self.scoped(credential_id, Some(scope)))
            .or_else(|| self.scoped(credential_id, None))
            .map(|entry| entry.credential.clone())
    }
}
