// crates/remote-trigger-http/src/lib.rs
// ============================================================================
// Module: Remote Trigger HTTP Transport
// Description: Blocking reqwest transport for remote build servers.
// Purpose: Execute engine requests with timeouts and bounded responses.
// Dependencies: remote-trigger-core, reqwest, serde, thiserror
// ============================================================================

//! ## Overview
//! [`ReqwestTransport`] implements [`RemoteTransport`] with a blocking reqwest
//! client. Redirects are never followed so the engine sees `Location` headers
//! from queue submissions directly. Response bodies are read with a hard size
//! limit and fail closed when exceeded or truncated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use remote_trigger_core::HttpMethod;
use remote_trigger_core::HttpRequest;
use remote_trigger_core::HttpResponse;
use remote_trigger_core::RemoteTransport;
use remote_trigger_core::TransportError;
use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::redirect::Policy;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the HTTP transport.
///
/// # Invariants
/// - `timeout_ms` applies to the full request lifecycle.
/// - `max_response_bytes` is a hard upper bound on response bodies.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpTransportConfig {
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_response_bytes: 16 * 1024 * 1024,
            user_agent: "remote-trigger/0.1".to_string(),
        }
    }
}

/// Errors raised while constructing the transport.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpTransportError {
    /// The underlying HTTP client could not be built.
    #[error("failed to build http client: {0}")]
    ClientBuild(String),
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Blocking HTTP transport backed by reqwest.
///
/// # Invariants
/// - Redirects are not followed.
/// - Responses exceeding `max_response_bytes` fail with
///   [`TransportError::ResponseTooLarge`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    /// Transport configuration.
    config: HttpTransportConfig,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HttpTransportError`] when the HTTP client cannot be created.
    pub fn new(config: HttpTransportConfig) -> Result<Self, HttpTransportError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| HttpTransportError::ClientBuild(err.to_string()))?;
        Ok(Self {
            config,
            client,
        })
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &HttpTransportConfig {
        &self.config
    }
}

impl RemoteTransport for ReqwestTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };
        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        let mut response = builder.send().map_err(map_send_error)?;

        let status = response.status().as_u16();
        let mut converted = HttpResponse::new(status, Vec::new());
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                converted.headers.insert(name.as_str().to_ascii_lowercase(), value.to_string());
            }
        }
        converted.body = read_response_limited(&mut response, self.config.max_response_bytes)?;
        Ok(converted)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps a reqwest send failure onto the transport error taxonomy.
fn map_send_error(err: reqwest::Error) -> TransportError {
    let (timeout, connect, builder) = (err.is_timeout(), err.is_connect(), err.is_builder());
    let message = err.without_url().to_string();
    if timeout {
        TransportError::Timeout(message)
    } else if connect {
        TransportError::Connect(message)
    } else if builder {
        TransportError::InvalidRequest(message)
    } else {
        TransportError::Io(message)
    }
}

/// Reads a response body while enforcing a maximum size.
fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, TransportError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| TransportError::InvalidRequest("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = expected_len
        && expected > max_bytes_u64
    {
        return Err(TransportError::ResponseTooLarge {
            max_bytes,
        });
    }
    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    let mut handle = response.take(limit);
    handle
        .read_to_end(&mut buf)
        .map_err(|err| TransportError::Io(format!("failed to read response: {err}")))?;
    if buf.len() > max_bytes {
        return Err(TransportError::ResponseTooLarge {
            max_bytes,
        });
    }
    if let Some(expected) = expected_len {
        let expected = usize::try_from(expected)
            .map_err(|_| TransportError::Io("invalid response length".to_string()))?;
        if buf.len() < expected {
            return Err(TransportError::Io("http response truncated".to_string()));
        }
    }
    Ok(buf)
}
