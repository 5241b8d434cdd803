// crates/remote-trigger-core/src/core/server.rs
// ============================================================================
// Module: Remote Server Resolution
// Description: Remote server descriptors, host precedence, and job URLs.
// Purpose: Decide which server and credentials a trigger talks to.
// Dependencies: crate::core::{auth, config}, crate::interfaces, serde, url
// ============================================================================

//! ## Overview
//! A trigger names its target in up to three ways: the job field may itself
//! be an absolute job URL, the configuration may carry an override URL, and
//! it may reference a named server from configuration. Precedence for the
//! address is job URL, then override URL, then the named server. A named
//! server that resolves always contributes its default authorization, even
//! when its address is overridden, and an explicit authorization on the
//! build configuration replaces that default.
//!
//! All resolution errors surface before any request is sent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::core::auth::AuthorizationProvider;
use crate::core::config::RemoteBuildConfig;
use crate::interfaces::ServerLookup;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Path marker separating a server root from a job path.
const JOB_SEGMENT: &str = "/job/";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration and resolution errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Messages name the offending parameter and value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required parameter is blank or absent.
    #[error("parameter '{0}' not specified")]
    MissingParameter(String),
    /// A parameter is not an absolute http(s) URL.
    #[error("the '{parameter}' value '{value}' is not a valid URL")]
    InvalidUrl {
        /// Parameter name.
        parameter: String,
        /// Offending value.
        value: String,
    },
    /// A named server is not registered.
    #[error("could not find remote host with name '{0}' in the configuration")]
    UnknownRemoteServer(String),
    /// Neither a job URL, an override URL, nor a server name was given.
    #[error("configuration of the remote host is missing")]
    MissingRemoteHost,
    /// A numeric option is out of range.
    #[error("the '{field}' value '{value}' is out of range")]
    InvalidValue {
        /// Option name.
        field: String,
        /// Offending value.
        value: String,
    },
}

// ============================================================================
// SECTION: Server Descriptor
// ============================================================================

/// Address and default authorization of a remote server.
///
/// # Invariants
/// - `name` is `None` for servers derived from a literal URL.
/// - `address` is validated by [`RemoteServerDescriptor::address_url`]
///   before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteServerDescriptor {
    /// Symbolic name from configuration.
    #[serde(default)]
    pub name: Option<String>,
    /// Base address of the server.
    pub address: String,
    /// Default authorization for requests to this server.
    #[serde(default)]
    pub auth: AuthorizationProvider,
}

impl RemoteServerDescriptor {
    /// Creates an anonymous, unauthenticated descriptor for `address`.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: None,
            address: address.into(),
            auth: AuthorizationProvider::NoAuth,
        }
    }

    /// Sets the symbolic name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the default authorization.
    #[must_use]
    pub fn with_auth(mut self, auth: AuthorizationProvider) -> Self {
        self.auth = auth;
        self
    }

    /// Returns the normalized, validated base address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] when the address is blank or not
    /// an absolute http(s) URL.
    pub fn address_url(&self) -> Result<Url, ConfigError> {
        parse_remote_url(normalize_url(&self.address)).ok_or_else(|| ConfigError::InvalidUrl {
            parameter: "remote server address".to_string(),
            value: self.address.clone(),
        })
    }
}

impl fmt::Display for RemoteServerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "'{name}' ({})", self.address),
            None => f.write_str(&self.address),
        }
    }
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves the server a trigger talks to.
///
/// # Errors
///
/// Returns [`ConfigError`] when the job is blank, the override URL is
/// invalid, a named server is unknown and no URL replaces it, no host is
/// configured at all, or the resulting address is invalid.
pub fn evaluate_effective_remote_host(
    config: &RemoteBuildConfig,
    lookup: &dyn ServerLookup,
) -> Result<RemoteServerDescriptor, ConfigError> {
    let job = config.job.trim();
    if job.is_empty() {
        return Err(ConfigError::MissingParameter("job".to_string()));
    }
    let override_url = non_blank(config.remote_server_url.as_deref());
    if let Some(raw) = override_url
        && parse_remote_url(normalize_url(raw)).is_none()
    {
        return Err(ConfigError::InvalidUrl {
            parameter: "remote_server_url".to_string(),
            value: raw.to_string(),
        });
    }
    let name = non_blank(config.remote_server_name.as_deref());
    let named = name.and_then(|name| lookup.lookup_server(name));

    let address = if is_remote_url(job) {
        Some(root_url_from_job_url(job))
    } else {
        override_url.map(|raw| normalize_url(raw).to_string())
    };

    let mut server = match (named, address) {
        (Some(mut server), Some(address)) => {
            server.address = address;
            server
        }
        (Some(server), None) => server,
        (None, Some(address)) => RemoteServerDescriptor::new(address),
        (None, None) => {
            return Err(name.map_or(ConfigError::MissingRemoteHost, |name| {
                ConfigError::UnknownRemoteServer(name.to_string())
            }));
        }
    };
    if let Some(auth) = &config.auth {
        server.auth = auth.clone();
    }
    server.address_url()?;
    Ok(server)
}

/// Builds the job URL for a job name (`/`-separated folders) on `server`.
///
/// `"https://host:8080/jenkins"` with `"Folder/JobName"` yields
/// `"https://host:8080/jenkins/job/Folder/job/JobName"`. Segments are
/// percent-encoded.
///
/// # Errors
///
/// Returns [`ConfigError`] when the job is blank or the server address is
/// invalid.
pub fn generate_job_url(server: &RemoteServerDescriptor, job: &str) -> Result<Url, ConfigError> {
    let job = remove_trailing_slashes(remove_hash_parameters(remove_query_parameters(job)));
    if job.is_empty() {
        return Err(ConfigError::MissingParameter("job".to_string()));
    }
    let mut url = server.address_url()?;
    {
        let mut segments = url.path_segments_mut().map_err(|()| ConfigError::InvalidUrl {
            parameter: "remote server address".to_string(),
            value: server.address.clone(),
        })?;
        segments.pop_if_empty();
        for segment in job.split('/').map(str::trim).filter(|segment| !segment.is_empty()) {
            segments.push("job");
            segments.push(segment);
        }
    }
    Ok(url)
}

/// Returns the job URL for a configuration: the job field itself when it is
/// an absolute URL, otherwise a URL generated on `server`.
///
/// # Errors
///
/// Returns [`ConfigError`] when the URL cannot be built.
pub fn effective_job_url(
    config: &RemoteBuildConfig,
    server: &RemoteServerDescriptor,
) -> Result<Url, ConfigError> {
    let job = config.job.trim();
    if is_remote_url(job) {
        return parse_remote_url(normalize_url(job)).ok_or_else(|| ConfigError::InvalidUrl {
            parameter: "job".to_string(),
            value: job.to_string(),
        });
    }
    generate_job_url(server, job)
}

// ============================================================================
// SECTION: URL Helpers
// ============================================================================

/// Returns true when `raw` is an absolute http(s) URL with a host.
#[must_use]
pub fn is_remote_url(raw: &str) -> bool {
    parse_remote_url(raw.trim()).is_some()
}

/// Strips trailing whitespace and slashes, repeatedly.
///
/// `"xxx/     "` yields `"xxx"`.
#[must_use]
pub fn remove_trailing_slashes(raw: &str) -> &str {
    let mut current = raw.trim();
    loop {
        let next = current.trim_end_matches('/').trim_end();
        if next.len() == current.len() {
            return current;
        }
        current = next;
    }
}

/// Drops everything from the first `?`.
#[must_use]
pub fn remove_query_parameters(raw: &str) -> &str {
    raw.split_once('?').map_or(raw, |(head, _)| head)
}

/// Drops everything from the first `#`.
#[must_use]
pub fn remove_hash_parameters(raw: &str) -> &str {
    raw.split_once('#').map_or(raw, |(head, _)| head)
}

/// Strips query, fragment, and trailing slashes.
fn normalize_url(raw: &str) -> &str {
    remove_trailing_slashes(remove_hash_parameters(remove_query_parameters(raw)))
}

/// Parses an absolute http(s) URL with a host.
fn parse_remote_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    let scheme_ok = matches!(url.scheme(), "http" | "https");
    let host_ok = url.host_str().is_some_and(|host| !host.is_empty());
    (scheme_ok && host_ok).then_some(url)
}

/// Returns the server root of a job URL: the prefix before the first
/// `/job/` segment, or the URL's origin when there is none.
fn root_url_from_job_url(job_url: &str) -> String {
    let normalized = normalize_url(job_url);
    let Some(url) = parse_remote_url(normalized) else {
        return normalized.to_string();
    };
    let origin = url.origin().ascii_serialization();
    let path = url.path();
    let prefix = path.find(JOB_SEGMENT).map_or("", |idx| &path[..idx]);
    format!("{origin}{}", remove_trailing_slashes(prefix))
}

/// Returns the trimmed value when it is non-blank.
fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}
