// crates/remote-trigger-config/src/config.rs
// ============================================================================
// Module: Remote Trigger Configuration
// Description: Configuration loading and validation for remote triggers.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: remote-trigger-core, remote-trigger-http, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The file declares named remote servers, credentials scoped to identity
//! folders, HTTP transport settings, and defaults applied to every trigger.
//! Secrets may be given inline or read from environment variables when the
//! credential store is materialized.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use remote_trigger_core::AuthorizationProvider;
use remote_trigger_core::IdentityPath;
use remote_trigger_core::InMemoryCredentialStore;
use remote_trigger_core::RemoteBuildConfig;
use remote_trigger_core::RemoteServerDescriptor;
use remote_trigger_core::ScopedCredential;
use remote_trigger_core::StaticServerLookup;
use remote_trigger_core::UsernamePassword;
use remote_trigger_core::core::config::DEFAULT_CONNECTION_RETRY_LIMIT;
use remote_trigger_core::core::config::DEFAULT_MAX_CONNECTIONS;
use remote_trigger_core::core::config::DEFAULT_POLL_INTERVAL_SECS;
use remote_trigger_core::core::config::DEFAULT_RETRY_BACKOFF_MS;
use remote_trigger_http::HttpTransportConfig;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "remote-trigger.toml";
/// Environment variable overriding the config path.
pub const CONFIG_ENV_VAR: &str = "REMOTE_TRIGGER_CONFIG";
/// Maximum config file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of configured servers.
pub(crate) const MAX_SERVERS: usize = 256;
/// Maximum number of configured credentials.
pub(crate) const MAX_CREDENTIALS: usize = 1024;
/// Upper bound on the poll interval in seconds.
pub(crate) const MAX_POLL_INTERVAL_SECS: u64 = 3_600;
/// Upper bound on concurrent connections per trigger.
pub(crate) const MAX_CONNECTIONS: u32 = 64;
/// Minimum transport timeout in milliseconds.
pub(crate) const MIN_HTTP_TIMEOUT_MS: u64 = 100;
/// Maximum transport timeout in milliseconds.
pub(crate) const MAX_HTTP_TIMEOUT_MS: u64 = 600_000;

// ============================================================================
// SECTION: Top-Level Config
// ============================================================================

/// Root configuration for remote triggers.
///
/// # Invariants
/// - Server names are non-empty and unique.
/// - Server addresses are absolute http(s) URLs.
/// - Credential `(id, scope)` pairs are unique and each has exactly one
///   secret source.
/// - Credential-based server auth references a declared credential id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteTriggerConfig {
    /// Defaults applied to every trigger.
    #[serde(default)]
    pub defaults: TriggerDefaults,
    /// HTTP transport settings.
    #[serde(default)]
    pub http: HttpTransportConfig,
    /// Named remote servers.
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
    /// Credentials available to triggers.
    #[serde(default)]
    pub credentials: Vec<CredentialConfig>,
}

impl RemoteTriggerConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit path, then `REMOTE_TRIGGER_CONFIG`, then
    /// `remote-trigger.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = read_config_bytes(&resolved)?;
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.defaults.validate(&self.servers)?;
        validate_http(&self.http)?;
        if self.servers.len() > MAX_SERVERS {
            return Err(ConfigError::Invalid(format!(
                "too many servers (max {MAX_SERVERS})"
            )));
        }
        if self.credentials.len() > MAX_CREDENTIALS {
            return Err(ConfigError::Invalid(format!(
                "too many credentials (max {MAX_CREDENTIALS})"
            )));
        }
        let mut names = BTreeSet::new();
        for (index, server) in self.servers.iter().enumerate() {
            server.validate(index)?;
            if !names.insert(server.name.trim()) {
                return Err(ConfigError::Invalid(format!(
                    "servers[{index}].name '{}' is duplicated",
                    server.name.trim()
                )));
            }
        }
        let mut keys = BTreeSet::new();
        for (index, credential) in self.credentials.iter().enumerate() {
            credential.validate(index)?;
            if !keys.insert((credential.id.trim(), credential.normalized_scope())) {
                return Err(ConfigError::Invalid(format!(
                    "credentials[{index}] duplicates id '{}' in the same scope",
                    credential.id.trim()
                )));
            }
        }
        let ids: BTreeSet<&str> = self.credentials.iter().map(|c| c.id.trim()).collect();
        for (index, server) in self.servers.iter().enumerate() {
            if let Some(AuthorizationProvider::CredentialAuth {
                credential_id,
            }) = &server.auth
                && !ids.contains(credential_id.trim())
            {
                return Err(ConfigError::Invalid(format!(
                    "servers[{index}].auth references unknown credential '{credential_id}'"
                )));
            }
        }
        Ok(())
    }

    /// Returns a server lookup over the configured servers.
    #[must_use]
    pub fn server_lookup(&self) -> StaticServerLookup {
        StaticServerLookup::new(self.servers.iter().map(ServerConfig::descriptor).collect())
    }

    /// Materializes the credential store, reading environment secrets.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a referenced environment variable
    /// is unset or empty.
    pub fn credential_store(&self) -> Result<InMemoryCredentialStore, ConfigError> {
        let mut credentials = Vec::with_capacity(self.credentials.len());
        for credential in &self.credentials {
            credentials.push(credential.resolve()?);
        }
        Ok(InMemoryCredentialStore::new(credentials))
    }

    /// Builds a trigger configuration for `job` seeded with the defaults.
    #[must_use]
    pub fn build_config(&self, job: &str) -> RemoteBuildConfig {
        let mut config = RemoteBuildConfig::new(job);
        self.defaults.apply(&mut config);
        config
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Defaults applied to every trigger built from this configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TriggerDefaults {
    /// Server used when a trigger names none.
    pub server: Option<String>,
    /// Seconds between polls.
    pub poll_interval_secs: u64,
    /// Maximum concurrent connections per trigger.
    pub max_connections: u32,
    /// Retry budget for transport failures.
    pub connection_retry_limit: u32,
    /// Initial retry backoff in milliseconds.
    pub retry_backoff_ms: u64,
    /// Wait for the remote build to finish.
    pub block_until_complete: bool,
    /// Abort the remote build when the wait is cancelled.
    pub abort_on_cancel: bool,
    /// Report non-success results without failing.
    pub should_not_fail_build: bool,
    /// Wait for the remote job to be idle before submitting.
    pub prevent_remote_build_queue: bool,
    /// Echo the remote console output when the build finishes.
    pub enhanced_logging: bool,
    /// Cache crumbs per server and identity.
    pub use_crumb_cache: bool,
    /// Cache job metadata per job URL.
    pub use_job_info_cache: bool,
}

impl Default for TriggerDefaults {
    fn default() -> Self {
        Self {
            server: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connection_retry_limit: DEFAULT_CONNECTION_RETRY_LIMIT,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            block_until_complete: false,
            abort_on_cancel: false,
            should_not_fail_build: false,
            prevent_remote_build_queue: false,
            enhanced_logging: false,
            use_crumb_cache: true,
            use_job_info_cache: true,
        }
    }
}

impl TriggerDefaults {
    /// Validates ranges and the default server reference.
    fn validate(&self, servers: &[ServerConfig]) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 || self.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
            return Err(ConfigError::Invalid(format!(
                "defaults.poll_interval_secs must be between 1 and {MAX_POLL_INTERVAL_SECS}"
            )));
        }
        if self.max_connections == 0 || self.max_connections > MAX_CONNECTIONS {
            return Err(ConfigError::Invalid(format!(
                "defaults.max_connections must be between 1 and {MAX_CONNECTIONS}"
            )));
        }
        if let Some(server) = &self.server
            && !servers.iter().any(|candidate| candidate.name.trim() == server.trim())
        {
            return Err(ConfigError::Invalid(format!(
                "defaults.server references unknown server '{server}'"
            )));
        }
        Ok(())
    }

    /// Copies the defaults onto a trigger configuration.
    fn apply(&self, config: &mut RemoteBuildConfig) {
        config.remote_server_name = self.server.as_ref().map(|name| name.trim().to_string());
        config.poll_interval_secs = self.poll_interval_secs;
        config.max_connections = self.max_connections;
        config.connection_retry_limit = self.connection_retry_limit;
        config.retry_backoff_ms = self.retry_backoff_ms;
        config.block_until_complete = self.block_until_complete;
        config.abort_on_cancel = self.abort_on_cancel;
        config.should_not_fail_build = self.should_not_fail_build;
        config.prevent_remote_build_queue = self.prevent_remote_build_queue;
        config.enhanced_logging = self.enhanced_logging;
        config.use_crumb_cache = self.use_crumb_cache;
        config.use_job_info_cache = self.use_job_info_cache;
    }
}

// ============================================================================
// SECTION: Servers
// ============================================================================

/// Named remote server entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Unique display name.
    pub name: String,
    /// Root address of the server.
    pub address: String,
    /// Default authorization for the server.
    #[serde(default)]
    pub auth: Option<AuthorizationProvider>,
}

impl ServerConfig {
    /// Validates name and address.
    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("servers[{index}].name must be non-empty")));
        }
        self.descriptor().address_url().map_err(|err| {
            ConfigError::Invalid(format!("servers[{index}] '{}': {err}", self.name.trim()))
        })?;
        Ok(())
    }

    /// Converts the entry into a core server descriptor.
    fn descriptor(&self) -> RemoteServerDescriptor {
        RemoteServerDescriptor::new(self.address.trim())
            .with_name(self.name.trim())
            .with_auth(self.auth.clone().unwrap_or_default())
    }
}

// ============================================================================
// SECTION: Credentials
// ============================================================================

/// Username/password credential entry.
///
/// # Invariants
/// - Exactly one of `password` and `password_env` is set.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialConfig {
    /// Credential id referenced by authorization providers.
    pub id: String,
    /// Identity folder the credential is visible to (global when absent).
    #[serde(default)]
    pub scope: Option<String>,
    /// Username sent with Basic authorization.
    pub username: String,
    /// Inline password or API token.
    #[serde(default)]
    pub password: Option<String>,
    /// Environment variable holding the password.
    #[serde(default)]
    pub password_env: Option<String>,
}

impl fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("password_env", &self.password_env)
            .finish()
    }
}

impl CredentialConfig {
    /// Returns the trimmed scope, treating blank as global.
    fn normalized_scope(&self) -> Option<&str> {
        self.scope.as_deref().map(str::trim).filter(|scope| !scope.is_empty())
    }

    /// Validates identifiers and the secret source.
    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("credentials[{index}].id must be non-empty")));
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "credentials[{index}].username must be non-empty"
            )));
        }
        if let Some(scope) = self.normalized_scope()
            && IdentityPath::parse(scope).is_none()
        {
            return Err(ConfigError::Invalid(format!(
                "credentials[{index}].scope '{scope}' is not a valid identity path"
            )));
        }
        match (&self.password, &self.password_env) {
            (Some(_), None) => Ok(()),
            (None, Some(var)) if !var.trim().is_empty() => Ok(()),
            (None, Some(_)) => Err(ConfigError::Invalid(format!(
                "credentials[{index}].password_env must be non-empty"
            ))),
            _ => Err(ConfigError::Invalid(format!(
                "credentials[{index}] must set exactly one of password or password_env"
            ))),
        }
    }

    /// Resolves the secret and builds a scoped credential.
    fn resolve(&self) -> Result<ScopedCredential, ConfigError> {
        let password = match (&self.password, &self.password_env) {
            (Some(password), _) => password.clone(),
            (None, Some(var)) => env::var(var.trim())
                .ok()
                .filter(|value| !value.is_empty())
                .ok_or_else(|| {
                    ConfigError::Invalid(format!(
                        "credential '{}' reads unset environment variable {}",
                        self.id.trim(),
                        var.trim()
                    ))
                })?,
            (None, None) => {
                return Err(ConfigError::Invalid(format!(
                    "credential '{}' has no password source",
                    self.id.trim()
                )));
            }
        };
        Ok(ScopedCredential {
            id: self.id.trim().to_string(),
            scope: self
                .normalized_scope()
                .and_then(IdentityPath::parse)
                .map(|scope| scope.as_str().to_string()),
            credential: UsernamePassword {
                username: self.username.trim().to_string(),
                password,
            },
        })
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates transport limits.
fn validate_http(http: &HttpTransportConfig) -> Result<(), ConfigError> {
    if !(MIN_HTTP_TIMEOUT_MS ..= MAX_HTTP_TIMEOUT_MS).contains(&http.timeout_ms) {
        return Err(ConfigError::Invalid(format!(
            "http.timeout_ms must be between {MIN_HTTP_TIMEOUT_MS} and {MAX_HTTP_TIMEOUT_MS}"
        )));
    }
    if http.max_response_bytes == 0 {
        return Err(ConfigError::Invalid("http.max_response_bytes must be positive".to_string()));
    }
    if http.user_agent.trim().is_empty() {
        return Err(ConfigError::Invalid("http.user_agent must be non-empty".to_string()));
    }
    Ok(())
}

/// Reads the config file, stopping once it exceeds the size limit.
fn read_config_bytes(path: &Path) -> Result<Vec<u8>, ConfigError> {
    let too_large = || ConfigError::Invalid("config file exceeds size limit".to_string());
    let file = File::open(path).map_err(|err| ConfigError::Io(err.to_string()))?;
    let size = file.metadata().map_err(|err| ConfigError::Io(err.to_string()))?.len();
    let limit = u64::try_from(MAX_CONFIG_FILE_SIZE).map_err(|_| too_large())?;
    if size > limit {
        return Err(too_large());
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|err| ConfigError::Io(err.to_string()))?;
    if bytes.len() > MAX_CONFIG_FILE_SIZE {
        return Err(too_large());
    }
    Ok(bytes)
}

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}
