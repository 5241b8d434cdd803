// crates/remote-trigger-core/src/core/auth.rs
// ============================================================================
// Module: Remote Trigger Authorization
// Description: Authorization strategies applied to outbound requests.
// Purpose: Set or actively clear the Authorization header per trigger.
// Dependencies: base64, serde, thiserror
// ============================================================================

//! ## Overview
//! [`AuthorizationProvider`] is a closed set of strategies. Each strategy owns
//! only its credential fields and is applied to every outbound request of a
//! trigger. `NoAuth` removes any existing header so a value left over from a
//! shared request template never leaks to the remote server.
//!
//! Security posture: tokens and passwords are redacted from `Debug` and from
//! [`AuthorizationProvider::describe`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::context::ExecutionContext;
use crate::core::identifiers::IdentityPath;
use crate::interfaces::CredentialStore;
use crate::interfaces::HttpRequest;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Name of the HTTP authorization header.
pub const AUTHORIZATION_HEADER: &str = "authorization";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Authorization failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Messages never include secrets.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Referenced credential is not visible from the identity's scope.
    #[error("credentials with id '{credential_id}' not found for '{identity}'")]
    CredentialNotFound {
        /// Credential identifier that was requested.
        credential_id: String,
        /// Identity path used for scoping.
        identity: String,
    },
    /// Remote server rejected the supplied authorization.
    #[error("remote server rejected authorization ({status}) for {url}")]
    Rejected {
        /// HTTP status returned by the remote server.
        status: u16,
        /// Request URL.
        url: String,
    },
}

// ============================================================================
// SECTION: Provider
// ============================================================================

/// Authorization strategy for requests to a remote server.
///
/// # Invariants
/// - Applying any variant leaves at most one `Authorization` header.
/// - `NoAuth` always leaves no `Authorization` header.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthorizationProvider {
    /// Anonymous requests.
    #[default]
    #[serde(rename = "none")]
    NoAuth,
    /// HTTP Basic with a username and API token.
    #[serde(rename = "user_token")]
    UserTokenAuth {
        /// Remote account name.
        username: String,
        /// API token for the account.
        token: String,
    },
    /// HTTP Basic with credentials looked up in a [`CredentialStore`].
    #[serde(rename = "credentials")]
    CredentialAuth {
        /// Identifier of the credential to look up.
        credential_id: String,
    },
}

impl AuthorizationProvider {
    /// Sets or clears the authorization header on `request`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::CredentialNotFound`] when a referenced credential
    /// is not visible from the context's identity path.
    pub fn apply(
        &self,
        request: &mut HttpRequest,
        context: &ExecutionContext<'_>,
        credentials: &dyn CredentialStore,
    ) -> Result<(), AuthError> {
        match self {
            Self::NoAuth => {
                request.remove_header(AUTHORIZATION_HEADER);
            }
            Self::UserTokenAuth {
                username,
                token,
            } => {
                request.set_header(AUTHORIZATION_HEADER, basic_header(username, token));
            }
            Self::CredentialAuth {
                credential_id,
            } => {
                // Clear first so a failed lookup never leaves a stale header behind.
                request.remove_header(AUTHORIZATION_HEADER);
                let found = credentials.find(credential_id, context.identity()).ok_or_else(|| {
                    AuthError::CredentialNotFound {
                        credential_id: credential_id.clone(),
                        identity: context.identity().to_string(),
                    }
                })?;
                request.set_header(
                    AUTHORIZATION_HEADER,
                    basic_header(&found.username, &found.password),
                );
            }
        }
        Ok(())
    }

    /// Returns a credential-free description of the strategy.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::NoAuth => "no authentication".to_string(),
            Self::UserTokenAuth {
                username, ..
            } => format!("'Username + API Token' as user '{username}'"),
            Self::CredentialAuth {
                credential_id,
            } => format!("'Credentials Authentication' with id '{credential_id}'"),
        }
    }

    /// Returns a description that also names the resolved account.
    ///
    /// Credentials bound to the identity's folders are only visible when the
    /// identity is supplied; lookups never reveal the secret.
    #[must_use]
    pub fn describe_for(&self, identity: &IdentityPath, credentials: &dyn CredentialStore) -> String {
        match self {
            Self::CredentialAuth {
                credential_id,
            } => match credentials.find(credential_id, identity) {
                Some(found) => format!(
                    "'Credentials Authentication' as user '{}' (Credentials ID '{credential_id}')",
                    found.username
                ),
                None => format!(
                    "'Credentials Authentication' with id '{credential_id}' (not found for '{identity}')"
                ),
            },
            _ => self.describe(),
        }
    }
}

impl fmt::Debug for AuthorizationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAuth => f.write_str("NoAuth"),
            Self::UserTokenAuth {
                username, ..
            } => f
                .debug_struct("UserTokenAuth")
                .field("username", username)
                .field("token", &"<redacted>")
                .finish(),
            Self::CredentialAuth {
                credential_id,
            } => f.debug_struct("CredentialAuth").field("credential_id", credential_id).finish(),
        }
    }
}

impl fmt::Display for AuthorizationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds an HTTP Basic authorization value.
fn basic_header(username: &str, secret: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{username}:{secret}")))
}
