// crates/remote-trigger-core/src/lib.rs
// ============================================================================
// Module: Remote Trigger Core Library
// Description: Remote build triggering, state tracking, and resumable handles.
// Purpose: Provide the transport-agnostic engine behind remote job triggers.
// Dependencies: serde, serde_json, thiserror, url, base64
// ============================================================================

//! ## Overview
//! Remote Trigger Core submits jobs to a remote build server, follows them
//! from the queue to completion, and exposes the outcome through a
//! serializable [`Handle`] that can be refreshed long after the triggering
//! call returned.
//!
//! The crate never opens sockets itself. Outbound HTTP goes through the
//! [`RemoteTransport`] capability, named servers come from a [`ServerLookup`],
//! and scoped credentials come from a [`CredentialStore`].
//!
//! Invariants:
//! - [`RemoteBuildInfo`] only moves forward through [`RemoteBuildStatus`].
//! - Server and identity resolution fail before any request is sent.
//! - A [`Handle`] holds plain values only and survives serialization.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::AuthError;
pub use crate::core::AuthorizationProvider;
pub use crate::core::BuildStateError;
pub use crate::core::ConfigError;
pub use crate::core::ContextError;
pub use crate::core::ExecutionContext;
pub use crate::core::IdentityPath;
pub use crate::core::JobMetadata;
pub use crate::core::JsonLinesListener;
pub use crate::core::NoopListener;
pub use crate::core::QueueId;
pub use crate::core::RemoteBuildConfig;
pub use crate::core::RemoteBuildInfo;
pub use crate::core::RemoteBuildResult;
pub use crate::core::RemoteBuildStatus;
pub use crate::core::RemoteServerDescriptor;
pub use crate::core::TriggerEvent;
pub use crate::core::TriggerListener;
pub use crate::core::effective_job_url;
pub use crate::core::evaluate_effective_remote_host;
pub use crate::core::generate_job_url;
pub use crate::interfaces::CredentialStore;
pub use crate::interfaces::HttpMethod;
pub use crate::interfaces::HttpRequest;
pub use crate::interfaces::HttpResponse;
pub use crate::interfaces::InMemoryCredentialStore;
pub use crate::interfaces::RemoteTransport;
pub use crate::interfaces::ScopedCredential;
pub use crate::interfaces::ServerLookup;
pub use crate::interfaces::StaticServerLookup;
pub use crate::interfaces::TransportError;
pub use crate::interfaces::UsernamePassword;
pub use crate::runtime::CancelToken;
pub use crate::runtime::ConnectionGate;
pub use crate::runtime::Handle;
pub use crate::runtime::RemoteTrigger;
pub use crate::runtime::RemoteTriggerBuilder;
pub use crate::runtime::TriggerError;
