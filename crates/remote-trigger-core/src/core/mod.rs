// crates/remote-trigger-core/src/core/mod.rs
// ============================================================================
// Module: Remote Trigger Core Types
// Description: Data model for remote build triggers.
// Purpose: Group identifiers, auth, context, server, build state, and events.
// Dependencies: serde, thiserror, url
// ============================================================================

//! ## Overview
//! Core types are plain values. Nothing in this module performs network I/O;
//! the runtime module drives these types through the transport interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod auth;
pub mod build;
pub mod config;
pub mod context;
pub mod events;
pub mod identifiers;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use auth::AuthError;
pub use auth::AuthorizationProvider;
pub use build::BuildStateError;
pub use build::RemoteBuildInfo;
pub use build::RemoteBuildResult;
pub use build::RemoteBuildStatus;
pub use config::JobMetadata;
pub use config::RemoteBuildConfig;
pub use context::ContextError;
pub use context::ExecutionContext;
pub use events::JsonLinesListener;
pub use events::NoopListener;
pub use events::TriggerEvent;
pub use events::TriggerListener;
pub use identifiers::IdentityPath;
pub use identifiers::QueueId;
pub use server::ConfigError;
pub use server::RemoteServerDescriptor;
pub use server::effective_job_url;
pub use server::evaluate_effective_remote_host;
pub use server::generate_job_url;
pub use server::is_remote_url;
pub use server::remove_hash_parameters;
pub use server::remove_query_parameters;
pub use server::remove_trailing_slashes;
