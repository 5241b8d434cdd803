// crates/remote-trigger-core/src/runtime/mod.rs
// ============================================================================
// Module: Remote Trigger Runtime
// Description: Engine, handle, caches, and concurrency primitives.
// Purpose: Drive remote builds through the transport interfaces.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The runtime owns everything that talks to a remote server: the
//! [`RemoteTrigger`] engine, the resumable [`Handle`], the crumb and job
//! metadata caches, the [`ConnectionGate`], and cooperative cancellation via
//! [`CancelToken`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cache;
pub mod cancel;
pub mod engine;
pub mod error;
pub mod gate;
pub mod handle;
pub mod protocol;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cache::Crumb;
pub use cache::CrumbCache;
pub use cache::JobInfoCache;
pub use cancel::CancelToken;
pub use engine::RemoteTrigger;
pub use engine::RemoteTriggerBuilder;
pub use error::TriggerError;
pub use gate::ConnectionGate;
pub use gate::ConnectionPermit;
pub use handle::Handle;
