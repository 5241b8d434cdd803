// crates/remote-trigger-config/src/lib.rs
// ============================================================================
// Module: Remote Trigger Config Library
// Description: Canonical config model for servers, credentials, and defaults.
// Purpose: Single source of truth for remote-trigger.toml semantics.
// Dependencies: remote-trigger-core, remote-trigger-http, serde, toml
// ============================================================================

//! ## Overview
//! `remote-trigger-config` loads the TOML file that names remote servers,
//! holds scoped credentials, and supplies trigger defaults. Loading is strict
//! and fails closed on oversized, non-UTF-8, or inconsistent input.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
