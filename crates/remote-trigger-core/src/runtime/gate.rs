// crates/remote-trigger-core/src/runtime/gate.rs
// ============================================================================
// Module: Connection Gate
// Description: Bounded admission for concurrent outbound requests.
// Purpose: Cap in-flight requests across operations sharing an engine.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The gate keeps a single in-flight counter. Each request states its own
//! limit (the trigger's `max_connections`); admission waits while the counter
//! is at or above that limit. Permits release on drop.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::PoisonError;

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Shared in-flight request counter.
///
/// # Invariants
/// - The counter equals the number of live [`ConnectionPermit`] values.
#[derive(Debug, Default)]
pub struct ConnectionGate {
    /// Number of requests currently in flight.
    in_flight: Mutex<usize>,
    /// Signalled whenever a permit is released.
    released: Condvar,
}

impl ConnectionGate {
    /// Creates an idle gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until fewer than `limit` requests are in flight, then admits one.
    ///
    /// A `limit` of zero is treated as one.
    pub fn acquire(&self, limit: u32) -> ConnectionPermit<'_> {
        let limit = usize::try_from(limit.max(1)).unwrap_or(usize::MAX);
        let mut count = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        while *count >= limit {
            count = self.released.wait(count).unwrap_or_else(PoisonError::into_inner);
        }
        *count += 1;
        ConnectionPermit {
            gate: self,
        }
    }

    /// Returns the number of requests currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Releases one admission.
    fn release(&self) {
        let mut count = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        self.released.notify_all();
    }
}

/// Admission held for the duration of one request.
#[derive(Debug)]
pub struct ConnectionPermit<'a> {
    /// Gate to release on drop.
    gate: &'a ConnectionGate,
}

impl Drop for ConnectionPermit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
