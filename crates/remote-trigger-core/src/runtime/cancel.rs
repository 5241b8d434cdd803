// crates/remote-trigger-core/src/runtime/cancel.rs
// ============================================================================
// Module: Cancellation Token
// Description: Cooperative, condvar-backed cancellation flag.
// Purpose: Let callers interrupt blocking waits without polling delays.
// Dependencies: std
// ============================================================================

//! ## Overview
//! A [`CancelToken`] is cloned into every party that may cancel or observe
//! cancellation. Cancelling wakes all threads sleeping in
//! [`CancelToken::wait_timeout`] immediately.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

// ============================================================================
// SECTION: Cancel Token
// ============================================================================

/// Shared cancellation flag.
///
/// # Invariants
/// - Once cancelled, a token stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    /// Flag and wake-up signal shared by all clones.
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    /// Creates an uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the token cancelled and wakes all waiters.
    pub fn cancel(&self) {
        let (flag, signal) = &*self.inner;
        let mut cancelled = flag.lock().unwrap_or_else(PoisonError::into_inner);
        *cancelled = true;
        signal.notify_all();
    }

    /// Returns true once [`CancelToken::cancel`] was called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        let (flag, _) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps up to `timeout`, returning early when cancelled.
    ///
    /// Returns true when the token is cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, signal) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut cancelled = flag.lock().unwrap_or_else(PoisonError::into_inner);
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let (guard, _) = signal
                .wait_timeout(cancelled, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            cancelled = guard;
        }
        *cancelled
    }
}
