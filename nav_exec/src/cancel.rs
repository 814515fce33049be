//! Cooperative cancellation of navigation routines.
//!
//! The operator interface holds one half of a [`CancelToken`] and the
//! navigation controller polls the other half inside every wait loop, so a
//! cancellation request is observed within one control iteration.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{NavError, NavResult};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Shared flag requesting that the current routine stop.
///
/// Cloning the token produces another handle onto the same flag.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CancelToken {
    /// Create a new token with no cancellation pending.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Request cancellation of the routine polling this token.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear a pending request, allowing the token to be reused for the next
    /// routine.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Return `Err(NavError::Cancelled)` if cancellation has been requested.
    pub fn check(&self) -> NavResult<()> {
        if self.is_requested() {
            Err(NavError::Cancelled)
        }
        else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());

        let clone = token.clone();
        clone.request();
        assert!(token.is_requested());
        assert!(matches!(token.check(), Err(NavError::Cancelled)));

        token.reset();
        assert!(clone.check().is_ok());
    }
}
