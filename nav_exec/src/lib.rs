//! # Navigation Executable Library
//!
//! Closed-loop motion control for the rover: motion primitives, dead-reckoned
//! odometry, absolute position fixes, and the alignment routines which combine
//! them.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod cancel;
pub mod hw;
pub mod nav_ctrl;
pub mod odom;
pub mod registry;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error which aborts the currently running routine.
///
/// Recoverable conditions (movement timeouts, position fix faults) are carried
/// in ordinary return values and handled where they occur. `NavError` is
/// reserved for conditions which must unwind the whole routine.
#[derive(Debug, Error)]
pub enum NavError {
    /// The operator requested cancellation of the current routine.
    #[error("Routine cancelled by operator request")]
    Cancelled,

    /// A runtime assertion on the controller's state failed.
    #[error("Assertion failed at {location}: {message}")]
    AssertionFailed {
        location: &'static str,
        message: String,
    },
}

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

/// Result type used by all routines which can be aborted.
pub type NavResult<T> = Result<T, NavError>;

// ---------------------------------------------------------------------------
// MACROS
// ---------------------------------------------------------------------------

/// Assert a condition on the controller's state, returning
/// [`NavError::AssertionFailed`] from the enclosing function if it does not
/// hold.
#[macro_export]
macro_rules! nav_assert {
    ($cond:expr, $($arg:tt)+) => {
        if !($cond) {
            return Err($crate::NavError::AssertionFailed {
                location: concat!(file!(), ":", line!()),
                message: format!($($arg)+),
            });
        }
    };
}
