//! Host platform utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with resolving the software root.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("The software root environment variable (HERMES_SW_ROOT) is not set")]
    RootNotSet
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the software root directory from the `HERMES_SW_ROOT` environment
/// variable.
///
/// All parameter files and session directories are resolved relative to this
/// root.
pub fn get_hermes_sw_root() -> Result<PathBuf, HostError> {
    match std::env::var("HERMES_SW_ROOT") {
        Ok(p) => Ok(PathBuf::from(p)),
        Err(_) => Err(HostError::RootNotSet)
    }
}
