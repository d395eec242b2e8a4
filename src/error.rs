//! Exit-code mapping per the tool's error taxonomy: argument parsing gets
//! its own exit code, every other failure (open, prepare, step, commit,
//! allocation) collapses to a single generic one. Nothing here is
//! recovered locally -- every error just propagates to `main`.

use thiserror::Error;

/// The one failure category that exits with a code other than 1.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ArgError(pub String);

/// Exit code `main` should use for an error that escaped every pass.
pub fn runtime_exit_code() -> i32 {
    1
}

/// Exit code for an [`ArgError`].
pub fn arg_exit_code() -> i32 {
    11
}
