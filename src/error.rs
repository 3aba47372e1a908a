//! Error taxonomy for the supervision core.

use std::time::Duration;

/// Result type for supervisor operations
pub type Result<T> = std::result::Result<T, SupervisorError>;

/// Supervisor errors
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// A process with this identifier is already registered.
    #[error("process {id} is already registered")]
    Conflict {
        /// Identifier the caller tried to reuse.
        id: u32,
    },

    /// No registered process or captured output for this identifier.
    #[error("process {id} not found")]
    NotFound {
        /// Identifier the caller asked for.
        id: u32,
    },

    /// The OS refused to launch the external program.
    #[error("failed to spawn process {id}: {source}")]
    SpawnFailed {
        /// Identifier the spawn was requested for.
        id: u32,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The process did not reach OS-level termination within the deadline.
    /// Registry and log entries are left in place so the caller can retry.
    #[error("process {id} termination still pending after {timeout:?}")]
    TerminationPending {
        /// Identifier of the process that is still shutting down.
        id: u32,
        /// Deadline that expired.
        timeout: Duration,
    },

    /// Signal delivery or stream plumbing failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
