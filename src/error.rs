use thiserror::Error;

/// Hard failures of a simulation run.
///
/// Everything else (cache miss, truncated phase, exhausted quantum) is an
/// expected outcome and recovered inside the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimError {
    /// The outer loop exceeded its iteration cap.
    #[error("simulation did not converge after {iterations} iterations")]
    Runaway { iterations: u32 },

    /// Eviction was attempted while every cold-segment buffer was in I/O.
    /// Indicates too few buffers for the offered concurrency.
    #[error("no buffer available for eviction: all cold-segment buffers are undergoing I/O")]
    NoEvictableBuffer,

    /// Processes are blocked but no disk interrupt is pending.
    #[error("blocked processes remain but no disk interrupt is pending")]
    Deadlock,
}
