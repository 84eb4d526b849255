pub mod classify;
pub mod elaborate;
pub mod slice;
pub mod tool;

pub use classify::LogCounts;
pub use elaborate::{ElaborateJob, Verdict};
pub use slice::{SliceJob, SliceOutcome};

/// Errors from external-tool execution.
#[derive(Debug, thiserror::Error)]
pub enum QuarryError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}
