//! Batch runner: retries, outcome artifacts, the results journal, sweeps.

mod artifact;
mod journal;
mod retry;
mod supervisor;

pub use artifact::{
    artifact_path, audit_path, parse_artifact, render_artifact, render_audit, sha256_hex, write_atomic,
    ArtifactError, ParsedArtifact,
};
pub use journal::{Journal, JournalEntry, JournalError, RecordStatus};
pub use retry::{RetryPolicy, Retryable};
pub use supervisor::{BatchError, RecordReport, SweepSummary, Supervisor};
