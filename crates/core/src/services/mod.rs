//! Store services implementing the reconciliation semantics.

pub mod profile;
pub mod progress;

pub use profile::{ProfileLoad, ProfileSave, ProfileService};
pub use progress::{
    ProblemRef, ProgressService, ProgressSnapshot, Submission, SubmissionOutcome,
};

use serde::Serialize;

/// Provenance of the data in an operation's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Served from the remote document store.
    Remote,
    /// Served from the local cache.
    Local,
    /// Neither store had a record; defaults were produced.
    Default,
}
