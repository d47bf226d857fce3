//! Coding progress entity (aggregate stats plus a solved-problems ledger).

use std::collections::BTreeMap;

use prepsync_common::SyncTimestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-user coding progress: aggregate counters plus one ledger entry per
/// attempted problem, keyed by problem id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CodingProgress {
    /// Aggregate counters, monotonically non-decreasing.
    pub stats: ProgressStats,
    /// Ledger of attempted problems, keyed by problem id.
    pub solved_problems: BTreeMap<String, SolvedProblem>,
    pub last_updated_at: Option<SyncTimestamp>,
}

/// Aggregate solve counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressStats {
    pub problems_solved: u32,
    pub easy_solved: u32,
    pub medium_solved: u32,
    pub hard_solved: u32,
}

/// One ledger entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SolvedProblem {
    pub status: ProblemStatus,
    pub problem_title: String,
    pub difficulty: Difficulty,
    pub language: String,
    pub last_submitted_at: Option<SyncTimestamp>,
    /// The submitted source, verbatim.
    pub code_snapshot: String,
    /// Free-form test-run payload from the judge.
    pub last_test_results: Value,
    /// Total submissions for this problem; only ever increments.
    pub attempts: u32,
}

/// Submission state of a ledger entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemStatus {
    /// Submitted but not yet passing.
    #[default]
    Attempted,
    /// Passed at least once; stats have counted it.
    Completed,
}

/// Problem difficulty tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl ProgressStats {
    /// Count a first-time solve of a problem at the given difficulty.
    pub fn record_solve(&mut self, difficulty: Difficulty) {
        self.problems_solved += 1;
        match difficulty {
            Difficulty::Easy => self.easy_solved += 1,
            Difficulty::Medium => self.medium_solved += 1,
            Difficulty::Hard => self.hard_solved += 1,
        }
    }
}

impl CodingProgress {
    /// Whether the ledger already marks this problem as completed.
    #[must_use]
    pub fn is_completed(&self, problem_id: &str) -> bool {
        self.solved_problems
            .get(problem_id)
            .is_some_and(|entry| entry.status == ProblemStatus::Completed)
    }
}
