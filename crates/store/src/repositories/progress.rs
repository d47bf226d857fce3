//! Coding progress repository.

use std::collections::BTreeMap;
use std::sync::Arc;

use prepsync_common::{AppResult, server_timestamp_sentinel};
use serde_json::json;

use crate::entities::{CodingProgress, ProgressStats, SolvedProblem};
use crate::remote::DocumentStore;
use crate::repositories::encode_key;

/// Remote collection holding progress documents.
pub const PROGRESS_COLLECTION: &str = "codingProgress";

/// Coding progress repository for remote document operations.
#[derive(Clone)]
pub struct ProgressRepository {
    store: Arc<dyn DocumentStore>,
}

impl ProgressRepository {
    /// Create a new progress repository.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Find a progress document by user id.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Option<CodingProgress>> {
        let key = encode_key(user_id);
        match self.store.get(PROGRESS_COLLECTION, &key).await? {
            Some(doc) => {
                let progress: CodingProgress = serde_json::from_value(doc)?;
                Ok(Some(progress))
            }
            None => Ok(None),
        }
    }

    /// Create the empty default document for a user.
    pub async fn create_empty(&self, user_id: &str) -> AppResult<()> {
        let key = encode_key(user_id);
        let mut doc = serde_json::to_value(CodingProgress::default())?;
        doc["lastUpdatedAt"] = server_timestamp_sentinel();
        self.store.put(PROGRESS_COLLECTION, &key, &doc).await
    }

    /// Merge-write the latest stats and ledger.
    ///
    /// `stats` and `solvedProblems` are replaced wholesale; any other
    /// server-side fields are preserved by the merge semantics.
    pub async fn merge_update(
        &self,
        user_id: &str,
        stats: ProgressStats,
        solved_problems: &BTreeMap<String, SolvedProblem>,
    ) -> AppResult<()> {
        let key = encode_key(user_id);
        let patch = json!({
            "stats": stats,
            "solvedProblems": solved_problems,
            "lastUpdatedAt": server_timestamp_sentinel(),
        });
        self.store.merge(PROGRESS_COLLECTION, &key, &patch).await
    }
}
