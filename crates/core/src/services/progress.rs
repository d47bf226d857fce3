//! Coding progress service.
//!
//! Maintains per-user aggregate stats and a solved-problems ledger with
//! the same offline-first preference order as the profile service, plus a
//! failure backoff: once the remote store denies access for a user,
//! remote attempts for that user are skipped for a cool-down window
//! instead of retrying on every call.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use prepsync_common::{AppError, AppResult, Config, RemoteReason, SyncTimestamp};
use prepsync_store::entities::{CodingProgress, Difficulty, ProblemStatus};
use prepsync_store::{
    DocumentStore, FileCache, LocalCache, MemoryCache, ProgressRepository, RestDocumentStore,
    read_json_map, write_json_map,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::backoff::RemoteBackoff;
use crate::services::Source;

/// A problem being submitted against.
#[derive(Debug, Clone)]
pub struct ProblemRef {
    /// Problem id, the ledger key. Required.
    pub id: String,
    pub title: String,
    pub difficulty: Difficulty,
}

/// One successful submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub language: String,
    /// The submitted source, stored verbatim as the code snapshot.
    pub code: String,
    /// Free-form test-run payload from the judge.
    pub results: Value,
}

/// Result of [`ProgressService::ensure`].
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    /// The reconciled progress record, fully defaulted.
    pub progress: CodingProgress,
    /// Where the record came from.
    pub source: Source,
    /// `true` when this call created the remote document.
    pub created: bool,
    /// `true` when the remote store was not consulted or failed.
    pub remote_unavailable: bool,
    /// Why the remote store was not used, when relevant.
    pub remote_reason: Option<RemoteReason>,
    /// Display form of the remote error, when one occurred.
    pub error: Option<String>,
}

/// Result of [`ProgressService::record_submission`].
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    /// The updated progress record.
    pub progress: CodingProgress,
    /// `true` when this submission was the problem's first solve; the
    /// aggregate stats were bumped exactly then.
    pub newly_solved: bool,
    /// `Remote` when the remote merge-write succeeded, `Local` otherwise.
    pub source: Source,
    /// `true` when the remote store was not consulted or failed.
    pub remote_unavailable: bool,
    /// Why the remote store was not used, when relevant.
    pub remote_reason: Option<RemoteReason>,
    /// Display form of the remote error, when one occurred.
    pub error: Option<String>,
}

/// Coding progress store with offline-first reconciliation and failure
/// backoff.
pub struct ProgressService {
    repo: Option<ProgressRepository>,
    cache: Arc<dyn LocalCache>,
    progress_key: String,
    backoff: RemoteBackoff,
    warned_remote_failure: AtomicBool,
}

impl ProgressService {
    /// Create a progress service with the default 5-minute backoff window.
    #[must_use]
    pub fn new(
        repo: Option<ProgressRepository>,
        cache: Arc<dyn LocalCache>,
        namespace: &str,
    ) -> Self {
        Self {
            repo,
            cache,
            progress_key: format!("{namespace}:codingProgress"),
            backoff: RemoteBackoff::default(),
            warned_remote_failure: AtomicBool::new(false),
        }
    }

    /// Create a progress service with a custom backoff window.
    #[must_use]
    pub fn with_backoff_window(
        repo: Option<ProgressRepository>,
        cache: Arc<dyn LocalCache>,
        namespace: &str,
        window: Duration,
    ) -> Self {
        Self {
            backoff: RemoteBackoff::new(window),
            ..Self::new(repo, cache, namespace)
        }
    }

    /// Assemble a service from configuration.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let repo = RestDocumentStore::from_config(&config.remote)?
            .map(|store| ProgressRepository::new(Arc::new(store) as Arc<dyn DocumentStore>));
        let cache: Arc<dyn LocalCache> = match &config.cache.dir {
            Some(dir) => Arc::new(FileCache::new(dir)?),
            None => Arc::new(MemoryCache::new()),
        };
        Ok(Self::new(repo, cache, &config.cache.namespace))
    }

    /// Get-or-create the progress record for `user_id`.
    ///
    /// Within an active backoff window the remote store is not consulted
    /// at all and the local snapshot is returned with the cached failure
    /// reason. An empty `user_id` is a caller contract violation.
    pub async fn ensure(&self, user_id: &str) -> AppResult<ProgressSnapshot> {
        let key = required_key(user_id, "user id")?;

        let mut ledger: HashMap<String, CodingProgress> =
            read_json_map(self.cache.as_ref(), &self.progress_key);
        let (local, had_local) = match ledger.get(&key) {
            Some(found) => (found.clone(), true),
            None => (CodingProgress::default(), false),
        };
        let local_source = if had_local { Source::Local } else { Source::Default };

        if let Some(reason) = self.backoff.active_reason(&key) {
            return Ok(ProgressSnapshot {
                progress: local,
                source: local_source,
                created: false,
                remote_unavailable: true,
                remote_reason: Some(reason),
                error: None,
            });
        }
        let Some(repo) = &self.repo else {
            return Ok(ProgressSnapshot {
                progress: local,
                source: local_source,
                created: false,
                remote_unavailable: true,
                remote_reason: Some(RemoteReason::NotConfigured),
                error: None,
            });
        };

        match repo.find_by_user(&key).await {
            Ok(Some(remote)) => {
                ledger.insert(key.clone(), remote.clone());
                self.write_ledger(&ledger);
                self.backoff.clear(&key);
                Ok(ProgressSnapshot {
                    progress: remote,
                    source: Source::Remote,
                    created: false,
                    remote_unavailable: false,
                    remote_reason: None,
                    error: None,
                })
            }
            Ok(None) => {
                let empty = CodingProgress::default();
                // Fire-and-forget: the record is usable either way and the
                // next call recreates the document if this write was lost.
                if let Err(e) = repo.create_empty(&key).await {
                    debug!(user = %key, error = %e, "Failed to create empty progress document");
                }
                ledger.insert(key.clone(), empty.clone());
                self.write_ledger(&ledger);
                self.backoff.clear(&key);
                Ok(ProgressSnapshot {
                    progress: empty,
                    source: Source::Remote,
                    created: true,
                    remote_unavailable: false,
                    remote_reason: None,
                    error: None,
                })
            }
            Err(e) => {
                if e.is_permission_denied() {
                    self.backoff.record(&key, RemoteReason::PermissionDenied);
                }
                self.note_remote_failure("ensure", &e);
                Ok(ProgressSnapshot {
                    progress: local,
                    source: local_source,
                    created: false,
                    remote_unavailable: true,
                    remote_reason: Some(e.remote_reason()),
                    error: Some(e.to_string()),
                })
            }
        }
    }

    /// Record a successful submission.
    ///
    /// `attempts` always increments and the ledger entry is overwritten
    /// with the latest submission; the aggregate stats increment only when
    /// the problem was not already completed, so retrying a submission
    /// never double-counts a solve.
    pub async fn record_submission(
        &self,
        user_id: &str,
        problem: &ProblemRef,
        submission: &Submission,
    ) -> AppResult<SubmissionOutcome> {
        let key = required_key(user_id, "user id")?;
        let problem_id = required_key(&problem.id, "problem id")?;

        let mut ledger: HashMap<String, CodingProgress> =
            read_json_map(self.cache.as_ref(), &self.progress_key);
        let mut progress = ledger.get(&key).cloned().unwrap_or_default();

        // The completed check runs against whichever copy is authoritative
        // for this call: the remote record when reachable, the local one
        // otherwise. This is a read-modify-write without a transaction;
        // two concurrent submissions can race on the check. Accepted
        // weak-consistency property, kept as-is.
        let mut remote_usable = false;
        let mut remote_reason: Option<RemoteReason> = None;
        let mut remote_error: Option<String> = None;

        if let Some(reason) = self.backoff.active_reason(&key) {
            remote_reason = Some(reason);
        } else if let Some(repo) = &self.repo {
            match repo.find_by_user(&key).await {
                Ok(Some(remote)) => {
                    progress = remote;
                    remote_usable = true;
                }
                Ok(None) => {
                    remote_usable = true;
                }
                Err(e) => {
                    if e.is_permission_denied() {
                        self.backoff.record(&key, RemoteReason::PermissionDenied);
                    }
                    self.note_remote_failure("record_submission", &e);
                    remote_reason = Some(e.remote_reason());
                    remote_error = Some(e.to_string());
                }
            }
        } else {
            remote_reason = Some(RemoteReason::NotConfigured);
        }

        let now = Utc::now();
        let newly_solved = !progress.is_completed(&problem_id);
        if newly_solved {
            progress.stats.record_solve(problem.difficulty);
        }

        let entry = progress.solved_problems.entry(problem_id).or_default();
        entry.attempts += 1;
        entry.status = ProblemStatus::Completed;
        entry.problem_title = problem.title.clone();
        entry.difficulty = problem.difficulty;
        entry.language = submission.language.clone();
        entry.code_snapshot = submission.code.clone();
        entry.last_test_results = submission.results.clone();
        entry.last_submitted_at = Some(SyncTimestamp::resolved(now));
        progress.last_updated_at = Some(SyncTimestamp::pending_at(now));

        // Local durability first; the remote write is best-effort.
        ledger.insert(key.clone(), progress.clone());
        write_json_map(self.cache.as_ref(), &self.progress_key, &ledger)?;

        if remote_usable {
            if let Some(repo) = &self.repo {
                match repo
                    .merge_update(&key, progress.stats, &progress.solved_problems)
                    .await
                {
                    Ok(()) => {
                        return Ok(SubmissionOutcome {
                            progress,
                            newly_solved,
                            source: Source::Remote,
                            remote_unavailable: false,
                            remote_reason: None,
                            error: None,
                        });
                    }
                    Err(e) => {
                        if e.is_permission_denied() {
                            self.backoff.record(&key, RemoteReason::PermissionDenied);
                        }
                        self.note_remote_failure("record_submission", &e);
                        remote_reason = Some(e.remote_reason());
                        remote_error = Some(e.to_string());
                    }
                }
            }
        }

        Ok(SubmissionOutcome {
            progress,
            newly_solved,
            source: Source::Local,
            remote_unavailable: true,
            remote_reason,
            error: remote_error,
        })
    }

    /// Drop the local ledger entry for `user_id`. Demo/test flows only;
    /// the remote document is left untouched.
    pub fn reset_local(&self, user_id: &str) -> AppResult<()> {
        let key = required_key(user_id, "user id")?;
        let mut ledger: HashMap<String, CodingProgress> =
            read_json_map(self.cache.as_ref(), &self.progress_key);
        ledger.remove(&key);
        write_json_map(self.cache.as_ref(), &self.progress_key, &ledger)
    }

    fn write_ledger(&self, ledger: &HashMap<String, CodingProgress>) {
        if let Err(e) = write_json_map(self.cache.as_ref(), &self.progress_key, ledger) {
            warn!(error = %e, "Failed to write progress cache");
        }
    }

    fn note_remote_failure(&self, op: &str, err: &AppError) {
        if self.warned_remote_failure.swap(true, Ordering::Relaxed) {
            debug!(op = %op, error = %err, "Remote store unavailable, serving local cache");
        } else {
            warn!(op = %op, error = %err, "Remote store unavailable, serving local cache");
        }
    }
}

fn required_key(raw: &str, what: &str) -> AppResult<String> {
    let key = raw.trim();
    if key.is_empty() {
        return Err(AppError::Validation(format!("{what} is required")));
    }
    Ok(key.to_string())
}
