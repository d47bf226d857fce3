//! Profile service.
//!
//! Produces a complete, defaulted profile for an email and persists edits,
//! preferring the remote document store and degrading to the local cache.
//! Persistence is offline-first: the local write-through completes before
//! any remote attempt, so data entry never blocks on connectivity.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use prepsync_common::{AppError, AppResult, Config, RemoteReason, SyncTimestamp};
use prepsync_store::entities::{ProfileEdits, UserProfile};
use prepsync_store::{
    DocumentStore, FileCache, LocalCache, MemoryCache, ProfileRepository, RestDocumentStore,
    normalize_email, read_json_map, write_json_map,
};
use tracing::{debug, warn};
use validator::Validate;

use crate::services::Source;

/// Result of [`ProfileService::load`].
#[derive(Debug, Clone)]
pub struct ProfileLoad {
    /// The reconciled profile, fully defaulted.
    pub profile: UserProfile,
    /// Where the profile came from.
    pub source: Source,
    /// `true` when the remote store was not consulted or failed.
    pub remote_unavailable: bool,
    /// Why the remote store was not used, when relevant.
    pub remote_reason: Option<RemoteReason>,
    /// Display form of the remote error, when one occurred.
    pub error: Option<String>,
}

/// Result of [`ProfileService::save`].
#[derive(Debug, Clone)]
pub struct ProfileSave {
    /// The saved profile; identical whether or not the remote write
    /// succeeded, only the flags below differ.
    pub profile: UserProfile,
    /// `Remote` when the remote merge-write succeeded, `Local` otherwise.
    pub source: Source,
    /// `true` when the remote store was not consulted or failed.
    pub remote_unavailable: bool,
    /// Why the remote store was not used, when relevant.
    pub remote_reason: Option<RemoteReason>,
    /// Display form of the remote error, when one occurred.
    pub error: Option<String>,
}

/// Profile store with offline-first reconciliation.
///
/// Unlike [`ProgressService`](crate::services::ProgressService) this
/// service keeps no failure backoff: after a permission denial the very
/// next call retries the remote store. Profiles change rarely, so the
/// retry cost stays low.
pub struct ProfileService {
    repo: Option<ProfileRepository>,
    cache: Arc<dyn LocalCache>,
    profiles_key: String,
    complete_key: String,
    warned_remote_failure: AtomicBool,
}

impl ProfileService {
    /// Create a profile service. `repo` is `None` when the remote store is
    /// not configured; every operation then short-circuits to the cache.
    #[must_use]
    pub fn new(
        repo: Option<ProfileRepository>,
        cache: Arc<dyn LocalCache>,
        namespace: &str,
    ) -> Self {
        Self {
            repo,
            cache,
            profiles_key: format!("{namespace}:profiles"),
            complete_key: format!("{namespace}:profileComplete"),
            warned_remote_failure: AtomicBool::new(false),
        }
    }

    /// Assemble a service from configuration.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let repo = RestDocumentStore::from_config(&config.remote)?
            .map(|store| ProfileRepository::new(Arc::new(store) as Arc<dyn DocumentStore>));
        let cache: Arc<dyn LocalCache> = match &config.cache.dir {
            Some(dir) => Arc::new(FileCache::new(dir)?),
            None => Arc::new(MemoryCache::new()),
        };
        Ok(Self::new(repo, cache, &config.cache.namespace))
    }

    /// Load the profile for `email`.
    ///
    /// Always yields a fully-defaulted profile and never fails: remote
    /// errors are captured into the outcome flags. A missing or empty
    /// email is tolerated and yields the defaulted profile without a
    /// remote attempt.
    pub async fn load(&self, email: Option<&str>) -> ProfileLoad {
        let key = email.map(normalize_email).filter(|k| !k.is_empty());

        let mut profiles: HashMap<String, UserProfile> =
            read_json_map(self.cache.as_ref(), &self.profiles_key);
        let (local_profile, had_local) = match &key {
            Some(k) => match profiles.get(k) {
                Some(found) => (found.clone(), true),
                None => (UserProfile::defaulted(k), false),
            },
            None => (UserProfile::default(), false),
        };
        let local_source = if had_local { Source::Local } else { Source::Default };

        let Some(key) = key else {
            return ProfileLoad {
                profile: local_profile,
                source: local_source,
                remote_unavailable: true,
                remote_reason: None,
                error: None,
            };
        };
        let Some(repo) = &self.repo else {
            return ProfileLoad {
                profile: local_profile,
                source: local_source,
                remote_unavailable: true,
                remote_reason: Some(RemoteReason::NotConfigured),
                error: None,
            };
        };

        match repo.find_by_email(&key).await {
            Ok(Some(mut remote_profile)) => {
                if remote_profile.email.is_empty() {
                    remote_profile.email = key.clone();
                }
                profiles.insert(key.clone(), remote_profile.clone());
                self.write_profiles(&profiles);
                self.set_complete_flag(&key, remote_profile.is_profile_complete);
                ProfileLoad {
                    profile: remote_profile,
                    source: Source::Remote,
                    remote_unavailable: false,
                    remote_reason: None,
                    error: None,
                }
            }
            Ok(None) => {
                // No remote document: write the local snapshot back so a
                // wiped cache repopulates itself on the next read.
                profiles.insert(key, local_profile.clone());
                self.write_profiles(&profiles);
                ProfileLoad {
                    profile: local_profile,
                    source: local_source,
                    remote_unavailable: false,
                    remote_reason: None,
                    error: None,
                }
            }
            Err(e) => {
                self.note_remote_failure("load", &e);
                ProfileLoad {
                    profile: local_profile,
                    source: local_source,
                    remote_unavailable: true,
                    remote_reason: Some(e.remote_reason()),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Persist profile edits for `email`.
    ///
    /// The local write-through happens before any remote attempt, so the
    /// edit survives regardless of connectivity. An empty email is a
    /// caller contract violation and the only way this returns `Err`
    /// besides a local cache failure.
    pub async fn save(&self, email: &str, edits: &ProfileEdits) -> AppResult<ProfileSave> {
        let key = normalize_email(email);
        if key.is_empty() {
            return Err(AppError::Validation("email is required".to_string()));
        }
        edits.validate()?;

        let now = Utc::now();
        let mut profile = edits.merged_onto_defaults(&key);
        profile.is_profile_complete = true;
        profile.updated_at = Some(SyncTimestamp::pending_at(now));
        profile.last_synced_at = Some(SyncTimestamp::pending_at(now));

        let mut profiles: HashMap<String, UserProfile> =
            read_json_map(self.cache.as_ref(), &self.profiles_key);
        profiles.insert(key.clone(), profile.clone());
        write_json_map(self.cache.as_ref(), &self.profiles_key, &profiles)?;
        self.set_complete_flag(&key, true);

        let Some(repo) = &self.repo else {
            return Ok(ProfileSave {
                profile,
                source: Source::Local,
                remote_unavailable: true,
                remote_reason: Some(RemoteReason::NotConfigured),
                error: None,
            });
        };

        match repo.merge_profile(&key, &profile).await {
            Ok(()) => Ok(ProfileSave {
                profile,
                source: Source::Remote,
                remote_unavailable: false,
                remote_reason: None,
                error: None,
            }),
            Err(e) => {
                self.note_remote_failure("save", &e);
                Ok(ProfileSave {
                    profile,
                    source: Source::Local,
                    remote_unavailable: true,
                    remote_reason: Some(e.remote_reason()),
                    error: Some(e.to_string()),
                })
            }
        }
    }

    /// Whether the local complete-flag is set for `email`.
    #[must_use]
    pub fn is_complete(&self, email: &str) -> bool {
        let key = normalize_email(email);
        let flags: HashMap<String, bool> = read_json_map(self.cache.as_ref(), &self.complete_key);
        flags.get(&key).copied().unwrap_or(false)
    }

    /// Drop the local cache entries for `email`. Demo/test flows only;
    /// the remote document is left untouched.
    pub fn reset_local(&self, email: &str) -> AppResult<()> {
        let key = normalize_email(email);
        let mut profiles: HashMap<String, UserProfile> =
            read_json_map(self.cache.as_ref(), &self.profiles_key);
        profiles.remove(&key);
        write_json_map(self.cache.as_ref(), &self.profiles_key, &profiles)?;

        let mut flags: HashMap<String, bool> =
            read_json_map(self.cache.as_ref(), &self.complete_key);
        flags.remove(&key);
        write_json_map(self.cache.as_ref(), &self.complete_key, &flags)
    }

    fn write_profiles(&self, profiles: &HashMap<String, UserProfile>) {
        if let Err(e) = write_json_map(self.cache.as_ref(), &self.profiles_key, profiles) {
            warn!(error = %e, "Failed to write profile cache");
        }
    }

    fn set_complete_flag(&self, key: &str, complete: bool) {
        let mut flags: HashMap<String, bool> = read_json_map(self.cache.as_ref(), &self.complete_key);
        flags.insert(key.to_string(), complete);
        if let Err(e) = write_json_map(self.cache.as_ref(), &self.complete_key, &flags) {
            warn!(error = %e, "Failed to write profile-complete flag");
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
