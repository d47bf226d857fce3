//! End-to-end reconciliation flows across both services.
//!
//! Exercises the offline-first contract the UI relies on: a fresh user
//! loads defaults, edits survive remote outages, and a reachable remote
//! becomes the source of truth on the next read.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use prepsync_common::RemoteReason;
use prepsync_core::{ProblemRef, ProfileService, ProgressService, Source, Submission};
use prepsync_store::entities::{Difficulty, ProfileEdits};
use prepsync_store::test_utils::{InjectedFailure, MemoryDocumentStore};
use prepsync_store::{DocumentStore, MemoryCache, ProfileRepository, ProgressRepository};
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("prepsync=debug").try_init();
}

fn profile_service(store: &Arc<MemoryDocumentStore>) -> ProfileService {
    let repo = ProfileRepository::new(store.clone() as Arc<dyn DocumentStore>);
    ProfileService::new(Some(repo), Arc::new(MemoryCache::new()), "prepsync")
}

#[tokio::test]
async fn test_first_visit_edit_and_reload() {
    init_tracing();
    let store = Arc::new(MemoryDocumentStore::new());
    let service = profile_service(&store);

    // No prior local or remote data: defaults, keyed by the email
    let fresh = service.load(Some("a@x.com")).await;
    assert!(matches!(fresh.source, Source::Default | Source::Local));
    assert_eq!(fresh.profile.email, "a@x.com");
    assert_eq!(fresh.profile.full_name, "");
    assert!(!fresh.profile.is_profile_complete);

    // Save with the remote available
    let edits = ProfileEdits {
        full_name: Some("A B".to_string()),
        phone: Some("+1-555-0000".to_string()),
        ..ProfileEdits::default()
    };
    let saved = service.save("a@x.com", &edits).await.unwrap();
    assert_eq!(saved.source, Source::Remote);
    assert!(!saved.remote_unavailable);

    // Reload with the remote still available: remote-backed, edited values
    let reloaded = service.load(Some("a@x.com")).await;
    assert_eq!(reloaded.source, Source::Remote);
    assert_eq!(reloaded.profile.full_name, "A B");
    assert_eq!(reloaded.profile.phone, "+1-555-0000");
    assert!(reloaded.profile.is_profile_complete);

    // The server-assigned timestamp is still an unresolved placeholder on
    // the remote side; the caller sees a valid ISO instant flagged pending.
    let updated_at = reloaded.profile.updated_at.unwrap();
    assert!(updated_at.pending);
    assert!(updated_at.parse().is_some());
}

#[tokio::test]
async fn test_offline_edit_syncs_state_locally() {
    init_tracing();
    let store = Arc::new(MemoryDocumentStore::new());
    let service = profile_service(&store);

    store.fail_with(InjectedFailure::Unavailable);
    let saved = service
        .save(
            "a@x.com",
            &ProfileEdits {
                full_name: Some("A B".to_string()),
                ..ProfileEdits::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(saved.source, Source::Local);
    assert!(saved.remote_unavailable);

    // Still offline: the edit is served from the cache
    let offline = service.load(Some("a@x.com")).await;
    assert_eq!(offline.source, Source::Local);
    assert_eq!(offline.profile.full_name, "A B");
    assert_eq!(offline.remote_reason, Some(RemoteReason::Unknown));
}

#[tokio::test]
async fn test_profile_and_progress_are_independent_leaves() {
    init_tracing();
    let store = Arc::new(MemoryDocumentStore::new());
    let cache = Arc::new(MemoryCache::new());
    let profiles = ProfileService::new(
        Some(ProfileRepository::new(store.clone() as Arc<dyn DocumentStore>)),
        cache.clone(),
        "prepsync",
    );
    let progress = ProgressService::new(
        Some(ProgressRepository::new(store.clone() as Arc<dyn DocumentStore>)),
        cache,
        "prepsync",
    );

    profiles
        .save(
            "a@x.com",
            &ProfileEdits {
                uid: Some("user-1".to_string()),
                full_name: Some("A B".to_string()),
                ..ProfileEdits::default()
            },
        )
        .await
        .unwrap();

    let outcome = progress
        .record_submission(
            "user-1",
            &ProblemRef {
                id: "two-sum".to_string(),
                title: "Two Sum".to_string(),
                difficulty: Difficulty::Easy,
            },
            &Submission {
                language: "rust".to_string(),
                code: "fn main() {}".to_string(),
                results: json!({ "passed": 12, "total": 12 }),
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.source, Source::Remote);

    // Both documents exist remotely, under their own collections
    assert!(store.document("profiles", "a%40x.com").is_some());
    assert!(store.document("codingProgress", "user-1").is_some());

    // Resetting one store's local state leaves the other intact
    profiles.reset_local("a@x.com").unwrap();
    store.fail_with(InjectedFailure::Unavailable);
    let snapshot = progress.ensure("user-1").await.unwrap();
    assert_eq!(snapshot.progress.stats.problems_solved, 1);
    assert_eq!(snapshot.source, Source::Local);
}

#[tokio::test]
async fn test_permission_denial_only_slows_progress_not_profiles() {
    init_tracing();
    let store = Arc::new(MemoryDocumentStore::new());
    let cache = Arc::new(MemoryCache::new());
    let profiles = ProfileService::new(
        Some(ProfileRepository::new(store.clone() as Arc<dyn DocumentStore>)),
        cache.clone(),
        "prepsync",
    );
    let progress = ProgressService::new(
        Some(ProgressRepository::new(store.clone() as Arc<dyn DocumentStore>)),
        cache,
        "prepsync",
    );

    store.fail_with(InjectedFailure::PermissionDenied);

    progress.ensure("user-1").await.unwrap();
    let after_first_ensure = store.total_calls();
    progress.ensure("user-1").await.unwrap();
    // Progress backs off: the second ensure skips the remote round trip
    assert_eq!(store.total_calls(), after_first_ensure);

    profiles.load(Some("a@x.com")).await;
    profiles.load(Some("a@x.com")).await;
    // Profiles keep retrying: both loads reached the remote
    assert_eq!(store.total_calls(), after_first_ensure + 2);
}
