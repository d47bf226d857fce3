//! User profile repository.

use std::sync::Arc;

use prepsync_common::{AppResult, server_timestamp_sentinel};

use crate::entities::UserProfile;
use crate::remote::DocumentStore;
use crate::repositories::{encode_key, normalize_email};

/// Remote collection holding profile documents.
pub const PROFILE_COLLECTION: &str = "profiles";

/// User profile repository for remote document operations.
#[derive(Clone)]
pub struct ProfileRepository {
    store: Arc<dyn DocumentStore>,
}

impl ProfileRepository {
    /// Create a new profile repository.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Find a profile document by email.
    ///
    /// Whatever the document contains, the result is fully defaulted and
    /// its timestamps are normalized; a sparse document never surfaces
    /// missing fields.
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<UserProfile>> {
        let key = encode_key(&normalize_email(email));
        match self.store.get(PROFILE_COLLECTION, &key).await? {
            Some(doc) => {
                let profile: UserProfile = serde_json::from_value(doc)?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    /// Merge-write the full profile, with server-assigned timestamps.
    ///
    /// The payload carries every profile field; merge semantics still
    /// preserve any server-side fields the payload does not mention.
    pub async fn merge_profile(&self, email: &str, profile: &UserProfile) -> AppResult<()> {
        let key = encode_key(&normalize_email(email));
        let mut payload = serde_json::to_value(profile)?;
        payload["updatedAt"] = server_timestamp_sentinel();
        payload["lastSyncedAt"] = server_timestamp_sentinel();
        self.store.merge(PROFILE_COLLECTION, &key, &payload).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::MemoryDocumentStore;
    use prepsync_common::SERVER_TIMESTAMP_FIELD;
    use serde_json::json;

    #[tokio::test]
    async fn test_find_by_email_normalizes_key_and_defaults() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.insert(
            PROFILE_COLLECTION,
            "a%40x.com",
            json!({ "email": "a@x.com", "fullName": "A B" }),
        );

        let repo = ProfileRepository::new(store);
        let profile = repo.find_by_email("  A@X.com ").await.unwrap().unwrap();

        assert_eq!(profile.full_name, "A B");
        assert_eq!(profile.username, "");
        assert_eq!(profile.address.city, "");
    }

    #[tokio::test]
    async fn test_find_by_email_missing_document() {
        let repo = ProfileRepository::new(Arc::new(MemoryDocumentStore::new()));
        assert!(repo.find_by_email("a@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_merge_profile_writes_sentinel_timestamps() {
        let store = Arc::new(MemoryDocumentStore::new());
        let repo = ProfileRepository::new(store.clone());

        let mut profile = UserProfile::defaulted("a@x.com");
        profile.full_name = "A B".to_string();
        repo.merge_profile("a@x.com", &profile).await.unwrap();

        let doc = store.document(PROFILE_COLLECTION, "a%40x.com").unwrap();
        assert_eq!(doc["fullName"], "A B");
        assert_eq!(doc["updatedAt"][SERVER_TIMESTAMP_FIELD], true);
        assert_eq!(doc["lastSyncedAt"][SERVER_TIMESTAMP_FIELD], true);
    }

    #[tokio::test]
    async fn test_merge_preserves_unmentioned_server_fields() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.insert(
            PROFILE_COLLECTION,
            "a%40x.com",
            json!({ "email": "a@x.com", "serverManaged": "kept" }),
        );

        let repo = ProfileRepository::new(store.clone());
        repo.merge_profile("a@x.com", &UserProfile::defaulted("a@x.com"))
            .await
            .unwrap();

        let doc = store.document(PROFILE_COLLECTION, "a%40x.com").unwrap();
        assert_eq!(doc["serverManaged"], "kept");
        assert!(doc.get("fullName").is_some());
    }
}
