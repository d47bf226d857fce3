//! Remote keyed document store.
//!
//! The remote collaborator is a document database addressed as
//! `{base_url}/{collection}/{key}` with three operations: fetch, overwrite
//! and merge-update (fields absent from a merge patch are preserved
//! server-side). Every failure is classified into the application error
//! taxonomy here so callers never touch the HTTP client's error types.

use std::time::Duration;

use async_trait::async_trait;
use prepsync_common::{AppError, AppResult, RemoteConfig};
use reqwest::{Response, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// A keyed document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, `None` when it does not exist.
    async fn get(&self, collection: &str, key: &str) -> AppResult<Option<Value>>;

    /// Create or overwrite a document.
    async fn put(&self, collection: &str, key: &str, doc: &Value) -> AppResult<()>;

    /// Merge-update a document; fields absent from `patch` are preserved.
    async fn merge(&self, collection: &str, key: &str, patch: &Value) -> AppResult<()>;
}

/// REST-backed document store client.
pub struct RestDocumentStore {
    client: reqwest::Client,
    base: Url,
    api_key: Option<String>,
}

impl RestDocumentStore {
    /// Build a client from configuration.
    ///
    /// Returns `Ok(None)` when no base URL is configured: the process then
    /// runs local-only and callers must not attempt remote access at all.
    pub fn from_config(config: &RemoteConfig) -> AppResult<Option<Self>> {
        if !config.is_configured() {
            return Ok(None);
        }
        let raw = config
            .base_url
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_string();
        // Url::join drops the last path segment unless the base ends in '/'
        let raw = if raw.ends_with('/') { raw } else { format!("{raw}/") };
        let base =
            Url::parse(&raw).map_err(|e| AppError::Config(format!("invalid remote URL: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Some(Self {
            client,
            base,
            api_key: config.api_key.clone(),
        }))
    }

    fn document_url(&self, collection: &str, key: &str) -> AppResult<Url> {
        self.base
            .join(&format!("{collection}/{key}"))
            .map_err(|e| AppError::Internal(format!("invalid document path: {e}")))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    fn classify_failure(op: &str, collection: &str, key: &str, status: StatusCode) -> AppError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                AppError::PermissionDenied(format!("{op} {collection}/{key}"))
            }
            StatusCode::NOT_FOUND => AppError::NotFound(format!("{collection}/{key}")),
            status => {
                AppError::RemoteUnavailable(format!("{op} {collection}/{key}: status {status}"))
            }
        }
    }

    fn transport_error(op: &str, collection: &str, key: &str, e: &reqwest::Error) -> AppError {
        AppError::RemoteUnavailable(format!("{op} {collection}/{key}: {e}"))
    }

    fn check_write(op: &str, collection: &str, key: &str, response: &Response) -> AppResult<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::classify_failure(op, collection, key, status))
        }
    }
}

#[async_trait]
impl DocumentStore for RestDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> AppResult<Option<Value>> {
        let url = self.document_url(collection, key)?;
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| Self::transport_error("get", collection, key, &e))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(collection = %collection, key = %key, "Remote document missing");
                Ok(None)
            }
            status if status.is_success() => {
                let doc = response
                    .json::<Value>()
                    .await
                    .map_err(|e| Self::transport_error("get", collection, key, &e))?;
                Ok(Some(doc))
            }
            status => Err(Self::classify_failure("get", collection, key, status)),
        }
    }

    async fn put(&self, collection: &str, key: &str, doc: &Value) -> AppResult<()> {
        let url = self.document_url(collection, key)?;
        let response = self
            .authorize(self.client.put(url))
            .json(doc)
            .send()
            .await
            .map_err(|e| Self::transport_error("put", collection, key, &e))?;
        Self::check_write("put", collection, key, &response)
    }

    async fn merge(&self, collection: &str, key: &str, patch: &Value) -> AppResult<()> {
        let url = self.document_url(collection, key)?;
        let response = self
            .authorize(self.client.patch(url))
            .json(patch)
            .send()
            .await
            .map_err(|e| Self::transport_error("merge", collection, key, &e))?;
        Self::check_write("merge", collection, key, &response)
    }
}
