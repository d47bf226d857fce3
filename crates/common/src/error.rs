//! Error types for prepsync.

use serde::Serialize;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
///
/// Only [`AppError::Validation`] (a caller contract violation) is ever
/// returned as `Err` from the public store operations; every remote-store
/// failure is caught by the services and folded into the outcome flags.
#[derive(Debug, Error)]
pub enum AppError {
    // === Contract violations ===
    #[error("Validation error: {0}")]
    Validation(String),

    // === Remote store failures ===
    #[error("Remote store not configured")]
    NotConfigured,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // === Local failures ===
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Caller-facing classification of why the remote store was not used.
///
/// Callers render connectivity indicators from this value; they never see
/// the underlying client's error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemoteReason {
    /// Remote credentials absent; permanent for the process lifetime.
    NotConfigured,
    /// The remote store rejected the operation.
    PermissionDenied,
    /// Anything else (transport failures, server errors).
    Unknown,
}

impl AppError {
    /// Classify this error for the caller-facing outcome flags.
    #[must_use]
    pub const fn remote_reason(&self) -> RemoteReason {
        match self {
            Self::NotConfigured => RemoteReason::NotConfigured,
            Self::PermissionDenied(_) => RemoteReason::PermissionDenied,
            _ => RemoteReason::Unknown,
        }
    }

    /// Returns whether this error is a remote permission denial.
    #[must_use]
    pub const fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }

    /// Returns whether this error is a caller contract violation, the only
    /// class that propagates out of the store operations.
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::RemoteUnavailable(err.to_string())
    }
}
