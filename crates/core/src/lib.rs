//! Core reconciliation logic for prepsync.
//!
//! The two store services live here: [`ProfileService`] for user profiles
//! and [`ProgressService`] for coding-practice progress. Both prefer the
//! remote document store and degrade to the local cache; the progress
//! service additionally backs off from a remote known to be denying
//! access. See `prepsync-store` for the backends they compose.

pub mod backoff;
pub mod services;

pub use backoff::{DEFAULT_BACKOFF_WINDOW, RemoteBackoff};
pub use services::*;
