//! Common utilities and shared types for prepsync.
//!
//! This crate provides foundational components used across all prepsync
//! crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Timestamps**: Portable timestamp normalization via [`SyncTimestamp`]
//!
//! # Example
//!
//! ```no_run
//! use prepsync_common::{AppResult, Config};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     if config.remote.is_configured() {
//!         println!("remote sync enabled");
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod timestamp;

pub use config::{CacheConfig, Config, RemoteConfig};
pub use error::{AppError, AppResult, RemoteReason};
pub use timestamp::{SERVER_TIMESTAMP_FIELD, SyncTimestamp, server_timestamp_sentinel};
