//! Storage layer for prepsync.
//!
//! Holds the entity types, the synchronous local cache backends, the
//! asynchronous remote document-store client, and thin typed repositories
//! over the remote store. The reconciliation semantics live one layer up
//! in `prepsync-core`; everything here is mechanism.

pub mod entities;
pub mod local;
pub mod remote;
pub mod repositories;
pub mod test_utils;

pub use local::{FileCache, LocalCache, MemoryCache, read_json_map, write_json_map};
pub use remote::{DocumentStore, RestDocumentStore};
pub use repositories::{ProfileRepository, ProgressRepository, encode_key, normalize_email};
