//! Negative caching of remote failures.
//!
//! Once the remote store denies access for a user, retrying on every call
//! just burns a round trip on a request that will fail the same way. A
//! [`RemoteBackoff`] remembers the denial per user key and suppresses
//! remote attempts until the cool-down window has passed. The state is
//! owned by whichever service holds the instance, so independent services
//! (and test cases) never contaminate each other.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use prepsync_common::RemoteReason;
use tracing::debug;

/// Default cool-down after a remote permission failure: 5 minutes.
pub const DEFAULT_BACKOFF_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Per-key cool-down cache for remote failures.
#[derive(Debug)]
pub struct RemoteBackoff {
    window: Duration,
    entries: Mutex<HashMap<String, BackoffEntry>>,
}

#[derive(Debug, Clone, Copy)]
struct BackoffEntry {
    reason: RemoteReason,
    recorded_at: Instant,
}

impl RemoteBackoff {
    /// Create a backoff cache with a custom cool-down window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record a failure for `key`, starting its cool-down now.
    pub fn record(&self, key: &str, reason: RemoteReason) {
        if let Ok(mut entries) = self.entries.lock() {
            debug!(key = %key, reason = ?reason, "Suppressing remote attempts for cool-down window");
            entries.insert(
                key.to_string(),
                BackoffEntry {
                    reason,
                    recorded_at: Instant::now(),
                },
            );
        }
    }

    /// The cached failure reason for `key`, if its cool-down is still
    /// running. Expired entries are dropped on the way out.
    pub fn active_reason(&self, key: &str) -> Option<RemoteReason> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(entry) if entry.recorded_at.elapsed() < self.window => Some(entry.reason),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Forget any failure recorded for `key`.
    pub fn clear(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

impl Default for RemoteBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_clear() {
        let backoff = RemoteBackoff::default();
        assert!(backoff.active_reason("user-1").is_none());

        backoff.record("user-1", RemoteReason::PermissionDenied);
        assert_eq!(
            backoff.active_reason("user-1"),
            Some(RemoteReason::PermissionDenied)
        );
        // Other keys are unaffected
        assert!(backoff.active_reason("user-2").is_none());

        backoff.clear("user-1");
        assert!(backoff.active_reason("user-1").is_none());
    }

    #[test]
    fn test_entries_expire_after_window() {
        let backoff = RemoteBackoff::new(Duration::from_millis(20));
        backoff.record("user-1", RemoteReason::PermissionDenied);
        assert!(backoff.active_reason("user-1").is_some());

        std::thread::sleep(Duration::from_millis(30));
        assert!(backoff.active_reason("user-1").is_none());
    }

    #[test]
    fn test_rerecord_restarts_window() {
        let backoff = RemoteBackoff::new(Duration::from_millis(50));
        backoff.record("user-1", RemoteReason::Unknown);
        backoff.record("user-1", RemoteReason::PermissionDenied);
        assert_eq!(
            backoff.active_reason("user-1"),
            Some(RemoteReason::PermissionDenied)
        );
    }
}
