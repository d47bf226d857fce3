//! Portable timestamp handling.
//!
//! Remote documents carry timestamps in whatever shape the store produced:
//! an RFC 3339 string, a `{seconds, nanos}` epoch object, or the
//! server-timestamp placeholder a merge write leaves behind until the
//! server resolves it. Callers and the local cache only ever see
//! [`SyncTimestamp`], whose `iso` field is always a valid RFC 3339 string.
//! Placeholders are substituted with the client-observed time and flagged
//! `pending`, so freshly-rendered state never shows a null timestamp while
//! waiting for server confirmation.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

/// Wire name of the server-timestamp placeholder field.
pub const SERVER_TIMESTAMP_FIELD: &str = "__serverTimestamp";

/// The placeholder value written for server-assigned timestamp fields in
/// remote merge payloads.
#[must_use]
pub fn server_timestamp_sentinel() -> Value {
    json!({ SERVER_TIMESTAMP_FIELD: true })
}

/// A timestamp normalized to a portable representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncTimestamp {
    /// RFC 3339 rendering of the instant.
    pub iso: String,
    /// `true` while the value stands in for a server-assigned timestamp
    /// that the server has not confirmed yet.
    pub pending: bool,
}

/// The shapes a timestamp may take on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    /// Our own portable form, round-tripped through the local cache.
    Normalized {
        iso: String,
        #[serde(default)]
        pending: bool,
    },
    /// An epoch object exposing a convert-to-date capability.
    Epoch {
        seconds: i64,
        #[serde(default)]
        nanos: u32,
    },
    /// The unresolved server-timestamp placeholder.
    Placeholder {
        #[serde(rename = "__serverTimestamp")]
        server_assigned: bool,
    },
    /// A plain RFC 3339 string.
    Iso(String),
}

impl SyncTimestamp {
    /// A resolved timestamp for the given instant.
    #[must_use]
    pub fn resolved(at: DateTime<Utc>) -> Self {
        Self {
            iso: render_iso(at),
            pending: false,
        }
    }

    /// A pending stand-in for a server-assigned timestamp, carrying the
    /// client-observed instant.
    #[must_use]
    pub fn pending_at(at: DateTime<Utc>) -> Self {
        Self {
            iso: render_iso(at),
            pending: true,
        }
    }

    /// Parse the ISO rendering back into a `DateTime`.
    #[must_use]
    pub fn parse(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.iso)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    fn from_raw(raw: RawTimestamp, observed: DateTime<Utc>) -> Self {
        match raw {
            RawTimestamp::Normalized { iso, pending } => {
                if DateTime::parse_from_rfc3339(&iso).is_ok() {
                    Self { iso, pending }
                } else {
                    Self::resolved(observed)
                }
            }
            RawTimestamp::Epoch { seconds, nanos } => match Utc.timestamp_opt(seconds, nanos) {
                chrono::LocalResult::Single(t) => Self::resolved(t),
                _ => Self::resolved(observed),
            },
            RawTimestamp::Placeholder { .. } => Self::pending_at(observed),
            RawTimestamp::Iso(s) => match DateTime::parse_from_rfc3339(&s) {
                Ok(t) => Self::resolved(t.with_timezone(&Utc)),
                Err(_) => Self::resolved(observed),
            },
        }
    }
}

impl<'de> Deserialize<'de> for SyncTimestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawTimestamp::deserialize(deserializer)?;
        Ok(Self::from_raw(raw, Utc::now()))
    }
}

fn render_iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn observed() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_iso_string_is_resolved() {
        let ts: SyncTimestamp = serde_json::from_value(json!("2024-03-01T08:00:00Z")).unwrap();
        assert!(!ts.pending);
        assert_eq!(ts.iso, "2024-03-01T08:00:00.000Z");
        assert!(ts.parse().is_some());
    }

    #[test]
    fn test_epoch_object_is_converted() {
        let ts: SyncTimestamp =
            serde_json::from_value(json!({ "seconds": 1_709_280_000, "nanos": 0 })).unwrap();
        assert!(!ts.pending);
        assert_eq!(ts.iso, "2024-03-01T08:00:00.000Z");
    }

    #[test]
    fn test_placeholder_substitutes_observed_time() {
        let raw: RawTimestamp = serde_json::from_value(server_timestamp_sentinel()).unwrap();
        let ts = SyncTimestamp::from_raw(raw, observed());
        assert!(ts.pending);
        assert_eq!(ts.iso, "2024-05-17T12:30:00.000Z");
    }

    #[test]
    fn test_normalized_form_round_trips() {
        let original = SyncTimestamp::pending_at(observed());
        let json = serde_json::to_value(&original).unwrap();
        let back: SyncTimestamp = serde_json::from_value(json).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_garbage_string_falls_back_to_observed() {
        let raw: RawTimestamp = serde_json::from_value(json!("not-a-timestamp")).unwrap();
        let ts = SyncTimestamp::from_raw(raw, observed());
        assert!(!ts.pending);
        assert_eq!(ts.iso, "2024-05-17T12:30:00.000Z");
    }

    #[test]
    fn test_parse_round_trip() {
        let ts = SyncTimestamp::resolved(observed());
        assert_eq!(ts.parse().unwrap(), observed());
    }
}
