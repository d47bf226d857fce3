//! Thin typed repositories over the remote document store.

pub mod profile;
pub mod progress;

pub use profile::ProfileRepository;
pub use progress::ProgressRepository;

/// Normalize an email for use as a lookup key: trimmed and lower-cased.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Encode a raw key for use as a remote document path segment.
#[must_use]
pub fn encode_key(raw: &str) -> String {
    urlencoding::encode(raw.trim()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  A.Student@X.COM "), "a.student@x.com");
    }

    #[test]
    fn test_encode_key_escapes_reserved_characters() {
        assert_eq!(encode_key("a@x.com"), "a%40x.com");
        assert_eq!(encode_key(" user/7 "), "user%2F7");
    }
}
