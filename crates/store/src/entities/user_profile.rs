//! User profile entity.

use prepsync_common::SyncTimestamp;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A user profile document, keyed by normalized email.
///
/// Every field is always present: the struct derives `Default` and the
/// container-level `#[serde(default)]` fills anything a partial document
/// omits, so a caller never sees a missing field regardless of how sparse
/// the stored document was.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProfile {
    /// Normalized email, the document key.
    pub email: String,
    /// Authentication subject id.
    pub uid: String,
    pub full_name: String,
    pub username: String,
    pub phone: String,
    /// Date of birth (YYYY-MM-DD format)
    pub date_of_birth: String,
    pub gender: String,
    pub bio: String,
    pub website: String,
    pub occupation: String,
    pub education: String,
    pub company: String,
    /// Free-text skills summary.
    pub skills: String,
    pub profile_picture_url: String,
    /// Postal address, always present (empty-string defaults).
    pub address: Address,
    /// Social links, always present (empty-string defaults).
    pub social_media: SocialMedia,
    /// Set once the user has gone through the edit-profile flow.
    pub is_profile_complete: bool,
    pub updated_at: Option<SyncTimestamp>,
    pub last_synced_at: Option<SyncTimestamp>,
}

/// Postal address block of a profile.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// Social-media links block of a profile.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SocialMedia {
    pub instagram: String,
    pub linkedin: String,
    pub twitter: String,
    pub github: String,
}

impl UserProfile {
    /// A fully-defaulted profile for the given email.
    #[must_use]
    pub fn defaulted(email: &str) -> Self {
        Self {
            email: email.to_string(),
            ..Self::default()
        }
    }
}

/// Typed partial update for a profile.
///
/// Each field is optional; [`ProfileEdits::merged_onto_defaults`] merges the
/// edits field-by-field onto a defaulted profile, so every field's default
/// is enforced by the type system rather than by convention.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileEdits {
    pub uid: Option<String>,

    #[validate(length(max = 128))]
    pub full_name: Option<String>,

    #[validate(length(max = 64))]
    pub username: Option<String>,

    #[validate(length(max = 32))]
    pub phone: Option<String>,

    pub date_of_birth: Option<String>,
    pub gender: Option<String>,

    #[validate(length(max = 2048))]
    pub bio: Option<String>,

    #[validate(length(max = 512))]
    pub website: Option<String>,

    #[validate(length(max = 128))]
    pub occupation: Option<String>,

    #[validate(length(max = 256))]
    pub education: Option<String>,

    #[validate(length(max = 128))]
    pub company: Option<String>,

    #[validate(length(max = 1024))]
    pub skills: Option<String>,

    pub profile_picture_url: Option<String>,
    pub address: Option<AddressEdits>,
    pub social_media: Option<SocialMediaEdits>,
}

/// Typed partial update for the address block.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AddressEdits {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

/// Typed partial update for the social-media block.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SocialMediaEdits {
    pub instagram: Option<String>,
    pub linkedin: Option<String>,
    pub twitter: Option<String>,
    pub github: Option<String>,
}

impl ProfileEdits {
    /// Merge these edits onto a fully-defaulted profile for `email`.
    ///
    /// Fields the edit leaves out come back as their defaults; nested
    /// blocks are merged the same way so they are never partially omitted.
    #[must_use]
    pub fn merged_onto_defaults(&self, email: &str) -> UserProfile {
        let mut profile = UserProfile::defaulted(email);
        profile.uid = self.uid.clone().unwrap_or_default();
        profile.full_name = self.full_name.clone().unwrap_or_default();
        profile.username = self.username.clone().unwrap_or_default();
        profile.phone = self.phone.clone().unwrap_or_default();
        profile.date_of_birth = self.date_of_birth.clone().unwrap_or_default();
        profile.gender = self.gender.clone().unwrap_or_default();
        profile.bio = self.bio.clone().unwrap_or_default();
        profile.website = self.website.clone().unwrap_or_default();
        profile.occupation = self.occupation.clone().unwrap_or_default();
        profile.education = self.education.clone().unwrap_or_default();
        profile.company = self.company.clone().unwrap_or_default();
        profile.skills = self.skills.clone().unwrap_or_default();
        profile.profile_picture_url = self.profile_picture_url.clone().unwrap_or_default();
        profile.address = self.address.as_ref().map(AddressEdits::merged).unwrap_or_default();
        profile.social_media = self
            .social_media
            .as_ref()
            .map(SocialMediaEdits::merged)
            .unwrap_or_default();
        profile
    }
}

impl AddressEdits {
    fn merged(&self) -> Address {
        Address {
            street: self.street.clone().unwrap_or_default(),
            city: self.city.clone().unwrap_or_default(),
            state: self.state.clone().unwrap_or_default(),
            zip_code: self.zip_code.clone().unwrap_or_default(),
        }
    }
}

impl SocialMediaEdits {
    fn merged(&self) -> SocialMedia {
        SocialMedia {
            instagram: self.instagram.clone().unwrap_or_default(),
            linkedin: self.linkedin.clone().unwrap_or_default(),
            twitter: self.twitter.clone().unwrap_or_default(),
            github: self.github.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_document_deserializes_fully_defaulted() {
        let profile: UserProfile =
            serde_json::from_value(json!({ "email": "a@x.com", "fullName": "A B" })).unwrap();

        assert_eq!(profile.email, "a@x.com");
        assert_eq!(profile.full_name, "A B");
        assert_eq!(profile.username, "");
        assert_eq!(profile.address.city, "");
        assert_eq!(profile.social_media.github, "");
        assert!(!profile.is_profile_complete);
        assert!(profile.updated_at.is_none());
    }

    #[test]
    fn test_empty_document_deserializes_fully_defaulted() {
        let profile: UserProfile = serde_json::from_value(json!({})).unwrap();
        assert_eq!(profile, UserProfile::default());
    }

    #[test]
    fn test_merged_onto_defaults_keeps_unset_fields_at_default() {
        let edits = ProfileEdits {
            full_name: Some("A B".to_string()),
            address: Some(AddressEdits {
                city: Some("Pune".to_string()),
                ..AddressEdits::default()
            }),
            ..ProfileEdits::default()
        };

        let profile = edits.merged_onto_defaults("a@x.com");

        assert_eq!(profile.email, "a@x.com");
        assert_eq!(profile.full_name, "A B");
        assert_eq!(profile.address.city, "Pune");
        assert_eq!(profile.address.street, "");
        assert_eq!(profile.social_media, SocialMedia::default());
    }

    #[test]
    fn test_edits_validation_limits() {
        let edits = ProfileEdits {
            full_name: Some("x".repeat(200)),
            ..ProfileEdits::default()
        };
        assert!(validator::Validate::validate(&edits).is_err());

        let edits = ProfileEdits {
            full_name: Some("fits".to_string()),
            ..ProfileEdits::default()
        };
        assert!(validator::Validate::validate(&edits).is_ok());
    }

    #[test]
    fn test_wire_field_names_are_camel_case() {
        let profile = UserProfile::defaulted("a@x.com");
        let value = serde_json::to_value(&profile).unwrap();
        assert!(value.get("fullName").is_some());
        assert!(value.get("isProfileComplete").is_some());
        assert!(value["address"].get("zipCode").is_some());
        assert!(value["socialMedia"].get("linkedin").is_some());
    }
}
