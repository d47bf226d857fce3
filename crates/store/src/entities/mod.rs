//! Entity types stored by prepsync.

pub mod coding_progress;
pub mod user_profile;

pub use coding_progress::{CodingProgress, Difficulty, ProblemStatus, ProgressStats, SolvedProblem};
pub use user_profile::{
    Address, AddressEdits, ProfileEdits, SocialMedia, SocialMediaEdits, UserProfile,
};
