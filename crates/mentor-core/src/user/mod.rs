//! User profile domain module.

mod model;

pub use model::{CurrentStatus, TargetExam, UserProfile, UserProfileUpdate};
