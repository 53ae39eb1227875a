use crate::entity::Entity;
use crate::store::Collection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetExam {
    #[serde(rename = "NEET")]
    Neet,
    #[serde(rename = "JEE")]
    Jee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurrentStatus {
    #[serde(rename = "Class 11")]
    Class11,
    #[serde(rename = "Class 12")]
    Class12,
    Dropper,
}

/// A registered student.
///
/// Stored under the user id as its document id; the id never changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_exam: Option<TargetExam>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_status: Option<CurrentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coaching_institute: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred_subjects: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    /// Display name, falling back to the local part of the email.
    pub fn display_name(&self) -> &str {
        if !self.name.trim().is_empty() {
            return &self.name;
        }
        self.email.split('@').next().unwrap_or_default()
    }
}

impl Entity for UserProfile {
    const COLLECTION: Collection = Collection::Users;
    const ENTITY_NAME: &'static str = "user";
    const ORDER_FIELD: &'static str = "createdAt";
    const REQUIRED_TIMESTAMPS: &'static [&'static str] = &[];
    const OPTIONAL_TIMESTAMPS: &'static [&'static str] = &["createdAt"];
    const OWNER_FIELD: &'static str = "id";

    fn id(&self) -> &str {
        &self.id
    }

    fn order_key(&self) -> DateTime<Utc> {
        self.created_at.unwrap_or_default()
    }
}

/// Explicit profile update. The identity key is not updatable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institute: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_exam: Option<TargetExam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_status: Option<CurrentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coaching_institute: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_subjects: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_email() {
        let user = UserProfile::new("u1", "", "asha@example.com");
        assert_eq!(user.display_name(), "asha");
        let user = UserProfile::new("u1", "Asha", "asha@example.com");
        assert_eq!(user.display_name(), "Asha");
    }
}
