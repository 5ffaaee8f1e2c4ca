//! Signed-in users and the administrative capability.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Role stored on a user's profile document.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserRole {
    /// Regular member.
    #[default]
    Member,
    /// Can delete reports.
    Moderator,
    /// Can delete reports.
    Admin,
}

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Authentication provider user ID.
    pub uid: String,
    /// Display name from the auth provider.
    pub display_name: Option<String>,
    /// Email address from the auth provider.
    pub email: Option<String>,
    /// Role from the user's profile document.
    #[serde(default)]
    pub role: UserRole,
}

/// Proof that the current user may delete reports.
///
/// Only obtainable through [`User::admin_capability`], so code paths that
/// require one cannot be reached by regular members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCapability {
    uid: String,
}

impl AdminCapability {
    /// Returns the ID of the user holding this capability.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }
}

impl User {
    /// Returns the admin capability if the user's role grants it.
    #[must_use]
    pub fn admin_capability(&self) -> Option<AdminCapability> {
        match self.role {
            UserRole::Admin | UserRole::Moderator => Some(AdminCapability {
                uid: self.uid.clone(),
            }),
            UserRole::Member => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User {
            uid: "u1".to_string(),
            display_name: Some("Rider".to_string()),
            email: None,
            role,
        }
    }

    #[test]
    fn only_admins_and_moderators_get_capability() {
        assert!(user(UserRole::Member).admin_capability().is_none());
        assert_eq!(
            user(UserRole::Moderator).admin_capability().unwrap().uid(),
            "u1"
        );
        assert!(user(UserRole::Admin).admin_capability().is_some());
    }
}
