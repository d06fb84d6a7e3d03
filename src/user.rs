//! Users mirrored from the auth provider, and the identity of whoever is
//! calling.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub clerk_user_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub last_sign_in_at: Option<NaiveDateTime>,
}

impl User {
    pub fn new(clerk_user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            clerk_user_id: clerk_user_id.into(),
            email: email.into(),
            first_name: None,
            last_name: None,
            image_url: None,
            is_active: true,
            last_sign_in_at: None,
        }
    }

    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) if !first.is_empty() && !last.is_empty() => {
                format!("{first} {last}")
            }
            (Some(first), _) if !first.is_empty() => first.to_string(),
            _ => self
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Who is asking. Passed explicitly to every operation that cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requester {
    Anonymous,
    User { clerk_user_id: String, is_admin: bool },
}

impl Requester {
    pub fn user(clerk_user_id: impl Into<String>) -> Self {
        Requester::User {
            clerk_user_id: clerk_user_id.into(),
            is_admin: false,
        }
    }

    pub fn admin(clerk_user_id: impl Into<String>) -> Self {
        Requester::User {
            clerk_user_id: clerk_user_id.into(),
            is_admin: true,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Requester::Anonymous => None,
            Requester::User { clerk_user_id, .. } => Some(clerk_user_id),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Requester::User { is_admin: true, .. })
    }

    /// Admins see everything, anyone sees public items, owners see their own.
    pub fn can_access(&self, owner: &str, is_public: bool) -> bool {
        self.is_admin() || is_public || self.user_id() == Some(owner)
    }

    /// How many saved items of one kind this requester may keep.
    /// `None` means unlimited.
    pub fn save_quota(&self) -> Option<usize> {
        match self {
            Requester::Anonymous => Some(0),
            Requester::User { is_admin: true, .. } => None,
            Requester::User { .. } => Some(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_email_prefix() {
        let mut user = User::new("user_1", "erika@example.de");
        assert_eq!(user.display_name(), "erika");

        user.first_name = Some("Erika".into());
        assert_eq!(user.display_name(), "Erika");

        user.last_name = Some("Mustermann".into());
        assert_eq!(user.display_name(), "Erika Mustermann");
    }

    #[test]
    fn access_rules() {
        let owner = Requester::user("owner");
        let other = Requester::user("other");
        let admin = Requester::admin("boss");

        assert!(owner.can_access("owner", false));
        assert!(!other.can_access("owner", false));
        assert!(other.can_access("owner", true));
        assert!(admin.can_access("owner", false));
        assert!(!Requester::Anonymous.can_access("owner", false));
        assert!(Requester::Anonymous.can_access("owner", true));
    }

    #[test]
    fn quotas() {
        assert_eq!(Requester::Anonymous.save_quota(), Some(0));
        assert_eq!(Requester::user("u").save_quota(), Some(1));
        assert_eq!(Requester::admin("a").save_quota(), None);
    }
}
