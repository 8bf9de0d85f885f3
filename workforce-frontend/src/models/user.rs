use super::profile::ProfileRecord;
use super::session::Session;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Application roles, stored in `user_profiles.role`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Manager,
    #[default]
    Employee,
    Hr,
    DepartmentHead,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::Employee => "employee",
            UserRole::Hr => "hr",
            UserRole::DepartmentHead => "department_head",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "manager" => Ok(UserRole::Manager),
            "employee" => Ok(UserRole::Employee),
            "hr" => Ok(UserRole::Hr),
            "department_head" => Ok(UserRole::DepartmentHead),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// The reconciled, UI-facing identity.
///
/// Only ever held as `Option<ApplicationUser>`: a logged-out client has
/// `None`, never a blank record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationUser {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub department_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationUser {
    /// Merge a session with its profile row.
    ///
    /// Identity and email always come from the session. Names prefer the
    /// profile and fall back to the signup metadata; a missing or unset role
    /// becomes `employee`.
    pub fn reconcile(session: &Session, profile: Option<&ProfileRecord>) -> Self {
        let first_name = profile
            .and_then(|p| non_empty(p.first_name.as_deref()))
            .or_else(|| non_empty(session.metadata.first_name.as_deref()))
            .unwrap_or_default();
        let last_name = profile
            .and_then(|p| non_empty(p.last_name.as_deref()))
            .or_else(|| non_empty(session.metadata.last_name.as_deref()))
            .unwrap_or_default();

        Self {
            id: session.subject_id.clone(),
            email: session.email.clone(),
            first_name,
            last_name,
            avatar_url: profile.and_then(|p| p.avatar_url.clone()),
            role: profile.and_then(|p| p.role).unwrap_or_default(),
            department_id: profile.and_then(|p| p.department_id.clone()),
            created_at: profile
                .and_then(|p| p.created_at)
                .unwrap_or(session.created_at),
            updated_at: profile
                .and_then(|p| p.updated_at)
                .unwrap_or(session.updated_at),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Full name, or the local part of the email when no name is known.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email
                .split('@')
                .next()
                .filter(|local| !local.is_empty())
                .unwrap_or("User")
                .to_string()
        } else {
            full.to_string()
        }
    }

    pub fn initials(&self) -> String {
        let initials: String = [&self.first_name, &self.last_name]
            .iter()
            .filter_map(|name| name.chars().next())
            .flat_map(char::to_uppercase)
            .collect();

        if initials.is_empty() {
            "U".to_string()
        } else {
            initials
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new("u1", "a@b.com", "token")
    }

    fn profile() -> ProfileRecord {
        ProfileRecord {
            id: "u1".to_string(),
            first_name: Some("Ann".to_string()),
            last_name: None,
            avatar_url: None,
            role: Some(UserRole::Manager),
            department_id: Some("d1".to_string()),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [
            UserRole::Admin,
            UserRole::Manager,
            UserRole::Employee,
            UserRole::Hr,
            UserRole::DepartmentHead,
        ] {
            assert_eq!(role.as_str().parse::<UserRole>(), Ok(role));
        }
        assert!("owner".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_role_wire_format_is_snake_case() {
        let json = serde_json::to_string(&UserRole::DepartmentHead).unwrap();
        assert_eq!(json, "\"department_head\"");
    }

    #[test]
    fn test_reconcile_takes_email_from_session() {
        let user = ApplicationUser::reconcile(&session(), Some(&profile()));
        assert_eq!(user.id, "u1");
        assert_eq!(user.email, "a@b.com");
        assert_eq!(user.first_name, "Ann");
        assert_eq!(user.role, UserRole::Manager);
        assert_eq!(user.department_id.as_deref(), Some("d1"));
    }

    #[test]
    fn test_reconcile_without_profile_uses_metadata_and_employee() {
        let session = session().with_metadata(Some("Bo".to_string()), Some("Lee".to_string()));
        let user = ApplicationUser::reconcile(&session, None);
        assert_eq!(user.first_name, "Bo");
        assert_eq!(user.last_name, "Lee");
        assert_eq!(user.role, UserRole::Employee);
        assert_eq!(user.created_at, session.created_at);
    }

    #[test]
    fn test_reconcile_blank_profile_name_falls_back_to_metadata() {
        let session = session().with_metadata(None, Some("Lee".to_string()));
        let mut row = profile();
        row.last_name = Some("  ".to_string());
        row.role = None;

        let user = ApplicationUser::reconcile(&session, Some(&row));
        assert_eq!(user.last_name, "Lee");
        assert_eq!(user.role, UserRole::Employee);
    }

    #[test]
    fn test_display_name_and_initials() {
        let user = ApplicationUser::reconcile(&session(), Some(&profile()));
        assert_eq!(user.display_name(), "Ann");
        assert_eq!(user.initials(), "A");

        let anonymous = ApplicationUser::reconcile(&session(), None);
        assert_eq!(anonymous.display_name(), "a");
        assert_eq!(anonymous.initials(), "U");
    }

    #[test]
    fn test_display_name_without_name_or_email_local_part() {
        for email in ["", "@b.com"] {
            let session = Session::new("u2", email, "token");
            let user = ApplicationUser::reconcile(&session, None);
            assert_eq!(user.display_name(), "User", "email {:?}", email);
        }
    }
}
