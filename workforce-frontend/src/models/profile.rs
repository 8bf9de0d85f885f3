use super::user::UserRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Row of the `user_profiles` collection, keyed by the session's subject id.
///
/// Every column except `id` is optional. Unknown roles and unparseable
/// timestamps deserialize as `None` so the reconciliation defaults apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProfileRecord {
    pub fn from_row(row: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(row)
    }
}

fn lenient_role<'de, D>(deserializer: D) -> Result<Option<UserRole>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|role| match role.parse::<UserRole>() {
        Ok(role) => Some(role),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unrecognised profile role");
            None
        }
    }))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|ts| {
        DateTime::parse_from_rfc3339(&ts)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }))
}
