use chrono::{DateTime, Utc};
use secrecy::Secret;

/// Name hints captured at signup and carried in the auth provider's user metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMetadata {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Proof of authentication handed out by the auth provider.
///
/// Read-only to this crate: it is never mutated, only replaced when the
/// provider issues a new one.
#[derive(Debug, Clone)]
pub struct Session {
    pub subject_id: String,
    pub email: String,
    pub access_token: Secret<String>,
    pub refresh_token: Option<Secret<String>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: SessionMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        subject_id: impl Into<String>,
        email: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            subject_id: subject_id.into(),
            email: email.into(),
            access_token: Secret::new(access_token.into()),
            refresh_token: None,
            expires_at: None,
            metadata: SessionMetadata::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_metadata(mut self, first_name: Option<String>, last_name: Option<String>) -> Self {
        self.metadata = SessionMetadata {
            first_name,
            last_name,
        };
        self
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(Secret::new(refresh_token.into()));
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}
