//! Persisted auth token slot.
//!
//! The session layer does not own this state; it only clears it on sign-out.

use super::error::ProviderError;
use crate::models::Session;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// On-disk form of a session: just enough to resume it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub subject_id: String,
    pub email: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&Session> for StoredSession {
    fn from(session: &Session) -> Self {
        Self {
            subject_id: session.subject_id.clone(),
            email: session.email.clone(),
            access_token: session.access_token.expose_secret().clone(),
            refresh_token: session
                .refresh_token
                .as_ref()
                .map(|token| token.expose_secret().clone()),
            expires_at: session.expires_at,
        }
    }
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Name of the storage slot.
    fn slot(&self) -> &str;

    async fn load(&self) -> Result<Option<StoredSession>, ProviderError>;

    async fn save(&self, session: &StoredSession) -> Result<(), ProviderError>;

    /// Remove the slot. Clearing an empty slot succeeds.
    async fn clear(&self) -> Result<(), ProviderError>;
}

/// Slot persisted as `<dir>/<slot>.json`.
pub struct FileTokenStore {
    slot: String,
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: impl AsRef<Path>, slot: impl Into<String>) -> Self {
        let slot = slot.into();
        let path = dir.as_ref().join(format!("{}.json", slot));
        Self { slot, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    fn slot(&self) -> &str {
        &self.slot
    }

    async fn load(&self) -> Result<Option<StoredSession>, ProviderError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, session: &StoredSession) -> Result<(), ProviderError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(session)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), ProviderError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process slot, for tests and ephemeral clients.
pub struct MemoryTokenStore {
    slot: String,
    inner: RwLock<Option<StoredSession>>,
}

impl MemoryTokenStore {
    pub fn new(slot: impl Into<String>) -> Self {
        Self {
            slot: slot.into(),
            inner: RwLock::new(None),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    fn slot(&self) -> &str {
        &self.slot
    }

    async fn load(&self) -> Result<Option<StoredSession>, ProviderError> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, session: &StoredSession) -> Result<(), ProviderError> {
        *self.inner.write().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), ProviderError> {
        *self.inner.write().await = None;
        Ok(())
    }
}
