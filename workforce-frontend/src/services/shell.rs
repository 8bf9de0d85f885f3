use super::error::ProviderError;
use super::token_store::TokenStore;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

/// Side effects the session layer asks of the hosting client.
#[async_trait]
pub trait ClientShell: Send + Sync {
    /// Wipe the persisted auth token slot.
    async fn clear_persisted_session(&self) -> Result<(), ProviderError>;

    /// Send the client to `location`.
    fn redirect(&self, location: &str);
}

/// Shell backed by a token store, publishing redirects on a watch channel.
pub struct StoreShell {
    store: Arc<dyn TokenStore>,
    location: watch::Sender<Option<String>>,
}

impl StoreShell {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let (location, _) = watch::channel(None);
        Self { store, location }
    }

    pub fn locations(&self) -> watch::Receiver<Option<String>> {
        self.location.subscribe()
    }

    pub fn last_redirect(&self) -> Option<String> {
        self.location.borrow().clone()
    }
}

#[async_trait]
impl ClientShell for StoreShell {
    async fn clear_persisted_session(&self) -> Result<(), ProviderError> {
        self.store.clear().await?;
        tracing::debug!(slot = self.store.slot(), "Cleared persisted session");
        Ok(())
    }

    fn redirect(&self, location: &str) {
        tracing::info!(location, "Redirecting client");
        self.location.send_replace(Some(location.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Session;
    use crate::services::token_store::{MemoryTokenStore, StoredSession};

    #[tokio::test]
    async fn test_store_shell_clears_slot_and_records_redirect() {
        let store = Arc::new(MemoryTokenStore::new("zews_auth_token"));
        store
            .save(&StoredSession::from(&Session::new("u1", "a@b.com", "t")))
            .await
            .unwrap();

        let shell = StoreShell::new(store.clone());
        shell.clear_persisted_session().await.unwrap();
        shell.redirect("/login");

        assert_eq!(store.load().await.unwrap(), None);
        assert_eq!(shell.last_redirect().as_deref(), Some("/login"));
    }
}
