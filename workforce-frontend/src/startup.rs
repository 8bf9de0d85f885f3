//! Wiring of the provider, token slot, shell and initializer.

use crate::config::Settings;
use crate::services::error::ProviderError;
use crate::services::initializer::{SessionHandle, SessionInitializer};
use crate::services::rest_provider::RestAuthProvider;
use crate::services::shell::StoreShell;
use crate::services::token_store::{FileTokenStore, TokenStore};
use crate::AppContext;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Running client: the provider plus the handle of its session task.
pub struct Application {
    provider: Arc<RestAuthProvider>,
    shell: Arc<StoreShell>,
    handle: SessionHandle,
    settings: Settings,
}

impl Application {
    /// Build the client and start session bootstrap in the background.
    pub fn build(settings: Settings, shutdown: &CancellationToken) -> Result<Self, ProviderError> {
        let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(
            &settings.backend.storage_dir,
            settings.backend.storage_key.clone(),
        ));

        let provider = Arc::new(
            RestAuthProvider::new(settings.backend.clone(), store.clone()).map_err(|e| {
                tracing::error!("Failed to create backend client: {}", e);
                e
            })?,
        );
        let shell = Arc::new(StoreShell::new(store));
        let context = AppContext::new();

        let initializer = SessionInitializer::new(provider.clone(), shell.clone(), context)
            .with_retry_policy(settings.session.retry.policy())
            .with_profile_collection(settings.session.profile_collection.clone())
            .with_login_path(settings.session.login_path.clone());

        tracing::info!(
            backend = %settings.backend.url,
            slot = %settings.backend.storage_key,
            "Starting session initializer"
        );
        let handle = Arc::new(initializer).spawn(shutdown);

        Ok(Self {
            provider,
            shell,
            handle,
            settings,
        })
    }

    pub fn provider(&self) -> &Arc<RestAuthProvider> {
        &self.provider
    }

    pub fn shell(&self) -> &Arc<StoreShell> {
        &self.shell
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn context(&self) -> &AppContext {
        self.handle.context()
    }

    /// Stop the session task and release its auth subscription.
    pub async fn shutdown(self) {
        self.handle.shutdown().await;
    }
}
