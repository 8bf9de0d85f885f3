//! Session bootstrap and auth event reconciliation.
//!
//! The initializer maps the provider's session onto an [`ApplicationUser`]
//! at startup and after every auth event, and keeps the [`AppContext`]
//! snapshot consistent while doing so:
//!
//! - session retrieval failures are reported, never retried;
//! - a missing profile row is not an error, the session metadata fills in;
//! - profile fetch errors are retried on a fixed budget, then force sign-out;
//! - every attempt ends with the status `ready`.

use super::error::{ProviderError, ResolutionFailure, SessionError};
use super::provider::{AuthEvent, AuthEventKind, AuthProvider};
use super::shell::ClientShell;
use super::subscription::Subscription;
use crate::middleware::gate::{AccessGate, LOGIN_PATH};
use crate::models::{ApplicationUser, ProfileRecord, Session};
use crate::state::{InitializationState, SessionSnapshot};
use crate::AppContext;
use client_core::retry::{retry_with_policy, RetryPolicy};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_PROFILE_COLLECTION: &str = "user_profiles";

pub struct SessionInitializer {
    provider: Arc<dyn AuthProvider>,
    shell: Arc<dyn ClientShell>,
    context: AppContext,
    retry_policy: RetryPolicy,
    profile_collection: String,
    login_path: String,
}

impl SessionInitializer {
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        shell: Arc<dyn ClientShell>,
        context: AppContext,
    ) -> Self {
        Self {
            provider,
            shell,
            context,
            retry_policy: RetryPolicy::default(),
            profile_collection: DEFAULT_PROFILE_COLLECTION.to_string(),
            login_path: LOGIN_PATH.to_string(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_profile_collection(mut self, collection: impl Into<String>) -> Self {
        self.profile_collection = collection.into();
        self
    }

    pub fn with_login_path(mut self, login_path: impl Into<String>) -> Self {
        self.login_path = login_path.into();
        self
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Establish the user for whatever session the provider currently holds.
    ///
    /// Returns the state this attempt settled on, which is always `ready`.
    pub async fn bootstrap(&self) -> InitializationState {
        let session_state = &self.context.session;
        let ticket = session_state.issue_ticket();
        session_state.begin(ticket);
        info!(ticket, "Initializing session");

        let session = match self.provider.current_session().await {
            Ok(Some(session)) => session,
            Ok(None) => {
                info!("No active session");
                let state = InitializationState::ready();
                session_state.commit(ticket, None, state.clone());
                return state;
            }
            Err(e) => {
                let err = SessionError::SessionRetrieval(e);
                error!(error = %err, "App initialization error");
                let state = InitializationState::failed(err.to_string());
                session_state.commit(ticket, None, state.clone());
                return state;
            }
        };

        self.establish(ticket, &session).await
    }

    /// Fetch the profile row for `subject_id`.
    ///
    /// `Ok(None)` means the row does not exist. Only transient errors are
    /// retried; the policy's budget bounds the number of attempts.
    pub async fn resolve_profile(
        &self,
        subject_id: &str,
    ) -> Result<Option<ProfileRecord>, ResolutionFailure> {
        let provider = self.provider.as_ref();
        let collection = self.profile_collection.as_str();

        retry_with_policy(
            &self.retry_policy,
            "fetch_user_profile",
            ProviderError::is_transient,
            move || async move {
                let row = provider.fetch_one(collection, "id", subject_id).await?;
                row.map(ProfileRecord::from_row)
                    .transpose()
                    .map_err(ProviderError::from)
            },
        )
        .await
        .map_err(|e| ResolutionFailure {
            subject_id: subject_id.to_string(),
            attempts: e.attempts(),
            last_error: e.into_last_error(),
        })
    }

    async fn establish(&self, ticket: u64, session: &Session) -> InitializationState {
        let session_state = &self.context.session;

        match self.resolve_profile(&session.subject_id).await {
            Ok(profile) => {
                if profile.is_none() {
                    info!(
                        user_id = %session.subject_id,
                        "No profile row, falling back to session metadata"
                    );
                }
                let user = ApplicationUser::reconcile(session, profile.as_ref());
                info!(user_id = %user.id, role = %user.role, "Session established");

                let state = InitializationState::ready();
                if !session_state.commit(ticket, Some(user), state.clone()) {
                    debug!(ticket, "Discarding superseded session resolution");
                }
                state
            }
            Err(failure) => {
                let err = SessionError::from(failure);
                error!(user_id = %session.subject_id, error = %err, "Profile fetch error");
                let state = InitializationState::failed(err.to_string());

                // Settle first so the SIGNED_OUT echo keeps this error visible.
                if !session_state.commit(ticket, None, state.clone()) {
                    debug!(ticket, "Superseded resolution failed, leaving newer session alone");
                    return state;
                }

                if let Err(e) = self.provider.sign_out().await {
                    warn!(error = %SessionError::SignOut(e), "Forced sign-out failed");
                }
                state
            }
        }
    }

    /// Apply one auth event to the context.
    pub async fn handle_event(&self, event: AuthEvent) {
        match &event.kind {
            AuthEventKind::SignedIn => match event.session {
                Some(session) => {
                    let ticket = self.context.session.issue_ticket();
                    self.context.session.begin(ticket);
                    info!(user_id = %session.subject_id, ticket, "Signed in, resolving profile");
                    self.establish(ticket, &session).await;
                }
                None => warn!("SIGNED_IN event without a session, ignoring"),
            },
            AuthEventKind::SignedOut | AuthEventKind::UserDeleted => {
                self.handle_signed_out(&event.kind).await;
            }
            AuthEventKind::TokenRefreshed => info!("Token refreshed successfully"),
            AuthEventKind::Lagged(skipped) => {
                // A lost SIGNED_OUT would leave a stale user; re-read the session.
                warn!(skipped = *skipped, "Auth events lost, re-reading session");
                self.bootstrap().await;
            }
            other => debug!(kind = %other, "Ignoring auth event"),
        }
    }

    async fn handle_signed_out(&self, kind: &AuthEventKind) {
        let ticket = self.context.session.issue_ticket();
        self.context.session.sign_out(ticket);
        self.context.notifications.reset();
        info!(kind = %kind, "Session ended, clearing client state");

        if let Err(e) = self.shell.clear_persisted_session().await {
            warn!(error = %e, "Failed to clear persisted session");
        }
        self.shell.redirect(&self.login_path);
    }

    /// Bootstrap and follow auth events until `shutdown` fires or the feed ends.
    ///
    /// The subscription is taken before bootstrap starts so no event is lost,
    /// and is released when this future completes or is dropped.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut subscription = Subscription::new(self.provider.subscribe());

        let events = async {
            while let Some(event) = subscription.next().await {
                debug!(kind = %event.kind, "Auth state change");
                self.handle_event(event).await;
            }
            info!("Auth event feed closed");
        };

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Session initializer shutting down");
            }
            _ = async { tokio::join!(self.bootstrap(), events) } => {}
        }
    }

    /// Run on a background task; the returned handle owns its lifetime.
    pub fn spawn(self: Arc<Self>, shutdown: &CancellationToken) -> SessionHandle {
        let token = shutdown.child_token();
        let initializer = self.clone();
        let task_token = token.clone();
        let task = tokio::spawn(async move { initializer.run(task_token).await });

        SessionHandle {
            initializer: self,
            token,
            task: Some(task),
        }
    }
}

/// Owner of a running initializer. Dropping it stops the task.
pub struct SessionHandle {
    initializer: Arc<SessionInitializer>,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn snapshots(&self) -> watch::Receiver<SessionSnapshot> {
        self.initializer.context.session.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.initializer.context.session.snapshot()
    }

    pub fn gate(&self) -> AccessGate {
        self.initializer.context.session.gate()
    }

    pub fn context(&self) -> &AppContext {
        &self.initializer.context
    }

    /// Restart bootstrap from the session lookup, e.g. from a retry button.
    pub async fn retry_bootstrap(&self) -> InitializationState {
        self.initializer.bootstrap().await
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Cancel the task and wait for it to release its subscription.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Session task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
