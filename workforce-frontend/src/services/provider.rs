//! The auth/data provider seam.
//!
//! Everything the session layer needs from the hosted backend goes through
//! [`AuthProvider`]: session lookup, the auth event feed, sign-out and
//! exact-match row reads and updates.

use super::error::ProviderError;
use crate::models::Session;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;
use std::fmt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserDeleted,
    UserUpdated,
    PasswordRecovery,
    /// Kinds introduced by newer providers; ignored by the session layer.
    Other(String),
    /// The subscriber fell behind and `skipped` events were lost.
    Lagged(u64),
}

impl AuthEventKind {
    pub fn as_str(&self) -> &str {
        match self {
            AuthEventKind::SignedIn => "SIGNED_IN",
            AuthEventKind::SignedOut => "SIGNED_OUT",
            AuthEventKind::TokenRefreshed => "TOKEN_REFRESHED",
            AuthEventKind::UserDeleted => "USER_DELETED",
            AuthEventKind::UserUpdated => "USER_UPDATED",
            AuthEventKind::PasswordRecovery => "PASSWORD_RECOVERY",
            AuthEventKind::Other(kind) => kind,
            AuthEventKind::Lagged(_) => "LAGGED",
        }
    }
}

impl From<&str> for AuthEventKind {
    fn from(kind: &str) -> Self {
        match kind {
            "SIGNED_IN" => AuthEventKind::SignedIn,
            "SIGNED_OUT" => AuthEventKind::SignedOut,
            "TOKEN_REFRESHED" => AuthEventKind::TokenRefreshed,
            "USER_DELETED" => AuthEventKind::UserDeleted,
            "USER_UPDATED" => AuthEventKind::UserUpdated,
            "PASSWORD_RECOVERY" => AuthEventKind::PasswordRecovery,
            other => AuthEventKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for AuthEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

impl AuthEvent {
    pub fn new(kind: AuthEventKind, session: Option<Session>) -> Self {
        Self { kind, session }
    }

    pub fn signed_in(session: Session) -> Self {
        Self::new(AuthEventKind::SignedIn, Some(session))
    }

    pub fn signed_out() -> Self {
        Self::new(AuthEventKind::SignedOut, None)
    }

    pub fn token_refreshed(session: Session) -> Self {
        Self::new(AuthEventKind::TokenRefreshed, Some(session))
    }

    pub fn user_deleted() -> Self {
        Self::new(AuthEventKind::UserDeleted, None)
    }
}

/// Lazy, unbounded feed of auth events. Dropping it unsubscribes.
pub type AuthEventStream = BoxStream<'static, AuthEvent>;

/// Adapt a broadcast receiver into an [`AuthEventStream`].
///
/// Overwritten events surface as a single [`AuthEventKind::Lagged`] event so
/// the consumer can resynchronise.
pub fn event_stream(receiver: broadcast::Receiver<AuthEvent>) -> AuthEventStream {
    BroadcastStream::new(receiver)
        .map(|item| match item {
            Ok(event) => event,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Auth event subscriber lagged, events dropped");
                AuthEvent::new(AuthEventKind::Lagged(skipped), None)
            }
        })
        .boxed()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

/// Equality-filtered, optionally ordered and limited read of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowQuery {
    pub collection: String,
    pub filters: Vec<(String, String)>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl RowQuery {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(OrderBy {
            column: column.into(),
            descending: true,
        });
        self
    }

    pub fn order_asc(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(OrderBy {
            column: column.into(),
            descending: false,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a row satisfies every equality filter. Non-string columns are
    /// compared by their JSON rendering.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|(field, expected)| match row.get(field) {
            Some(Value::String(actual)) => actual == expected,
            Some(other) => other.to_string() == *expected,
            None => false,
        })
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Current session, if the client is authenticated.
    async fn current_session(&self) -> Result<Option<Session>, ProviderError>;

    /// Subscribe to auth events. Each call yields an independent stream.
    fn subscribe(&self) -> AuthEventStream;

    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Fetch at most one row whose `key_field` equals `key_value`.
    async fn fetch_one(
        &self,
        collection: &str,
        key_field: &str,
        key_value: &str,
    ) -> Result<Option<Value>, ProviderError>;

    async fn fetch_many(&self, query: &RowQuery) -> Result<Vec<Value>, ProviderError>;

    /// Apply `patch` to every row matching the query's filters.
    async fn update_rows(&self, query: &RowQuery, patch: &Value) -> Result<(), ProviderError>;
}
