//! Auth/data provider backed by a hosted GoTrue + PostgREST project.

use super::error::ProviderError;
use super::provider::{event_stream, AuthEvent, AuthEventStream, AuthProvider, RowQuery};
use super::token_store::{StoredSession, TokenStore};
use crate::config::BackendSettings;
use crate::models::{Session, SessionMetadata};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

const EVENT_CAPACITY: usize = 32;

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthUserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<UserMetadata>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: AuthUserResponse,
}

pub struct RestAuthProvider {
    client: Client,
    settings: BackendSettings,
    store: Arc<dyn TokenStore>,
    events: broadcast::Sender<AuthEvent>,
    session: RwLock<Option<Session>>,
}

impl RestAuthProvider {
    pub fn new(settings: BackendSettings, store: Arc<dyn TokenStore>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            client,
            settings,
            store,
            events,
            session: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        self.settings.url.trim_end_matches('/')
    }

    pub fn token_store(&self) -> Arc<dyn TokenStore> {
        self.store.clone()
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url(), path)
    }

    fn rest_url(&self, collection: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url(), collection)
    }

    fn anon_key(&self) -> &str {
        self.settings.anon_key.expose_secret()
    }

    /// Bearer for row access: the user's token when signed in, else the anon key.
    async fn bearer(&self) -> String {
        match self.session.read().await.as_ref() {
            Some(session) => session.access_token.expose_secret().clone(),
            None => self.anon_key().to_string(),
        }
    }

    fn emit(&self, event: AuthEvent) {
        let kind = event.kind.clone();
        if self.events.send(event).is_err() {
            tracing::debug!(kind = %kind, "No auth event subscribers");
        }
    }

    async fn check(response: Response) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(ProviderError::Http {
            status: status.as_u16(),
            message,
        })
    }

    async fn persist(&self, session: &Session) -> Result<(), ProviderError> {
        self.store.save(&StoredSession::from(session)).await?;
        *self.session.write().await = Some(session.clone());
        Ok(())
    }

    async fn forget(&self) -> Result<(), ProviderError> {
        *self.session.write().await = None;
        self.store.clear().await
    }

    async fn request_tokens(&self, grant_type: &str, body: Value) -> Result<Session, ProviderError> {
        let url = self.auth_url("token");
        let response = self
            .client
            .post(&url)
            .query(&[("grant_type", grant_type)])
            .header("apikey", self.anon_key())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send POST request to {}: {}", url, e);
                ProviderError::from(e)
            })?;

        let tokens: TokenResponse = Self::check(response).await?.json().await?;
        Ok(session_from_tokens(tokens))
    }

    /// Exchange email and password for a session and announce `SIGNED_IN`.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &Secret<String>,
    ) -> Result<Session, ProviderError> {
        let session = self
            .request_tokens(
                "password",
                json!({ "email": email, "password": password.expose_secret() }),
            )
            .await?;
        self.persist(&session).await?;

        tracing::info!(user_id = %session.subject_id, "User signed in");
        self.emit(AuthEvent::signed_in(session.clone()));
        Ok(session)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, ProviderError> {
        let session = self
            .request_tokens("refresh_token", json!({ "refresh_token": refresh_token }))
            .await?;
        self.persist(&session).await?;

        tracing::info!(user_id = %session.subject_id, "Access token refreshed");
        self.emit(AuthEvent::token_refreshed(session.clone()));
        Ok(session)
    }

    /// Create an auth user carrying name metadata. Returns the new subject id.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &Secret<String>,
        first_name: &str,
        last_name: &str,
    ) -> Result<String, ProviderError> {
        let url = self.auth_url("signup");
        let response = self
            .client
            .post(&url)
            .header("apikey", self.anon_key())
            .json(&json!({
                "email": email,
                "password": password.expose_secret(),
                "data": { "first_name": first_name, "last_name": last_name },
            }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send POST request to {}: {}", url, e);
                ProviderError::from(e)
            })?;

        let body: Value = Self::check(response).await?.json().await?;
        // Auto-confirmed projects wrap the user in a session payload.
        let user = body.get("user").unwrap_or(&body);
        user.get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Decode("signup response has no user id".to_string()))
    }

    /// Resolve the user behind an access token. `None` when the token is rejected.
    async fn fetch_user(&self, access_token: &str) -> Result<Option<AuthUserResponse>, ProviderError> {
        let response = self
            .client
            .get(self.auth_url("user"))
            .header("apikey", self.anon_key())
            .bearer_auth(access_token)
            .send()
            .await?;

        if matches!(response.status().as_u16(), 401 | 403) {
            return Ok(None);
        }
        Ok(Some(Self::check(response).await?.json().await?))
    }

    pub async fn insert_row(&self, collection: &str, row: &Value) -> Result<(), ProviderError> {
        let response = self
            .client
            .post(self.rest_url(collection))
            .header("apikey", self.anon_key())
            .header("Prefer", "return=minimal")
            .bearer_auth(self.bearer().await)
            .json(row)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }
}

/// PostgREST equality filters: `field=eq.value`.
fn filter_params(query: &RowQuery) -> Vec<(String, String)> {
    query
        .filters
        .iter()
        .map(|(field, value)| (field.clone(), format!("eq.{}", value)))
        .collect()
}

fn session_from_tokens(tokens: TokenResponse) -> Session {
    let mut session = session_from_user(
        tokens.user,
        tokens.access_token,
        tokens.refresh_token,
        None,
    );
    session.expires_at = tokens
        .expires_in
        .map(|seconds| Utc::now() + Duration::seconds(seconds));
    session
}

fn session_from_user(
    user: AuthUserResponse,
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
) -> Session {
    let now = Utc::now();
    let metadata = user.user_metadata.unwrap_or_default();

    Session {
        subject_id: user.id,
        email: user.email.unwrap_or_default(),
        access_token: Secret::new(access_token),
        refresh_token: refresh_token.map(Secret::new),
        expires_at,
        metadata: SessionMetadata {
            first_name: metadata.first_name,
            last_name: metadata.last_name,
        },
        created_at: user.created_at.unwrap_or(now),
        updated_at: user.updated_at.unwrap_or(now),
    }
}

#[async_trait]
impl AuthProvider for RestAuthProvider {
    async fn current_session(&self) -> Result<Option<Session>, ProviderError> {
        let stored = match self.store.load().await {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                *self.session.write().await = None;
                return Ok(None);
            }
            Err(ProviderError::Decode(e)) => {
                tracing::warn!(slot = self.store.slot(), error = %e, "Discarding unreadable token slot");
                self.forget().await?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let expired = stored.expires_at.is_some_and(|at| at <= Utc::now());
        if !expired {
            if let Some(user) = self.fetch_user(&stored.access_token).await? {
                let session = session_from_user(
                    user,
                    stored.access_token,
                    stored.refresh_token,
                    stored.expires_at,
                );
                *self.session.write().await = Some(session.clone());
                return Ok(Some(session));
            }
        }

        let Some(refresh_token) = stored.refresh_token.as_deref() else {
            tracing::info!(user_id = %stored.subject_id, "Stored session is no longer valid");
            self.forget().await?;
            return Ok(None);
        };

        match self.refresh(refresh_token).await {
            Ok(session) => Ok(Some(session)),
            Err(ProviderError::Http { status, message }) if (400..500).contains(&status) => {
                tracing::info!(status, message = %message, "Refresh token rejected, clearing stored session");
                self.forget().await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self) -> AuthEventStream {
        event_stream(self.events.subscribe())
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let cached = self
            .session
            .read()
            .await
            .as_ref()
            .map(|session| session.access_token.expose_secret().clone());
        let access_token = match cached {
            Some(token) => Some(token),
            None => self.store.load().await.ok().flatten().map(|s| s.access_token),
        };

        // Revocation is best effort; the local session is dropped regardless.
        if let Some(access_token) = access_token {
            let result = self
                .client
                .post(self.auth_url("logout"))
                .header("apikey", self.anon_key())
                .bearer_auth(&access_token)
                .send()
                .await;
            match result {
                Ok(response) if response.status().is_success() => {
                    tracing::info!("Session revoked successfully")
                }
                Ok(response) => {
                    tracing::warn!(status = response.status().as_u16(), "Session revocation rejected")
                }
                Err(e) => tracing::error!("Failed to revoke session during sign-out: {}", e),
            }
        }

        self.forget().await?;
        self.emit(AuthEvent::signed_out());
        Ok(())
    }

    async fn fetch_one(
        &self,
        collection: &str,
        key_field: &str,
        key_value: &str,
    ) -> Result<Option<Value>, ProviderError> {
        let query = RowQuery::new(collection).eq(key_field, key_value).limit(1);
        Ok(self.fetch_many(&query).await?.into_iter().next())
    }

    async fn fetch_many(&self, query: &RowQuery) -> Result<Vec<Value>, ProviderError> {
        let mut params: Vec<(String, String)> = vec![("select".to_string(), "*".to_string())];
        params.extend(filter_params(query));
        if let Some(order) = &query.order_by {
            let direction = if order.descending { "desc" } else { "asc" };
            params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
        }
        if let Some(limit) = query.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        let url = self.rest_url(&query.collection);
        let response = self
            .client
            .get(&url)
            .query(&params)
            .header("apikey", self.anon_key())
            .bearer_auth(self.bearer().await)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send GET request to {}: {}", url, e);
                ProviderError::from(e)
            })?;

        let rows: Vec<Value> = Self::check(response).await?.json().await?;
        Ok(rows)
    }

    async fn update_rows(&self, query: &RowQuery, patch: &Value) -> Result<(), ProviderError> {
        // An unfiltered PATCH would touch the whole collection.
        if query.filters.is_empty() {
            return Err(ProviderError::Http {
                status: 400,
                message: format!("refusing unfiltered update of {}", query.collection),
            });
        }

        let url = self.rest_url(&query.collection);
        let response = self
            .client
            .patch(&url)
            .query(&filter_params(query))
            .header("apikey", self.anon_key())
            .header("Prefer", "return=minimal")
            .bearer_auth(self.bearer().await)
            .json(patch)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send PATCH request to {}: {}", url, e);
                ProviderError::from(e)
            })?;

        Self::check(response).await?;
        Ok(())
    }
}
