//! Workflow test harness for the session layer.
//!
//! Provides a scripted [`AuthProvider`] and a recording [`ClientShell`] so
//! bootstrap, retry and auth event handling can be driven end to end without
//! a backend. Pair with `#[tokio::test(start_paused = true)]` so retry delays
//! elapse instantly.

use async_trait::async_trait;
use client_core::retry::RetryPolicy;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;
use workforce_frontend::models::Session;
use workforce_frontend::services::error::ProviderError;
use workforce_frontend::services::initializer::SessionInitializer;
use workforce_frontend::services::provider::{
    event_stream, AuthEvent, AuthEventStream, AuthProvider, RowQuery,
};
use workforce_frontend::services::shell::ClientShell;
use workforce_frontend::AppContext;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,workforce_frontend=debug,workflow_tests=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// One scripted answer to a profile lookup.
#[derive(Clone, Debug)]
pub struct ProfileReply {
    pub delay: Duration,
    pub result: Result<Option<Value>, ProviderError>,
}

impl ProfileReply {
    pub fn row(row: Value) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(Some(row)),
        }
    }

    pub fn absent() -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(None),
        }
    }

    pub fn error(error: ProviderError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(error),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// In-memory provider whose answers are set up by the test.
///
/// Profile replies are queued per subject id; once a queue is drained the
/// lookup reports the row as absent.
pub struct ScriptedProvider {
    session: Mutex<Result<Option<Session>, ProviderError>>,
    profiles: Mutex<HashMap<String, VecDeque<ProfileReply>>>,
    rows: Mutex<HashMap<String, Vec<Value>>>,
    sign_out_result: Mutex<Result<(), ProviderError>>,
    update_result: Mutex<Result<(), ProviderError>>,
    events: broadcast::Sender<AuthEvent>,
    session_calls: AtomicUsize,
    fetch_one_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProvider {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            session: Mutex::new(Ok(None)),
            profiles: Mutex::new(HashMap::new()),
            rows: Mutex::new(HashMap::new()),
            sign_out_result: Mutex::new(Ok(())),
            update_result: Mutex::new(Ok(())),
            events,
            session_calls: AtomicUsize::new(0),
            fetch_one_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_session(self, session: Session) -> Self {
        *self.session.lock().unwrap() = Ok(Some(session));
        self
    }

    pub fn with_session_error(self, error: ProviderError) -> Self {
        *self.session.lock().unwrap() = Err(error);
        self
    }

    pub fn with_sign_out_error(self, error: ProviderError) -> Self {
        *self.sign_out_result.lock().unwrap() = Err(error);
        self
    }

    /// Queue replies for lookups of `subject_id`, answered in order.
    pub fn with_profile_replies(
        self,
        subject_id: &str,
        replies: impl IntoIterator<Item = ProfileReply>,
    ) -> Self {
        self.profiles
            .lock()
            .unwrap()
            .entry(subject_id.to_string())
            .or_default()
            .extend(replies);
        self
    }

    /// Make every row update fail with `error` and leave the rows untouched.
    pub fn with_update_error(self, error: ProviderError) -> Self {
        *self.update_result.lock().unwrap() = Err(error);
        self
    }

    pub fn with_rows(self, collection: &str, rows: Vec<Value>) -> Self {
        self.rows
            .lock()
            .unwrap()
            .insert(collection.to_string(), rows);
        self
    }

    /// Replace what `current_session` reports from now on.
    pub fn set_session(&self, session: Option<Session>) {
        *self.session.lock().unwrap() = Ok(session);
    }

    /// Current contents of `collection`.
    pub fn rows(&self, collection: &str) -> Vec<Value> {
        self.rows
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Deliver an auth event to every live subscriber.
    pub fn emit(&self, event: AuthEvent) {
        debug!(kind = event.kind.as_str(), "Emitting scripted auth event");
        let _ = self.events.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn session_calls(&self) -> usize {
        self.session_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_one_calls(&self) -> usize {
        self.fetch_one_calls.load(Ordering::SeqCst)
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthProvider for ScriptedProvider {
    async fn current_session(&self) -> Result<Option<Session>, ProviderError> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);
        self.session.lock().unwrap().clone()
    }

    fn subscribe(&self) -> AuthEventStream {
        event_stream(self.events.subscribe())
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.sign_out_result.lock().unwrap().clone();
        if result.is_ok() {
            *self.session.lock().unwrap() = Ok(None);
            self.emit(AuthEvent::signed_out());
        }
        result
    }

    async fn fetch_one(
        &self,
        _collection: &str,
        _key_field: &str,
        key_value: &str,
    ) -> Result<Option<Value>, ProviderError> {
        self.fetch_one_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .profiles
            .lock()
            .unwrap()
            .get_mut(key_value)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(ProfileReply::absent);

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.result
    }

    async fn fetch_many(&self, query: &RowQuery) -> Result<Vec<Value>, ProviderError> {
        let mut rows: Vec<Value> = self
            .rows
            .lock()
            .unwrap()
            .get(&query.collection)
            .map(|rows| rows.iter().filter(|row| query.matches(row)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = &query.order_by {
            rows.sort_by(|a, b| {
                let a = a[&order.column].as_str().unwrap_or_default();
                let b = b[&order.column].as_str().unwrap_or_default();
                if order.descending {
                    b.cmp(a)
                } else {
                    a.cmp(b)
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn update_rows(&self, query: &RowQuery, patch: &Value) -> Result<(), ProviderError> {
        self.update_result.lock().unwrap().clone()?;

        let mut collections = self.rows.lock().unwrap();
        let Some(rows) = collections.get_mut(&query.collection) else {
            return Ok(());
        };
        let mut updated = 0;
        for row in rows.iter_mut().filter(|row| query.matches(row)) {
            if let (Some(row), Some(patch)) = (row.as_object_mut(), patch.as_object()) {
                row.extend(patch.clone());
                updated += 1;
            }
        }
        debug!(collection = %query.collection, updated, "Scripted rows updated");
        Ok(())
    }
}

/// Shell that records what the session layer asked of it.
#[derive(Default)]
pub struct RecordingShell {
    clears: AtomicUsize,
    redirects: Mutex<Vec<String>>,
}

impl RecordingShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClientShell for RecordingShell {
    async fn clear_persisted_session(&self) -> Result<(), ProviderError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn redirect(&self, location: &str) {
        self.redirects.lock().unwrap().push(location.to_string());
    }
}

/// Everything a workflow test needs to drive and observe one initializer.
pub struct WorkflowTestContext {
    pub provider: Arc<ScriptedProvider>,
    pub shell: Arc<RecordingShell>,
    pub context: AppContext,
    pub initializer: Arc<SessionInitializer>,
}

impl WorkflowTestContext {
    /// Wire an initializer with the production retry budget (3 attempts, 1 s).
    pub fn new(provider: ScriptedProvider) -> Self {
        Self::with_policy(provider, RetryPolicy::default())
    }

    pub fn with_policy(provider: ScriptedProvider, policy: RetryPolicy) -> Self {
        init_tracing();
        let provider = Arc::new(provider);
        let shell = Arc::new(RecordingShell::new());
        let context = AppContext::new();
        let initializer = Arc::new(
            SessionInitializer::new(provider.clone(), shell.clone(), context.clone())
                .with_retry_policy(policy),
        );

        Self {
            provider,
            shell,
            context,
            initializer,
        }
    }

    /// Wait (in virtual time) until `condition` holds on the provider.
    pub async fn wait_until<F>(&self, mut condition: F)
    where
        F: FnMut(&ScriptedProvider) -> bool,
    {
        for _ in 0..1000 {
            if condition(&self.provider) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }
}
