use crate::middleware::gate::AccessGate;
use crate::models::ApplicationUser;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
    Pending,
    Ready,
}

/// Whether the UI should still show its loading affordance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializationState {
    pub status: InitStatus,
    pub last_error: Option<String>,
}

impl InitializationState {
    pub fn pending() -> Self {
        Self {
            status: InitStatus::Pending,
            last_error: None,
        }
    }

    pub fn ready() -> Self {
        Self {
            status: InitStatus::Ready,
            last_error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: InitStatus::Ready,
            last_error: Some(message.into()),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == InitStatus::Ready
    }
}

/// What readers see: the reconciled user and the initialisation status.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<ApplicationUser>,
    pub init: InitializationState,
    /// Ticket of the resolution that last wrote this snapshot.
    pub(crate) ticket: u64,
}

impl SessionSnapshot {
    pub fn gate(&self) -> AccessGate {
        AccessGate::from_state(&self.init, self.user.as_ref())
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            user: None,
            init: InitializationState::pending(),
            ticket: 0,
        }
    }
}

/// Single-writer holder of the session snapshot.
///
/// Every resolution (bootstrap, sign-in, sign-out) takes a ticket before it
/// starts and may only write while no newer ticket has written. A slow
/// resolution therefore never clobbers the outcome of one started after it.
#[derive(Clone)]
pub struct SessionContext {
    tx: Arc<watch::Sender<SessionSnapshot>>,
    tickets: Arc<AtomicU64>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SessionSnapshot::default());
        Self {
            tx: Arc::new(tx),
            tickets: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    pub fn gate(&self) -> AccessGate {
        self.tx.borrow().gate()
    }

    pub fn user(&self) -> Option<ApplicationUser> {
        self.tx.borrow().user.clone()
    }

    pub(crate) fn issue_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// True while no resolution newer than `ticket` has written.
    #[cfg(test)]
    fn is_current(&self, ticket: u64) -> bool {
        ticket >= self.tx.borrow().ticket
    }

    /// Enter `pending` for a new attempt, keeping the current user visible.
    pub(crate) fn begin(&self, ticket: u64) -> bool {
        self.tx.send_if_modified(|snapshot| {
            if ticket < snapshot.ticket {
                return false;
            }
            snapshot.ticket = ticket;
            snapshot.init = InitializationState::pending();
            true
        })
    }

    /// Replace the user wholesale and settle the status.
    pub(crate) fn commit(
        &self,
        ticket: u64,
        user: Option<ApplicationUser>,
        init: InitializationState,
    ) -> bool {
        self.tx.send_if_modified(|snapshot| {
            if ticket < snapshot.ticket {
                return false;
            }
            snapshot.ticket = ticket;
            snapshot.user = user;
            snapshot.init = init;
            true
        })
    }

    /// Drop the user and settle as `ready`, keeping any recorded error.
    pub(crate) fn sign_out(&self, ticket: u64) -> bool {
        self.tx.send_if_modified(|snapshot| {
            if ticket < snapshot.ticket {
                return false;
            }
            snapshot.ticket = ticket;
            snapshot.user = None;
            snapshot.init.status = InitStatus::Ready;
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Session, UserRole};

    fn user() -> ApplicationUser {
        ApplicationUser::reconcile(&Session::new("u1", "a@b.com", "t"), None)
    }

    #[test]
    fn test_initial_snapshot_is_pending_without_user() {
        let context = SessionContext::new();
        let snapshot = context.snapshot();
        assert_eq!(snapshot.init.status, InitStatus::Pending);
        assert!(snapshot.user.is_none());
        assert_eq!(context.gate(), AccessGate::Unknown);
    }

    #[test]
    fn test_commit_replaces_user() {
        let context = SessionContext::new();
        let ticket = context.issue_ticket();
        assert!(context.begin(ticket));
        assert!(context.commit(ticket, Some(user()), InitializationState::ready()));

        assert_eq!(context.gate(), AccessGate::Authenticated(UserRole::Employee));
        assert_eq!(context.user().unwrap().email, "a@b.com");
    }

    #[test]
    fn test_stale_ticket_is_discarded() {
        let context = SessionContext::new();
        let older = context.issue_ticket();
        let newer = context.issue_ticket();

        assert!(context.begin(older));
        assert!(context.begin(newer));
        assert!(context.commit(newer, None, InitializationState::ready()));

        assert!(!context.is_current(older));
        assert!(!context.commit(older, Some(user()), InitializationState::ready()));
        assert!(context.snapshot().user.is_none());
        assert_eq!(context.gate(), AccessGate::Unauthenticated);
    }

    #[test]
    fn test_sign_out_keeps_last_error() {
        let context = SessionContext::new();
        let ticket = context.issue_ticket();
        context.commit(ticket, None, InitializationState::failed("boom"));

        let next = context.issue_ticket();
        assert!(context.sign_out(next));
        let snapshot = context.snapshot();
        assert!(snapshot.init.is_ready());
        assert_eq!(snapshot.init.last_error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_subscribers_observe_changes() {
        let context = SessionContext::new();
        let mut rx = context.subscribe();

        let ticket = context.issue_ticket();
        context.commit(ticket, Some(user()), InitializationState::ready());

        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().user.is_some());
    }
}
