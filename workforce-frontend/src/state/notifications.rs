use crate::models::Notification;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationState {
    /// Newest first.
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

fn count_unread(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.is_read).count()
}

#[derive(Clone)]
pub struct NotificationStore {
    tx: Arc<watch::Sender<NotificationState>>,
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(NotificationState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> NotificationState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<NotificationState> {
        self.tx.subscribe()
    }

    pub fn unread_count(&self) -> usize {
        self.tx.borrow().unread_count
    }

    pub fn add(&self, notification: Notification) {
        self.tx.send_modify(|state| {
            if !notification.is_read {
                state.unread_count += 1;
            }
            state.notifications.insert(0, notification);
        });
    }

    /// Returns false when no notification has that id.
    pub fn mark_as_read(&self, id: &str) -> bool {
        self.tx.send_if_modified(|state| {
            let Some(notification) = state.notifications.iter_mut().find(|n| n.id == id) else {
                return false;
            };
            notification.is_read = true;
            state.unread_count = count_unread(&state.notifications);
            true
        })
    }

    pub fn mark_all_as_read(&self) {
        self.tx.send_modify(|state| {
            for notification in &mut state.notifications {
                notification.is_read = true;
            }
            state.unread_count = 0;
        });
    }

    pub fn set(&self, notifications: Vec<Notification>) {
        self.tx.send_modify(|state| {
            state.unread_count = count_unread(&notifications);
            state.notifications = notifications;
        });
    }

    pub fn reset(&self) {
        self.tx.send_replace(NotificationState::default());
    }
}
