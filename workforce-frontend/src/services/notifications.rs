use super::error::ProviderError;
use super::provider::{AuthProvider, RowQuery};
use crate::models::Notification;
use crate::state::NotificationStore;
use serde_json::json;
use tracing::{info, warn};

pub const NOTIFICATION_COLLECTION: &str = "notifications";
pub const RECENT_NOTIFICATION_LIMIT: usize = 20;

/// Fetch the newest notifications addressed to `user_id`, newest first.
///
/// Rows that fail to decode are skipped.
pub async fn load_recent_notifications(
    provider: &dyn AuthProvider,
    user_id: &str,
) -> Result<Vec<Notification>, ProviderError> {
    let query = RowQuery::new(NOTIFICATION_COLLECTION)
        .eq("user_id", user_id)
        .order_desc("created_at")
        .limit(RECENT_NOTIFICATION_LIMIT);

    let rows = provider.fetch_many(&query).await?;
    let notifications = rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value::<Notification>(row) {
            Ok(notification) => Some(notification),
            Err(e) => {
                warn!(error = %e, "Skipping malformed notification row");
                None
            }
        })
        .collect();

    Ok(notifications)
}

/// Replace the store's contents with the user's recent notifications.
pub async fn refresh_notifications(
    provider: &dyn AuthProvider,
    store: &NotificationStore,
    user_id: &str,
) -> Result<usize, ProviderError> {
    let notifications = load_recent_notifications(provider, user_id).await?;
    let count = notifications.len();
    store.set(notifications);
    info!(user_id, count, unread = store.unread_count(), "Notifications loaded");
    Ok(count)
}

/// Persist one notification as read, then mirror it in the store.
///
/// The store is left untouched when the backend rejects the update. Returns
/// whether the store held a notification with that id.
pub async fn mark_notification_read(
    provider: &dyn AuthProvider,
    store: &NotificationStore,
    id: &str,
) -> Result<bool, ProviderError> {
    let query = RowQuery::new(NOTIFICATION_COLLECTION).eq("id", id);
    provider.update_rows(&query, &json!({ "is_read": true })).await.map_err(|e| {
        warn!(id, error = %e, "Failed to mark notification as read");
        e
    })?;
    Ok(store.mark_as_read(id))
}

/// Persist every unread notification of `user_id` as read, then mirror it in
/// the store.
pub async fn mark_all_notifications_read(
    provider: &dyn AuthProvider,
    store: &NotificationStore,
    user_id: &str,
) -> Result<(), ProviderError> {
    let query = RowQuery::new(NOTIFICATION_COLLECTION)
        .eq("user_id", user_id)
        .eq("is_read", "false");
    provider.update_rows(&query, &json!({ "is_read": true })).await.map_err(|e| {
        warn!(user_id, error = %e, "Failed to mark notifications as read");
        e
    })?;
    store.mark_all_as_read();
    info!(user_id, "All notifications marked as read");
    Ok(())
}
