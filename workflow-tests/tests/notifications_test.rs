//! Loading the notification feed for the signed-in user and marking it read.

mod common;

use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};
use workflow_tests::{ScriptedProvider, WorkflowTestContext};
use workforce_frontend::services::error::ProviderError;
use workforce_frontend::services::notifications::{
    load_recent_notifications, mark_all_notifications_read, mark_notification_read,
    refresh_notifications, RECENT_NOTIFICATION_LIMIT,
};

fn notification_row(id: &str, user_id: &str, minute: u32, is_read: bool) -> Value {
    json!({
        "id": id,
        "user_id": user_id,
        "title": format!("Notification {}", id),
        "message": "Something happened",
        "type": "announcement",
        "is_read": is_read,
        "created_at": format!("2024-03-01T10:{:02}:00Z", minute)
    })
}

#[tokio::test]
async fn loads_newest_rows_for_user_only() {
    let mut rows: Vec<Value> = (0..30)
        .map(|i| notification_row(&format!("n{}", i), common::ANN_ID, i, i % 2 == 0))
        .collect();
    rows.push(notification_row("other", "u-bo", 59, false));
    let provider = ScriptedProvider::new().with_rows("notifications", rows);

    let notifications = load_recent_notifications(&provider, common::ANN_ID).await.unwrap();

    assert_eq!(notifications.len(), RECENT_NOTIFICATION_LIMIT);
    assert_eq!(notifications[0].id, "n29");
    assert!(notifications.iter().all(|n| n.user_id == common::ANN_ID));
}

#[tokio::test]
async fn malformed_rows_are_skipped() {
    let provider = ScriptedProvider::new().with_rows(
        "notifications",
        vec![
            notification_row("n1", common::ANN_ID, 1, false),
            json!({ "id": "broken", "user_id": common::ANN_ID, "type": "carrier_pigeon" }),
        ],
    );

    let notifications = load_recent_notifications(&provider, common::ANN_ID).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].id, "n1");
}

#[tokio::test]
async fn refresh_replaces_store_contents() {
    let ctx = WorkflowTestContext::new(ScriptedProvider::new().with_rows(
        "notifications",
        vec![
            notification_row("n1", common::ANN_ID, 1, false),
            notification_row("n2", common::ANN_ID, 2, true),
            notification_row("n3", common::ANN_ID, 3, false),
        ],
    ));

    let count = assert_ok!(
        refresh_notifications(ctx.provider.as_ref(), &ctx.context.notifications, common::ANN_ID).await
    );

    assert_eq!(count, 3);
    assert_eq!(ctx.context.notifications.unread_count(), 2);
    assert!(ctx.context.notifications.mark_as_read("n3"));
    assert_eq!(ctx.context.notifications.unread_count(), 1);
}

fn is_read(provider: &ScriptedProvider, id: &str) -> bool {
    provider
        .rows("notifications")
        .iter()
        .find(|row| row["id"] == id)
        .and_then(|row| row["is_read"].as_bool())
        .unwrap()
}

async fn loaded_context(provider: ScriptedProvider) -> WorkflowTestContext {
    let ctx = WorkflowTestContext::new(provider.with_rows(
        "notifications",
        vec![
            notification_row("n1", common::ANN_ID, 1, false),
            notification_row("n2", common::ANN_ID, 2, true),
            notification_row("n3", common::ANN_ID, 3, false),
            notification_row("other", "u-bo", 4, false),
        ],
    ));
    assert_ok!(
        refresh_notifications(ctx.provider.as_ref(), &ctx.context.notifications, common::ANN_ID).await
    );
    assert_eq!(ctx.context.notifications.unread_count(), 2);
    ctx
}

#[tokio::test]
async fn marking_one_read_persists_before_updating_store() {
    let ctx = loaded_context(ScriptedProvider::new()).await;

    let found = assert_ok!(
        mark_notification_read(ctx.provider.as_ref(), &ctx.context.notifications, "n3").await
    );

    assert!(found);
    assert!(is_read(&ctx.provider, "n3"));
    assert!(!is_read(&ctx.provider, "n1"));
    assert_eq!(ctx.context.notifications.unread_count(), 1);
}

#[tokio::test]
async fn marking_all_read_only_touches_own_rows() {
    let ctx = loaded_context(ScriptedProvider::new()).await;

    assert_ok!(
        mark_all_notifications_read(ctx.provider.as_ref(), &ctx.context.notifications, common::ANN_ID)
            .await
    );

    assert!(is_read(&ctx.provider, "n1"));
    assert!(is_read(&ctx.provider, "n3"));
    assert!(!is_read(&ctx.provider, "other"));
    assert_eq!(ctx.context.notifications.unread_count(), 0);
    assert!(ctx.context.notifications.snapshot().notifications.iter().all(|n| n.is_read));
}

#[tokio::test]
async fn rejected_update_leaves_store_unchanged() {
    let ctx = loaded_context(ScriptedProvider::new().with_update_error(ProviderError::Http {
        status: 403,
        message: "permission denied".into(),
    }))
    .await;
    let before = ctx.context.notifications.snapshot();

    assert_err!(mark_notification_read(ctx.provider.as_ref(), &ctx.context.notifications, "n1").await);
    assert_err!(
        mark_all_notifications_read(ctx.provider.as_ref(), &ctx.context.notifications, common::ANN_ID)
            .await
    );

    assert_eq!(ctx.context.notifications.snapshot(), before);
    assert_eq!(ctx.context.notifications.unread_count(), 2);
    assert!(!is_read(&ctx.provider, "n1"));
}
