//! Ordering of overlapping resolutions and lifetime of the event subscription.

mod common;

use common::{ann_session, profile_row, session_for, transport_error, ANN_ID};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use workflow_tests::{ProfileReply, ScriptedProvider, WorkflowTestContext};
use workforce_frontend::middleware::gate::AccessGate;
use workforce_frontend::models::UserRole;
use workforce_frontend::services::provider::AuthEvent;

#[tokio::test(start_paused = true)]
async fn slow_bootstrap_does_not_overwrite_newer_sign_in() {
    let ctx = WorkflowTestContext::new(
        ScriptedProvider::new()
            .with_session(ann_session())
            .with_profile_replies(
                ANN_ID,
                [ProfileReply::row(profile_row(ANN_ID, "Ann", "Lee", Some("employee")))
                    .after(Duration::from_secs(5))],
            )
            .with_profile_replies(
                "u-bo",
                [ProfileReply::row(profile_row("u-bo", "Bo", "Ng", Some("manager")))],
            ),
    );
    let shutdown = CancellationToken::new();
    let handle = ctx.initializer.clone().spawn(&shutdown);

    ctx.wait_until(|p| p.subscriber_count() == 1 && p.fetch_one_calls() == 1).await;
    ctx.provider.emit(AuthEvent::signed_in(session_for("u-bo", "bo@x.io")));

    // Let the slow bootstrap lookup finish well after the sign-in resolved.
    tokio::time::sleep(Duration::from_secs(10)).await;

    let snapshot = handle.snapshot();
    let user = snapshot.user.expect("newer sign-in kept");
    assert_eq!(user.id, "u-bo");
    assert_eq!(user.role, UserRole::Manager);
    assert!(snapshot.init.is_ready());

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn stale_failure_does_not_sign_out_newer_session() {
    let ctx = WorkflowTestContext::new(
        ScriptedProvider::new()
            .with_session(ann_session())
            .with_profile_replies(
                ANN_ID,
                (0..3).map(|_| ProfileReply::error(transport_error()).after(Duration::from_secs(2))),
            )
            .with_profile_replies(
                "u-bo",
                [ProfileReply::row(profile_row("u-bo", "Bo", "Ng", None))],
            ),
    );
    let shutdown = CancellationToken::new();
    let handle = ctx.initializer.clone().spawn(&shutdown);

    ctx.wait_until(|p| p.subscriber_count() == 1 && p.fetch_one_calls() == 1).await;
    ctx.provider.emit(AuthEvent::signed_in(session_for("u-bo", "bo@x.io")));

    tokio::time::sleep(Duration::from_secs(20)).await;

    assert_eq!(ctx.provider.sign_out_calls(), 0);
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.user.map(|u| u.id).as_deref(), Some("u-bo"));
    assert!(snapshot.init.last_error.is_none());

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_releases_subscription() {
    let ctx = WorkflowTestContext::new(ScriptedProvider::new());
    let shutdown = CancellationToken::new();
    let handle = ctx.initializer.clone().spawn(&shutdown);

    ctx.wait_until(|p| p.subscriber_count() == 1).await;
    assert!(handle.is_running());

    handle.shutdown().await;
    assert_eq!(ctx.provider.subscriber_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_releases_subscription() {
    let ctx = WorkflowTestContext::new(ScriptedProvider::new());
    let shutdown = CancellationToken::new();
    let handle = ctx.initializer.clone().spawn(&shutdown);
    ctx.wait_until(|p| p.subscriber_count() == 1).await;

    drop(handle);

    ctx.wait_until(|p| p.subscriber_count() == 0).await;
}

#[tokio::test(start_paused = true)]
async fn parent_cancellation_stops_mid_retry() {
    let ctx = WorkflowTestContext::new(
        ScriptedProvider::new()
            .with_session(ann_session())
            .with_profile_replies(ANN_ID, (0..3).map(|_| ProfileReply::error(transport_error()))),
    );
    let shutdown = CancellationToken::new();
    let handle = ctx.initializer.clone().spawn(&shutdown);

    ctx.wait_until(|p| p.fetch_one_calls() == 1).await;
    shutdown.cancel();
    ctx.wait_until(|p| p.subscriber_count() == 0).await;

    // No further attempts and no forced sign-out once cancelled.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(ctx.provider.fetch_one_calls(), 1);
    assert_eq!(ctx.provider.sign_out_calls(), 0);
    assert!(!handle.is_running());
}

#[tokio::test(start_paused = true)]
async fn handle_retry_bootstrap_rereads_session() {
    let ctx = WorkflowTestContext::new(
        ScriptedProvider::new().with_session_error(transport_error()),
    );
    let shutdown = CancellationToken::new();
    let handle = ctx.initializer.clone().spawn(&shutdown);
    let mut snapshots = handle.snapshots();

    snapshots.wait_for(|s| s.init.is_ready()).await.unwrap();
    assert!(handle.snapshot().init.last_error.is_some());
    assert_eq!(handle.gate(), AccessGate::Unauthenticated);

    let state = handle.retry_bootstrap().await;
    assert!(state.last_error.is_some());
    assert_eq!(ctx.provider.session_calls(), 2);

    handle.shutdown().await;
}
