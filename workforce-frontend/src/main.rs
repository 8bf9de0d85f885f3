use client_core::observability::{init_tracing, shutdown_tracing};
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use workforce_frontend::config::get_configuration;
use workforce_frontend::middleware::gate::AccessGate;
use workforce_frontend::services::notifications::refresh_notifications;
use workforce_frontend::startup::Application;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "workforce-frontend",
        &configuration.logging.level,
        configuration.logging.otlp_endpoint.as_deref(),
    )?;

    let shutdown = CancellationToken::new();
    let app = Application::build(configuration, &shutdown)
        .map_err(|e| anyhow::anyhow!("Failed to start client: {}", e))?;

    let mut snapshots = app.handle().snapshots();
    let mut attempted_login = false;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        let gate = snapshot.gate();

        if let Some(error) = &snapshot.init.last_error {
            warn!(error = %error, "Session initialization reported an error");
        }

        match (&gate, &snapshot.user) {
            (AccessGate::Authenticated(role), Some(user)) => {
                info!(
                    user_id = %user.id,
                    name = %user.display_name(),
                    role = %role,
                    landing = ?gate.landing_path(),
                    "Session ready"
                );
                let provider = app.provider().as_ref();
                if let Err(e) =
                    refresh_notifications(provider, &app.context().notifications, &user.id).await
                {
                    warn!(error = %e, "Failed to load notifications");
                }
            }
            (AccessGate::Unauthenticated, _) => {
                info!(landing = ?gate.landing_path(), "No authenticated user");
                if let (Some(login), false) = (&app.settings().login, attempted_login) {
                    attempted_login = true;
                    if let Err(e) = app
                        .provider()
                        .sign_in_with_password(&login.email, &login.password)
                        .await
                    {
                        error!(error = %e, "Configured sign-in failed");
                    }
                }
            }
            _ => {}
        }

        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    shutdown.cancel();
    app.shutdown().await;
    shutdown_tracing();
    Ok(())
}
