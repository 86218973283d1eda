mod config;

use std::sync::Arc;

use tracing::{info, warn};

use grobro_api::auth::{AppState, AppStateInner};
use grobro_api::files::Storage;
use grobro_api::notify::{LogNotifier, Mailgun, Notifier};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grobro=debug,grobro_api=debug,grobro_db=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.has_placeholder_secret() {
        warn!("GROBRO_JWT_SECRET is unset or a placeholder; tokens are forgeable");
    }

    // Init database
    let db = grobro_db::Database::open(&config.db_path)?;
    let storage = Storage::new(config.upload_dir.clone(), config.public_url.clone()).await?;

    let notifier: Arc<dyn Notifier> = match &config.mail {
        Some(mail) => {
            info!("Sending notifications through Mailgun ({})", mail.domain);
            Arc::new(Mailgun::new(mail.api_key.clone(), &mail.domain)?)
        }
        None => {
            warn!("MAILGUN_API_KEY/MAILGUN_DOMAIN not set; notifications are only logged");
            Arc::new(LogNotifier)
        }
    };

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        storage,
        notifier,
        mail_from: config.mail_from(),
    });

    let app = grobro_api::router(state);

    info!("GroBro server listening on {}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
