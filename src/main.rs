//! Conference Hall API - call for papers management
//!
//! Speakers submit proposals to conferences and meetups. Organizer teams
//! review them, deliberate, publish the results and export the accepted
//! talks to their scheduling tools.
//!
//! Storage is PostgreSQL when `DATABASE_URL` is set, otherwise an
//! in-memory store that lives as long as the process.

mod auth;
mod config;
mod deliberation;
mod error;
mod models;
mod notifications;
mod review;
mod routes;
mod services;
mod state;
mod store;

use crate::config::Settings;
use crate::notifications::{LogMailer, MailQueue, RetryPolicy};
use crate::routes::create_router;
use crate::state::AppState;
use crate::store::{InMemoryRepository, PostgresRepository, Repository};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How long shutdown waits for queued emails
const MAIL_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("Starting Conference Hall API...");

    // Load configuration
    let settings = Settings::load()?;
    info!("Configuration loaded successfully");

    let jwt_secret = settings.jwt_secret.clone().unwrap_or_else(|| {
        warn!("JWT_SECRET not set, using default (INSECURE - set in production!)");
        "conference-hall-dev-secret-change-in-production".to_string()
    });

    let repo = init_repository(&settings).await?;

    // Speaker emails are delivered in the background
    let mailer = Arc::new(LogMailer::new(settings.mail.from.clone()));
    let (mail, mail_worker) = MailQueue::start(mailer, RetryPolicy::from(&settings.mail));

    let state = Arc::new(AppState::new(repo, mail, &settings, jwt_secret));
    let app = create_router(state, &settings);

    let addr = SocketAddr::from((settings.server.host, settings.server.port));
    info!("Server listening on http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router owned the last queue handles, so the worker drains and stops
    match tokio::time::timeout(MAIL_DRAIN_TIMEOUT, mail_worker).await {
        Ok(Err(e)) => warn!("Mail worker stopped abnormally: {}", e),
        Err(_) => warn!("Pending emails dropped after {:?}", MAIL_DRAIN_TIMEOUT),
        Ok(Ok(())) => {}
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,conference_hall_api=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// PostgreSQL when configured, in-memory otherwise
async fn init_repository(settings: &Settings) -> anyhow::Result<Arc<dyn Repository>> {
    match &settings.database {
        Some(database) => {
            let repo = PostgresRepository::connect(database).await?;
            repo.migrate().await?;
            info!(
                host = %database.host,
                database = %database.database,
                tls = database.require_tls,
                "Database ready"
            );
            Ok(Arc::new(repo))
        }
        None => {
            warn!("DATABASE_URL not set, data is kept in memory and lost on restart");
            Ok(Arc::new(InMemoryRepository::new()))
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        },
    }
}
