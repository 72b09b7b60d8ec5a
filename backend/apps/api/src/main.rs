//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use auth::application::{BackgroundWorker, TaskQueue, TokenSweeper};
use auth::domain::EmailSender;
use auth::infra::{LogEmailSender, SmtpEmailSender};
use auth::presentation::AccountsStore;
use auth::{InMemoryAccountsRepository, PgAccountsRepository, accounts_router};
use axum::{
    Router, http,
    http::{Method, header},
};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{ServerConfig, StorageBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,auth=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    let pepper = config.auth.password_pepper.clone();

    match &config.storage {
        StorageBackend::Postgres { database_url } => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            tracing::info!("Connected to database");

            let repo = PgAccountsRepository::new(pool).with_pepper(pepper);
            with_mailer(config, Arc::new(repo)).await
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, accounts are lost on restart");
            let repo = InMemoryAccountsRepository::new().with_pepper(pepper);
            with_mailer(config, Arc::new(repo)).await
        }
    }
}

async fn with_mailer<R>(config: ServerConfig, repo: Arc<R>) -> anyhow::Result<()>
where
    R: AccountsStore,
{
    match &config.smtp {
        Some(smtp) => {
            let mailer = SmtpEmailSender::new(smtp)?;
            tracing::info!(host = %smtp.host, port = smtp.port, "Sending email over SMTP");
            serve(config, repo, Arc::new(mailer)).await
        }
        None => {
            tracing::warn!("SMTP_HOST not set, emails are only logged");
            serve(config, repo, Arc::new(LogEmailSender::new())).await
        }
    }
}

async fn serve<R, E>(config: ServerConfig, repo: Arc<R>, mailer: Arc<E>) -> anyhow::Result<()>
where
    R: AccountsStore,
    E: EmailSender + Send + Sync + 'static,
{
    let auth_config = Arc::new(config.auth);

    // Background work outlives the request that queued it
    let (queue, rx) = TaskQueue::bounded(auth_config.task_queue_capacity);
    let worker =
        BackgroundWorker::new(repo.clone(), repo.clone(), mailer, auth_config.task_timeout)
            .spawn(rx);

    // First tick fires immediately, which doubles as the startup cleanup
    let sweeper = TokenSweeper::new(repo.clone(), repo.clone(), auth_config.clone())
        .spawn(auth_config.sweep_interval);

    // CORS configuration
    let allowed_origins: Vec<http::HeaderValue> = config
        .frontend_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ACCEPT_LANGUAGE,
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .nest("/api", accounts_router(repo, queue, auth_config))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    tracing::info!("Listening on {}", config.bind_addr);

    let listener = TcpListener::bind(config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.abort();
    worker.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
