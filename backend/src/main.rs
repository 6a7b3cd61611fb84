//! In-Paw-Dia API Server
//!
//! Serves the breed catalog and the token-based authentication it sits
//! behind.

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use inpawdia_server::auth::{AuthService, TokenService};
use inpawdia_server::config::Config;
use inpawdia_server::middleware::RateLimiter;
use inpawdia_server::routes::build_router;
use inpawdia_server::state::AppState;
use inpawdia_server::store::{
    ensure_schema, CredentialStore, MemoryCredentialStore, MemoryPetStore, PetStore,
    PgCredentialStore, PgPetStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    tracing::info!(environment = config.environment.as_str(), "Starting In-Paw-Dia API");

    let (credentials, pets): (Arc<dyn CredentialStore>, Arc<dyn PetStore>) =
        match &config.database_url {
            Some(database_url) => {
                tracing::info!(
                    url = config.database_url_masked().as_deref().unwrap_or_default(),
                    "Connecting to database..."
                );
                let db_pool = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .connect(database_url)
                    .await
                    .context("Failed to connect to database")?;
                ensure_schema(&db_pool)
                    .await
                    .context("Failed to prepare database schema")?;
                tracing::info!("Database connected successfully");

                let credentials: Arc<dyn CredentialStore> =
                    Arc::new(PgCredentialStore::new(db_pool.clone()));
                let pets: Arc<dyn PetStore> = Arc::new(PgPetStore::new(db_pool));
                (credentials, pets)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory stores; data is lost on exit");
                let credentials: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
                let pets: Arc<dyn PetStore> = Arc::new(MemoryPetStore::new());
                (credentials, pets)
            }
        };

    let tokens = TokenService::from_config(&config);
    let auth_service = Arc::new(AuthService::new(credentials, tokens, config.bcrypt_cost));
    let app_state = AppState::new(auth_service, pets, config.environment.clone());

    let rate_limiter = RateLimiter::new(config.rate_limit_rps);
    let cleanup_limiter = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = cleanup_limiter.cleanup(Duration::from_secs(300)).await;
            if removed > 0 {
                tracing::debug!(removed, "Pruned idle rate-limit buckets");
            }
        }
    });

    let app = build_router(app_state, rate_limiter).layer(configure_cors(&config));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn configure_cors(config: &Config) -> CorsLayer {
    let origin = config
        .frontend_url
        .as_deref()
        .and_then(|url| url.trim().parse::<HeaderValue>().ok());

    let Some(origin) = origin else {
        tracing::warn!("FRONTEND_URL not set, allowing all origins (permissive)");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
