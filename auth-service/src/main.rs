use std::sync::Arc;

use anyhow::Context;
use auth_service::config::load_service_config;
use auth_service::credentials::{
    ensure_bootstrap_admin, CredentialStore, InMemoryCredentialStore, PgCredentialStore,
};
use auth_service::metrics::AuthMetrics;
use auth_service::{build_router, AppState};
use common_auth::TokenCodec;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_service_config()?;

    let credentials: Arc<dyn CredentialStore> = match &config.database_url {
        Some(url) => {
            let pool = PgPool::connect(url)
                .await
                .context("Failed to connect to DATABASE_URL")?;
            Arc::new(PgCredentialStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set; using an empty in-memory credential store");
            Arc::new(InMemoryCredentialStore::new())
        }
    };

    match &config.bootstrap_admin {
        Some(admin) => {
            ensure_bootstrap_admin(credentials.as_ref(), admin).await?;
        }
        None => warn!(
            "AUTH_BOOTSTRAP_ADMIN_EMAIL not set; admin routes need an admin created out of band"
        ),
    }

    let state = AppState::new(TokenCodec::new(&config.jwt), credentials, AuthMetrics::new()?);
    let app = build_router(state, &config.cors_origins)?;

    let addr = config.socket_addr()?;
    info!(%addr, "starting auth-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
