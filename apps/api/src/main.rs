mod auth;
mod campaigns;
mod config;
mod db;
mod email_client;
mod errors;
mod extract;
mod models;
mod routes;
mod spam;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::auth::AuthClient;
use crate::campaigns::dispatch::Dispatcher;
use crate::campaigns::store::PgCampaignStore;
use crate::config::Config;
use crate::db::create_pool;
use crate::email_client::ResendClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Hirebuddy API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize auth and email clients
    let auth = AuthClient::new(config.auth_url.clone(), config.auth_anon_key.clone())?;
    let mailer = ResendClient::new(config.resend_api_key.clone())?;
    info!("Auth and email clients initialized");

    let dispatcher = Dispatcher::new(config.batch_size, config.batch_delay);
    info!(
        "Dispatch batches: {} contacts, {}ms apart",
        config.batch_size,
        config.batch_delay.as_millis()
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        auth,
        store: Arc::new(PgCampaignStore::new(db)),
        mailer: Arc::new(mailer),
        dispatcher,
    };

    // Build router
    let app = build_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
