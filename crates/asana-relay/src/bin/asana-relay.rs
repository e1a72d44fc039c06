//! Asana relay binary.
//!
//! Standalone HTTP service for Asana webhook handling.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use asana_relay::{
    server, AsanaClient, Config, RuleSet, TaskService, WebhookManager,
};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the environment may already be populated
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("asana_relay=info".parse()?))
        .init();

    info!("Starting Asana relay...");

    let config = Config::from_env().context("Invalid configuration")?;

    let client: Arc<dyn TaskService> = Arc::new(
        AsanaClient::from_config(&config).context("Failed to create Asana client")?,
    );
    let webhooks = Arc::new(WebhookManager::new(
        Arc::clone(&client),
        &config.workspace_gid,
        &config.team_gid,
        &config.webhook_url,
    ));
    let rules = RuleSet::standard(client, Arc::clone(&webhooks), &config);
    info!(rules = ?rules.names(), "Rules registered");

    let app = server::build_router(server::AppState {
        rules: Arc::new(rules),
    });

    // Bind before reconciling: Asana handshakes every new hook against this listener
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(port = config.port, "Asana relay listening");

    tokio::spawn(async move {
        // Non-fatal - the relay keeps serving with whatever hooks exist
        if let Err(e) = webhooks.reconcile_all().await {
            warn!(error = %e, "Could not reconcile Asana webhooks");
        }
    });

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
