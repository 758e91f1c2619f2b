use lexvoyage_api::config::Config;
use lexvoyage_api::handlers::AppState;
use lexvoyage_api::routes::build_router;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes tracing, loads configuration, wires whichever gateways have
/// credentials and starts the Axum server. Missing credentials never stop
/// startup; they only switch the matching capability off.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lexvoyage_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Build application state
    let app_state = Arc::new(AppState::from_config(&config)?);
    let capabilities = app_state.capabilities();
    tracing::info!(
        "Capabilities: lead_storage={}, notifications={}, login={}, vault={}",
        capabilities.lead_storage,
        capabilities.notifications,
        capabilities.login,
        capabilities.vault
    );

    let app = build_router(app_state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
