use anyhow::{anyhow, Context, Result};
use pixel_office::api::{create_app, AppState};
use pixel_office::config::OfficeConfig;
use pixel_office::simulation::{MockAgentService, MockSettings};
use pixel_office::state::{AgentRegistry, Broadcaster};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pixel_office=info".into()),
        )
        .init();

    info!("Pixel Office starting...");

    let config = OfficeConfig::load().map_err(|e| anyhow!("Failed to load configuration: {}", e))?;
    let api_key = config.api_key();

    info!(
        port = config.server.port,
        cors_origin = %config.server.cors_origin,
        tick_rate_ms = config.server.tick_rate_ms,
        world_width = config.world.width,
        world_height = config.world.height,
        auth = if api_key.is_some() { "api key required" } else { "open" },
        "Configuration loaded"
    );

    // Registry + broadcast loop
    let registry = Arc::new(AgentRegistry::new());
    let broadcaster = Arc::new(Broadcaster::new(Arc::clone(&registry)));
    let mut broadcast_task = Arc::clone(&broadcaster).spawn(config.tick_rate());

    // Mock agents only in dev mode (no API key)
    let mut mock_service = MockAgentService::new(
        Arc::clone(&registry),
        MockSettings {
            bounds: config.bounds(),
            max_agents: config.simulation.max_mock_agents,
        },
        config.mock_interval(),
    );
    if api_key.is_none() {
        mock_service.start();
        info!("Mock agents active (dev mode)");
    } else {
        info!("Production mode, waiting for agents via REST API");
    }

    let state = AppState::new(Arc::clone(&broadcaster), config.bounds(), api_key);
    let app = create_app(state, &config.server.cors_origin, config.server.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.server.port))
        .await
        .context("Failed to bind server port")?;
    info!(port = config.server.port, "Listening (REST: /api/agents, viewers: /ws)");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "HTTP server error");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    server_handle.abort();
    mock_service.stop();
    broadcast_task.stop();
    info!(agents = registry.count(), "Pixel Office stopped");

    Ok(())
}
