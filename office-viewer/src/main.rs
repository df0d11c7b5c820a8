use anyhow::{Context, Result};
use office_viewer::api_client::ApiClient;
use office_viewer::bus::NetEvents;
use office_viewer::config::ViewerConfig;
use office_viewer::demo::DemoService;
use office_viewer::fallback::{Fallback, FallbackController};
use office_viewer::network::NetworkClient;
use office_viewer::reconcile::{Effect, Reconciler};
use office_viewer::view::ViewModelFactory;
use pixel_office::agent::AgentState;
use pixel_office::scheduler::ScheduledTask;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "office_viewer=info".into()),
        )
        .init();

    let config = ViewerConfig::from_env();
    info!(server = %config.server_url, "Office viewer starting...");

    let bus = Arc::new(NetEvents::new());

    // Reconciler is the only writer of the view map
    let reconciler = Arc::new(Mutex::new(Reconciler::new(ViewModelFactory::default())));
    let subscriptions = Reconciler::attach(&reconciler, &bus);

    let demo: Arc<dyn Fallback> = Arc::new(DemoService::new(Arc::clone(&bus)));
    let mut fallback = FallbackController::with_grace(
        Arc::clone(&bus),
        Arc::clone(&demo),
        config.startup_grace,
        config.reconnect_grace,
    );
    fallback.start();

    let network = NetworkClient::new(&config.server_url, Arc::clone(&bus));
    let network_handle = network
        .spawn()
        .context("Network client already started")?;
    if let Some(room) = &config.room {
        network.join_room(room.as_str())?;
    }

    // One-off REST check so a bad key shows up early
    match ApiClient::new(&config.server_url, config.api_key.clone()) {
        Ok(api) => match api.list_agents().await {
            Ok(list) => info!(agents = list.count, "REST API reachable"),
            Err(e) => warn!(error = %e, "REST API check failed"),
        },
        Err(e) => warn!(error = %e, "REST client unavailable"),
    }

    // Advance view models and report what the scene holds
    let mut status_task = ScheduledTask::new("viewer-status", config.status_interval);
    let status_reconciler = Arc::clone(&reconciler);
    let status_bus = Arc::clone(&bus);
    let status_demo = Arc::clone(&demo);
    let frame_secs = config.status_interval.as_secs_f64();
    status_task.start(move || {
        // Producer state is read before the view lock is taken
        let source = if status_bus.is_connected() {
            "server"
        } else if status_demo.is_running() {
            "demo"
        } else {
            "none"
        };

        let mut reconciler = status_reconciler.lock().expect("reconciler lock poisoned");
        reconciler.update(frame_secs);

        let mut by_state: BTreeMap<&'static str, usize> =
            AgentState::ALL.iter().map(|s| (s.as_str(), 0)).collect();
        for (_, view) in reconciler.iter() {
            *by_state.entry(view.state().as_str()).or_default() += 1;
        }
        let bursts = reconciler
            .drain_effects()
            .into_iter()
            .filter(|e| matches!(e, Effect::ErrorBurst { .. }))
            .count();

        info!(
            agents = reconciler.count(),
            hit_targets = reconciler.hit_targets().len(),
            idle = by_state["IDLE"],
            working = by_state["WORKING"],
            moving = by_state["MOVING"],
            error = by_state["ERROR"],
            new_errors = bursts,
            source,
            "Office status"
        );
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    status_task.stop();
    network_handle.abort();
    fallback.shutdown();
    demo.stop();
    Reconciler::<ViewModelFactory>::detach(&bus, &subscriptions);
    reconciler
        .lock()
        .expect("reconciler lock poisoned")
        .dispose_all();
    info!("Office viewer stopped");

    Ok(())
}
