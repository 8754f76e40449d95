#[path = "daemon/config.rs"]
mod config;

use config::DaemonConfig;
use orch_engine::application::OrchestratorRegistry;
use orch_engine::infrastructure::{OrchestratorConfig, OrchestratorSettings};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let daemon_config = DaemonConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&daemon_config.log_level))
        .init();

    if let Err(e) = daemon_config.validate() {
        error!(error = %e, "Invalid daemon configuration");
        return Err(e.into());
    }

    let settings = load_settings(&daemon_config)?;
    info!(
        config_file = ?daemon_config.config_file,
        memory_limit = settings.orchestrator.memory_limit,
        strategy = %settings.orchestrator.suspension_strategy.kind,
        "Starting orchestrator daemon"
    );

    let registry = OrchestratorRegistry::in_memory(settings)?;
    let mut events = registry.events().subscribe();
    registry.start();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => debug!(event = event.name(), payload = ?event, "Lifecycle event"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event log fell behind"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    registry.shutdown().await;
    info!("Orchestrator daemon stopped");
    Ok(())
}

fn load_settings(daemon_config: &DaemonConfig) -> Result<OrchestratorSettings, String> {
    match &daemon_config.config_file {
        Some(path) => OrchestratorConfig::load(path)?
            .into_settings()
            .map_err(|e| format!("Invalid configuration in '{}': {}", path, e)),
        None => {
            info!("No configuration file, using defaults");
            Ok(OrchestratorSettings::default())
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
