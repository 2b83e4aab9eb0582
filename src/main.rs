use drive_relay::{Config, RelayService, api};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,drive_relay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
    })?;
    tracing::info!(
        bind_address = %config.server.api.bind_address,
        staging_dir = %config.staging.staging_dir.display(),
        max_concurrent_jobs = config.staging.max_concurrent_jobs,
        "Configuration loaded"
    );

    let relay = Arc::new(RelayService::new(config.clone()).await?);

    api::start_api_server(relay.clone(), Arc::new(config), drive_relay::wait_for_signal()).await?;

    // HTTP listener is closed; let accepted jobs deliver their notifications
    relay.shutdown().await;

    Ok(())
}
