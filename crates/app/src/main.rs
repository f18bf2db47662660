mod consumers;
mod dispatch;
mod rejection;
mod router;
mod sweeper;
mod telemetry;
mod webhook;

use std::{net::SocketAddr, sync::Arc};

use streamhook_core::dedupe::DedupeCache;
use streamhook_util::{load_env_file, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let dedupe = Arc::new(DedupeCache::new(config.dedupe.retention));
    sweeper::DedupeSweeper::new(dedupe.clone(), config.dedupe.sweep_interval).spawn();

    let dispatcher = dispatch::Dispatcher::new();
    consumers::spawn_status_logger(&dispatcher);
    consumers::spawn_analytics_sink(&dispatcher);

    let state = router::AppState::new(metrics, config.webhook_secret.clone(), dedupe, dispatcher);

    let addr: SocketAddr = config.bind_addr;
    info!(
        stage = "app",
        %addr,
        env = %config.environment.as_str(),
        retention_secs = config.dedupe.retention.as_secs(),
        sweep_secs = config.dedupe.sweep_interval.as_secs(),
        "starting HTTP server"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}
