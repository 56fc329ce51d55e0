use anyhow::{Context, Result};
use rideshare::{api, config, controller, load, telemetry, workers};
use config::Config;
use std::time::Duration;
use telemetry::{init_tracing, Profiler};
use tracing::{info, warn};

const METER_INTERVAL: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;
    let tracing_guard = init_tracing(&cfg)?;

    if cfg.load.region.is_empty() {
        warn!("REGION is not set; the region slowdown will never trigger");
    }

    let app_state = controller::AppState::new(cfg.clone());
    telemetry::log_agent_endpoints(&cfg, &app_state.labels);
    let profiler = Profiler::start(&cfg.profiling, &app_state.labels)?;

    let meter = cfg
        .tracing
        .debug_meterer
        .then(|| telemetry::spawn_ride_meter(app_state.rides.clone(), METER_INTERVAL));

    let worker_pool = if cfg.workers.enabled {
        let policy = load::LoadPolicy::from_config(&cfg.load);
        Some(workers::WorkerPool::spawn(&cfg.workers, &policy).context("failed to start load workers")?)
    } else {
        None
    };

    let app = api::router(app_state);
    let addr = cfg.server.socket_addr()?;

    info!(%addr, region = %cfg.load.region, "starting rideshare");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    if let Some(meter) = meter {
        meter.abort();
    }
    if let Some(pool) = worker_pool {
        tokio::task::spawn_blocking(move || pool.shutdown()).await?;
    }
    if let Some(Err(e)) = profiler.map(Profiler::stop) {
        warn!(error = %format!("{e:#}"), "profiling agent did not stop cleanly");
    }

    warn!("shutdown complete");
    tokio::task::spawn_blocking(move || tracing_guard.shutdown()).await?;
    Ok(())
}
