use anyhow::Result;
use rideshare::{config::Config, generator::LoadGenerator, telemetry};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;
    let tracing_guard = telemetry::init_tracing(&cfg)?;
    let generator = Arc::new(LoadGenerator::new(&cfg.generator)?);

    tokio::select! {
        stats = generator.clone().run(None) => {
            info!(sent = stats.sent, "load generator exited");
        }
        _ = telemetry::shutdown_signal() => {
            let stats = generator.stats();
            info!(sent = stats.sent, succeeded = stats.succeeded, failed = stats.failed, "load generator stopped");
        }
    }
    tokio::task::spawn_blocking(move || tracing_guard.shutdown()).await?;
    Ok(())
}
