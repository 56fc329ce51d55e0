mod otlp;
mod profiler;

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::{signal, task::JoinHandle};
use tracing::{info, warn};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

pub use otlp::{auth_headers, traces_endpoint};
pub use profiler::Profiler;

use crate::config::Config;
use crate::controller::RideController;

const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn,tower_http=info,pyroscope=warn";

/// Keeps span export alive; call [`TracingGuard::shutdown`] before exit to
/// flush pending spans.
#[must_use]
pub struct TracingGuard {
    exporting: bool,
}

impl TracingGuard {
    pub fn is_exporting(&self) -> bool {
        self.exporting
    }

    /// Blocks until the exporter has flushed.
    pub fn shutdown(self) {
        if self.exporting {
            otlp::shutdown();
            info!("span export stopped");
        }
    }
}

/// Install the global subscriber.
///
/// Logs go to stdout as JSON, or to stderr in human-readable form with
/// `debug_logger`. `debug_tracer` adds span close events to the log in place
/// of OTLP export. With an `otlp_url`, spans are also exported.
pub fn init_tracing(cfg: &Config) -> Result<TracingGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let span_events = if cfg.tracing.debug_tracer {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let (json, pretty) = if cfg.tracing.debug_logger {
        let layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_span_events(span_events);
        (None, Some(layer))
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(span_events);
        (Some(layer), None)
    };

    let tracer = otlp::install_tracer(cfg)?;
    let exporting = tracer.is_some();
    let otel = tracer.map(|t| tracing_opentelemetry::layer().with_tracer(t));

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .with(otel)
        .try_init()
        .context("failed to install tracing subscriber")?;

    if let Some(endpoint) = traces_endpoint(&cfg.tracing) {
        info!(%endpoint, "exporting spans over OTLP");
    }
    Ok(TracingGuard { exporting })
}

/// Static labels the profiling agent attaches to every sample from this
/// process. Per-ride labels (`vehicle`) are carried on the ride span instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileLabels {
    pub application_name: String,
    tags: BTreeMap<&'static str, String>,
}

impl ProfileLabels {
    pub fn from_config(cfg: &Config) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert("region", cfg.load.region.clone());
        tags.insert("hostname", cfg.profiling.hostname.clone());
        tags.insert("service_git_ref", "HEAD".to_string());
        tags.insert("service_repository", cfg.profiling.repository.clone());
        tags.insert("service_root_path", cfg.profiling.root_path.clone());
        Self {
            application_name: cfg.profiling.application_name.clone(),
            tags,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.tags.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Labels in `key=value` form, comma separated
    pub fn render(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Log the profiler and tracer targets. Credentials are reduced to whether
/// they are set.
pub fn log_agent_endpoints(cfg: &Config, labels: &ProfileLabels) {
    info!(
        application = %labels.application_name,
        profiler = %cfg.profiling.server_address,
        profiler_enabled = cfg.profiling.enabled,
        profiler_auth = cfg.profiling.basic_auth_user.is_some(),
        otlp = traces_endpoint(&cfg.tracing).as_deref().unwrap_or("disabled"),
        otlp_auth = cfg.tracing.otlp_basic_auth_user.is_some(),
        labels = %labels.render(),
        "telemetry targets"
    );
}

/// Periodically log ride counters; the local stand-in for a metrics exporter
/// enabled by `debug_meterer`.
pub fn spawn_ride_meter(rides: Arc<RideController>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let counts = rides.counts();
            info!(
                bike = counts.bike,
                scooter = counts.scooter,
                car = counts.car,
                failed = counts.failed,
                "ride counters"
            );
        }
    })
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        _ = ctrl_c => "ctrl_c",
        _ = terminate => "sigterm",
    };
    info!(signal = received, "shutdown signal received, draining rides");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_from_config() {
        let mut cfg = Config::default();
        cfg.load.region = "eu-north-1".into();
        cfg.profiling.hostname = "node-7".into();
        let labels = ProfileLabels::from_config(&cfg);
        assert_eq!(labels.application_name, "ride-sharing-app");
        assert_eq!(labels.get("region"), Some("eu-north-1"));
        assert_eq!(labels.get("hostname"), Some("node-7"));
        assert_eq!(labels.get("service_git_ref"), Some("HEAD"));
        assert_eq!(
            labels.get("service_repository"),
            Some("https://github.com/grafana/pyroscope")
        );
        assert_eq!(
            labels.get("service_root_path"),
            Some("examples/language-sdk-instrumentation/rust/rideshare")
        );
        assert_eq!(labels.get("vehicle"), None);
    }

    #[test]
    fn test_source_labels_follow_config() {
        let mut cfg = Config::default();
        cfg.profiling.repository = "https://git.example.com/rides".into();
        cfg.profiling.root_path = "services/rideshare".into();
        let labels = ProfileLabels::from_config(&cfg);
        assert_eq!(labels.get("service_repository"), Some("https://git.example.com/rides"));
        assert_eq!(labels.get("service_root_path"), Some("services/rideshare"));
    }

    #[test]
    fn test_render_is_sorted() {
        let labels = ProfileLabels::from_config(&Config::default());
        let rendered = labels.render();
        assert!(rendered.starts_with("hostname=unknown,region=,"));
        assert!(rendered.contains("service_git_ref=HEAD"));
    }
}
