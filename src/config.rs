use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use validator::Validate;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub load: LoadConfig,
    #[validate(nested)]
    pub profiling: ProfilingConfig,
    pub tracing: TracingConfig,
    #[validate(nested)]
    pub workers: WorkersConfig,
    #[validate(nested)]
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    pub port: u16,
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            request_timeout_secs: 120,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoadConfig {
    /// Busy-wait per unit of search radius
    #[validate(range(min = 1))]
    pub unit_ms: u64,
    pub region: String,
    pub slow_region: String,
    #[validate(range(min = 1))]
    pub slow_multiplier: u32,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            unit_ms: 200,
            region: String::new(),
            slow_region: "us-west-1".into(),
            slow_multiplier: 30,
        }
    }
}

/// Continuous profiler agent started in-process
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProfilingConfig {
    pub enabled: bool,
    pub application_name: String,
    #[validate(length(min = 1))]
    pub server_address: String,
    pub basic_auth_user: Option<String>,
    pub basic_auth_password: Option<String>,
    pub hostname: String,
    /// Source-link labels attached to every profile
    pub repository: String,
    pub root_path: String,
    /// Samples per second
    #[validate(range(min = 1, max = 1000))]
    pub sample_rate: u32,
}

impl Default for ProfilingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            application_name: "ride-sharing-app".into(),
            server_address: "http://localhost:4040".into(),
            basic_auth_user: None,
            basic_auth_password: None,
            hostname: "unknown".into(),
            repository: "https://github.com/grafana/pyroscope".into(),
            root_path: "examples/language-sdk-instrumentation/rust/rideshare".into(),
            sample_rate: 100,
        }
    }
}

/// OTLP trace export. Without `otlp_url`, or with `debug_tracer`, spans are
/// only written to the local log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TracingConfig {
    pub otlp_url: Option<String>,
    /// Plain http when `otlp_url` has no scheme
    pub otlp_insecure: bool,
    pub otlp_basic_auth_user: Option<String>,
    pub otlp_basic_auth_password: Option<String>,
    pub otlp_traces_url_path: Option<String>,
    pub debug_tracer: bool,
    pub debug_logger: bool,
    pub debug_meterer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WorkersConfig {
    pub enabled: bool,
    #[validate(range(min = 1))]
    pub threads: usize,
    pub interval_ms: u64,
    #[validate(range(max = 45))]
    pub fibonacci_n: u32,
    pub prime_search_ms: u64,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threads: 2,
            interval_ms: 1000,
            fibonacci_n: 30,
            prime_search_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GeneratorConfig {
    #[validate(length(min = 1))]
    pub targets: Vec<String>,
    pub interval_ms: u64,
    #[validate(range(min = 1))]
    pub concurrency: usize,
    pub max_retries: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            targets: vec!["http://localhost:5000".into()],
            interval_ms: 500,
            concurrency: 4,
            max_retries: 2,
        }
    }
}

/// Unprefixed variables understood for compatibility with the other
/// rideshare deployments, mapped to their config key. Values are taken
/// verbatim as strings.
const WELL_KNOWN_ENV: &[(&str, &str)] = &[
    ("REGION", "load.region"),
    ("HOSTNAME", "profiling.hostname"),
    ("PYROSCOPE_APPLICATION_NAME", "profiling.application_name"),
    ("PYROSCOPE_SERVER_ADDRESS", "profiling.server_address"),
    ("PYROSCOPE_BASIC_AUTH_USER", "profiling.basic_auth_user"),
    ("PYROSCOPE_BASIC_AUTH_PASSWORD", "profiling.basic_auth_password"),
    ("OTLP_URL", "tracing.otlp_url"),
    // Takes precedence over OTLP_URL, so it is merged after it.
    ("OTEL_EXPORTER_OTLP_METRICS_ENDPOINT", "tracing.otlp_url"),
    ("OTLP_BASIC_AUTH_USER", "tracing.otlp_basic_auth_user"),
    ("OTLP_BASIC_AUTH_PASSWORD", "tracing.otlp_basic_auth_password"),
    ("OTLP_TRACES_URL_PATH", "tracing.otlp_traces_url_path"),
];

/// Unprefixed switches; only the value `1` turns them on.
const WELL_KNOWN_FLAGS: &[(&str, &str)] = &[
    ("OTLP_INSECURE", "tracing.otlp_insecure"),
    ("DEBUG_TRACER", "tracing.debug_tracer"),
    ("DEBUG_LOGGER", "tracing.debug_logger"),
    ("DEBUG_METERER", "tracing.debug_meterer"),
];

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_figment(&Self::figment())
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let cfg: Config = figment.extract().context("failed to load configuration")?;
        cfg.validate().context("invalid configuration")?;
        Ok(cfg)
    }

    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("RIDESHARE__").split("__"));

        for &(var, key) in WELL_KNOWN_ENV {
            if let Some(value) = std::env::var(var).ok().filter(|v| !v.is_empty()) {
                figment = figment.merge(Serialized::default(key, value));
            }
        }
        for &(var, key) in WELL_KNOWN_FLAGS {
            if let Ok(value) = std::env::var(var) {
                figment = figment.merge(Serialized::default(key, value == "1"));
            }
        }
        figment.merge(
            Env::raw()
                .only(&["RIDESHARE_LISTEN_PORT"])
                .map(|_| "server.port".into()),
        )
    }
}
