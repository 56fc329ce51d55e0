//! Traffic source for one or more rideshare instances.

use anyhow::{Context, Result};
use rand::{seq::SliceRandom, Rng};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strum::IntoEnumIterator;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::GeneratorConfig;
use crate::domain::VehicleKind;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorStats {
    pub sent: u64,
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    sent: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> GeneratorStats {
        GeneratorStats {
            sent: self.sent.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

pub struct LoadGenerator {
    client: ClientWithMiddleware,
    targets: Vec<String>,
    vehicles: Vec<VehicleKind>,
    interval: Duration,
    concurrency: usize,
    counters: Counters,
}

impl LoadGenerator {
    pub fn new(cfg: &GeneratorConfig) -> Result<Self> {
        if cfg.targets.is_empty() {
            anyhow::bail!("load generator needs at least one target");
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("rideshare-load-generator/0.1"));
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .default_headers(headers)
            .build()
            .context("failed to build HTTP client")?;

        let retry = ExponentialBackoff::builder().build_with_max_retries(cfg.max_retries);
        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry))
            .build();

        Ok(Self {
            client,
            targets: cfg
                .targets
                .iter()
                .map(|t| t.trim_end_matches('/').to_string())
                .collect(),
            vehicles: VehicleKind::iter().collect(),
            interval: Duration::from_millis(cfg.interval_ms),
            concurrency: cfg.concurrency.max(1),
            counters: Counters::default(),
        })
    }

    /// A random `{target}/{vehicle}` URL
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> (String, VehicleKind) {
        let target = self.targets.choose(&mut *rng).map(String::as_str).unwrap_or_default();
        let vehicle = self
            .vehicles
            .choose(&mut *rng)
            .copied()
            .unwrap_or(VehicleKind::Bike);
        (format!("{target}/{vehicle}"), vehicle)
    }

    pub async fn order(&self, url: &str) -> Result<()> {
        self.client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?
            .error_for_status()
            .with_context(|| format!("GET {url} returned an error status"))?;
        Ok(())
    }

    async fn fire_one(&self) {
        let (url, vehicle) = {
            let mut rng = rand::thread_rng();
            self.pick(&mut rng)
        };
        self.counters.sent.fetch_add(1, Ordering::Relaxed);
        match self.order(&url).await {
            Ok(()) => {
                self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
                debug!(%url, %vehicle, "ride ordered");
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(%url, error = %format!("{e:#}"), "ride order failed");
            }
        }
    }

    /// Drive traffic with `concurrency` parallel clients.
    ///
    /// With `limit = Some(n)` each client stops after `n` requests; with
    /// `None` the future runs until dropped.
    pub async fn run(self: Arc<Self>, limit: Option<u64>) -> GeneratorStats {
        info!(
            targets = ?self.targets,
            concurrency = self.concurrency,
            interval_ms = self.interval.as_millis() as u64,
            "load generator started"
        );

        let mut clients = JoinSet::new();
        for _ in 0..self.concurrency {
            let generator = self.clone();
            clients.spawn(async move {
                let mut sent = 0u64;
                while limit.map_or(true, |n| sent < n) {
                    generator.fire_one().await;
                    sent += 1;
                    if !generator.interval.is_zero() {
                        tokio::time::sleep(generator.interval).await;
                    }
                }
            });
        }
        while let Some(joined) = clients.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "load generator client stopped");
            }
        }

        let stats = self.stats();
        info!(sent = stats.sent, succeeded = stats.succeeded, failed = stats.failed, "load generator finished");
        stats
    }

    pub fn stats(&self) -> GeneratorStats {
        self.counters.snapshot()
    }
}
