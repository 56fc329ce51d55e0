use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::{SearchRadius, VehicleKind};
use crate::load::{Clock, LoadPolicy, LoadSimulator, RideReport, SystemClock};
use crate::telemetry::ProfileLabels;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub rides: Arc<RideController>,
    pub labels: Arc<ProfileLabels>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(cfg: Config) -> Self {
        Self::with_clock(cfg, Arc::new(SystemClock))
    }

    pub fn with_clock(cfg: Config, clock: Arc<dyn Clock>) -> Self {
        let labels = Arc::new(ProfileLabels::from_config(&cfg));
        let simulator = LoadSimulator::with_clock(LoadPolicy::from_config(&cfg.load), clock);
        Self {
            rides: Arc::new(RideController::new(simulator)),
            labels,
            cfg: Arc::new(cfg),
            started_at: Instant::now(),
        }
    }
}

/// Completed rides per vehicle, plus rides whose task failed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RideCounts {
    pub bike: u64,
    pub scooter: u64,
    pub car: u64,
    pub failed: u64,
}

#[derive(Default)]
struct RideCounters {
    bike: AtomicU64,
    scooter: AtomicU64,
    car: AtomicU64,
    failed: AtomicU64,
}

impl RideCounters {
    fn completed(&self, vehicle: VehicleKind) {
        let counter = match vehicle {
            VehicleKind::Bike => &self.bike,
            VehicleKind::Scooter => &self.scooter,
            VehicleKind::Car => &self.car,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RideCounts {
        RideCounts {
            bike: self.bike.load(Ordering::Relaxed),
            scooter: self.scooter.load(Ordering::Relaxed),
            car: self.car.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Dispatches ride requests onto the shared simulator.
///
/// The simulator blocks, so every ride is moved onto tokio's blocking pool.
pub struct RideController {
    simulator: Arc<LoadSimulator>,
    counters: RideCounters,
}

impl RideController {
    pub fn new(simulator: LoadSimulator) -> Self {
        Self {
            simulator: Arc::new(simulator),
            counters: RideCounters::default(),
        }
    }

    pub fn simulator(&self) -> &LoadSimulator {
        &self.simulator
    }

    pub fn counts(&self) -> RideCounts {
        self.counters.snapshot()
    }

    pub async fn order(&self, vehicle: VehicleKind) -> Result<RideReport> {
        self.order_with_radius(vehicle, vehicle.default_radius()).await
    }

    pub async fn order_with_radius(
        &self,
        vehicle: VehicleKind,
        radius: SearchRadius,
    ) -> Result<RideReport> {
        let simulator = self.simulator.clone();
        let span = tracing::Span::current();
        let report = match tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            simulator.run(vehicle, radius)
        })
        .await
        {
            Ok(report) => report,
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(%vehicle, error = %e, "ride task failed");
                return Err(e).context("ride dispatch task failed");
            }
        };
        self.counters.completed(vehicle);

        info!(
            vehicle = %report.vehicle,
            radius = report.radius.get(),
            stages = report.stages.len(),
            total_ms = report.total.as_millis() as u64,
            "ride dispatched"
        );
        Ok(report)
    }
}
