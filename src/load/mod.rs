pub mod burn;
pub mod clock;
pub mod plan;

use parking_lot::ReentrantMutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, debug_span, info_span};

pub use clock::{Clock, FixedClock, SystemClock};
pub use plan::{ActiveStage, Gate, LoadPlan, RideContext, Stage, StageKind};

use crate::config::LoadConfig;
use crate::domain::{SearchRadius, VehicleKind};

/// How long one unit of search radius costs, where this instance runs, and
/// which stages make up a ride.
#[derive(Debug, Clone)]
pub struct LoadPolicy {
    pub unit: Duration,
    pub region: String,
    pub plan: LoadPlan,
}

impl LoadPolicy {
    pub fn from_config(cfg: &LoadConfig) -> Self {
        Self {
            unit: Duration::from_millis(cfg.unit_ms),
            region: cfg.region.clone(),
            plan: LoadPlan::rideshare(cfg.slow_region.clone(), cfg.slow_multiplier),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub kind: StageKind,
    pub units: u32,
    pub elapsed: Duration,
}

/// Outcome of one simulated ride
#[derive(Debug, Clone, Serialize)]
pub struct RideReport {
    pub vehicle: VehicleKind,
    pub radius: SearchRadius,
    pub minute: u32,
    pub stages: Vec<StageTiming>,
    pub total: Duration,
    pub iterations: u64,
}

impl RideReport {
    pub fn ran(&self, kind: StageKind) -> bool {
        self.stages.iter().any(|s| s.kind == kind)
    }
}

/// Busy-waits through a [`LoadPlan`] while holding a single lock.
///
/// Every call to [`LoadSimulator::run`] on the same instance is serialised,
/// including all cascaded stages. Separate instances do not contend.
pub struct LoadSimulator {
    lock: ReentrantMutex<()>,
    policy: LoadPolicy,
    clock: Arc<dyn Clock>,
}

impl LoadSimulator {
    pub fn new(policy: LoadPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: LoadPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            lock: ReentrantMutex::new(()),
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> &LoadPolicy {
        &self.policy
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Run `f` while holding the simulator lock. `f` may call [`Self::run`]
    /// on the same simulator; the lock is reentrant.
    pub fn with_lock<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let _guard = self.lock.lock();
        f(self)
    }

    /// The stages a ride would run right now, without running them
    pub fn preview(&self, vehicle: VehicleKind, radius: SearchRadius) -> Vec<ActiveStage> {
        let minute = clock::minute_of_hour(self.clock.as_ref());
        self.policy.plan.active_stages(&self.context(vehicle, radius, minute))
    }

    /// Run the cascade for one ride. Blocks the calling thread.
    pub fn run(&self, vehicle: VehicleKind, radius: SearchRadius) -> RideReport {
        let _guard = self.lock.lock();

        let span = info_span!("ride", vehicle = %vehicle, region = %self.policy.region, radius = radius.get());
        let _entered = span.enter();

        let minute = clock::minute_of_hour(self.clock.as_ref());
        let active = self
            .policy
            .plan
            .active_stages(&self.context(vehicle, radius, minute));

        let started = Instant::now();
        let mut iterations = 0u64;
        let mut stages = Vec::with_capacity(active.len());
        for stage in active {
            let _stage_span = debug_span!("stage", stage = %stage.kind, units = stage.units).entered();
            let stage_started = Instant::now();
            iterations = iterations.wrapping_add(burn::busy_wait(
                self.policy.unit.saturating_mul(stage.units),
            ));
            let elapsed = stage_started.elapsed();
            debug!(elapsed_ms = elapsed.as_millis() as u64, "stage finished");
            stages.push(StageTiming {
                kind: stage.kind,
                units: stage.units,
                elapsed,
            });
        }

        RideReport {
            vehicle,
            radius,
            minute,
            stages,
            total: started.elapsed(),
            iterations,
        }
    }

    fn context(&self, vehicle: VehicleKind, radius: SearchRadius, minute: u32) -> RideContext<'_> {
        RideContext {
            vehicle,
            radius,
            minute,
            region: &self.policy.region,
        }
    }
}
