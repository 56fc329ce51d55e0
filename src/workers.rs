//! Background CPU burners running alongside the HTTP server.
//!
//! Each worker owns its own [`LoadSimulator`], so workers never contend with
//! each other or with HTTP rides.

use rand::seq::SliceRandom;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use strum::IntoEnumIterator;
use tracing::{debug, info, info_span};

use crate::config::WorkersConfig;
use crate::domain::VehicleKind;
use crate::load::{burn, LoadPolicy, LoadSimulator};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub cycles: u64,
    pub rides: u64,
    pub primes_found: u64,
}

pub struct WorkerPool {
    stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<WorkerStats>>,
}

impl WorkerPool {
    pub fn spawn(cfg: &WorkersConfig, policy: &LoadPolicy) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(cfg.threads);
        for id in 0..cfg.threads {
            let worker = Worker {
                id,
                simulator: LoadSimulator::new(policy.clone()),
                interval: Duration::from_millis(cfg.interval_ms),
                fibonacci_n: cfg.fibonacci_n,
                prime_budget: Duration::from_millis(cfg.prime_search_ms),
                stop: stop.clone(),
            };
            let handle = thread::Builder::new()
                .name(format!("load-worker-{id}"))
                .spawn(move || worker.run())?;
            handles.push(handle);
        }
        info!(threads = cfg.threads, "background load workers started");
        Ok(Self { stop, handles })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Signal every worker to stop after its current cycle and wait for them.
    pub fn shutdown(self) -> Vec<WorkerStats> {
        self.stop.store(true, Ordering::SeqCst);
        let stats: Vec<WorkerStats> = self
            .handles
            .into_iter()
            .map(|h| h.join().unwrap_or_default())
            .collect();
        info!(workers = stats.len(), "background load workers stopped");
        stats
    }
}

struct Worker {
    id: usize,
    simulator: LoadSimulator,
    interval: Duration,
    fibonacci_n: u32,
    prime_budget: Duration,
    stop: Arc<AtomicBool>,
}

impl Worker {
    fn run(self) -> WorkerStats {
        let span = info_span!("load_worker", worker = self.id);
        let _entered = span.enter();
        let vehicles: Vec<VehicleKind> = VehicleKind::iter().collect();
        let mut rng = rand::thread_rng();
        let mut stats = WorkerStats::default();

        loop {
            if let Some(&vehicle) = vehicles.choose(&mut rng) {
                self.simulator.run(vehicle, vehicle.default_radius());
                stats.rides += 1;
            }
            let fib = burn::fibonacci(self.fibonacci_n);
            stats.primes_found += burn::count_primes_for(self.prime_budget);
            stats.cycles += 1;
            debug!(cycle = stats.cycles, fib, "worker cycle finished");

            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            if !self.interval.is_zero() {
                thread::sleep(self.interval);
            }
        }
        stats
    }
}
