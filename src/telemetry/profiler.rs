//! Pyroscope push agent.

use anyhow::{Context, Result};
use pyroscope::{pyroscope::PyroscopeAgentRunning, PyroscopeAgent};
use pyroscope_pprofrs::{pprof_backend, PprofConfig};
use tracing::info;

use super::ProfileLabels;
use crate::config::ProfilingConfig;

/// A running agent; samples this process until [`Profiler::stop`].
pub struct Profiler {
    agent: PyroscopeAgent<PyroscopeAgentRunning>,
}

impl Profiler {
    pub fn start(cfg: &ProfilingConfig, labels: &ProfileLabels) -> Result<Option<Self>> {
        if !cfg.enabled {
            info!("profiling agent disabled");
            return Ok(None);
        }

        let mut builder = PyroscopeAgent::builder(
            cfg.server_address.as_str(),
            labels.application_name.as_str(),
        )
        .backend(pprof_backend(PprofConfig::new().sample_rate(cfg.sample_rate)))
        .tags(labels.iter().collect());

        if let Some(user) = basic_auth_user(cfg) {
            builder = builder.basic_auth(
                user,
                cfg.basic_auth_password.as_deref().unwrap_or_default(),
            );
        }

        let agent = builder
            .build()
            .context("failed to build profiling agent")?
            .start()
            .context("failed to start profiling agent")?;

        info!(
            server = %cfg.server_address,
            application = %labels.application_name,
            sample_rate = cfg.sample_rate,
            "profiling agent started"
        );
        Ok(Some(Self { agent }))
    }

    /// Flush the last report and join the agent's threads. Blocks.
    pub fn stop(self) -> Result<()> {
        let ready = self.agent.stop().context("failed to stop profiling agent")?;
        ready.shutdown();
        Ok(())
    }
}

fn basic_auth_user(cfg: &ProfilingConfig) -> Option<&str> {
    cfg.basic_auth_user.as_deref().filter(|u| !u.is_empty())
}
