use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::controller::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    version: &'static str,
    uptime_seconds: u64,
    checks: HealthChecks,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    simulator: ComponentHealth,
}

/// Health status of a component
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl ComponentHealth {
    fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            detail: None,
        }
    }

    fn busy(detail: impl Into<String>) -> Self {
        Self {
            status: "busy".to_string(),
            detail: Some(detail.into()),
        }
    }
}

/// A held simulator lock means a ride is in flight, which is normal operation.
fn check_simulator(state: &AppState) -> ComponentHealth {
    if state.rides.simulator().is_locked() {
        ComponentHealth::busy("ride in progress")
    } else {
        ComponentHealth::healthy()
    }
}

/// GET /health/ready - Readiness probe
///
/// Always 200 once the router is serving; the body reports simulator activity.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        checks: HealthChecks {
            simulator: check_simulator(&state),
        },
    };
    (StatusCode::OK, Json(response))
}

/// GET /health/live and /healthz - Liveness probe
pub async fn liveness_check() -> impl IntoResponse {
    StatusCode::OK
}
