pub mod environment;
pub mod error;
pub mod health;
pub mod vehicles;

use axum::{routing::get, Router};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::controller::AppState;

pub fn router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.cfg.server.request_timeout_secs);

    Router::new()
        .route("/", get(environment::dump_environment))
        .route("/bike", get(vehicles::order_bike))
        .route("/scooter", get(vehicles::order_scooter))
        .route("/car", get(vehicles::order_car))
        .route("/ride/:vehicle", get(vehicles::order_ride))
        .route("/healthz", get(health::liveness_check))
        .route("/health/live", get(health::liveness_check))
        .route("/health/ready", get(health::readiness_check))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TimeoutLayer::new(timeout)))
        .layer(TraceLayer::new_for_http())
}
