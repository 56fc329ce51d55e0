use axum::{
    extract::{Path, Query, State},
    response::Html,
    Json,
};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    api::error::ApiError,
    controller::AppState,
    domain::{SearchRadius, VehicleKind},
    load::RideReport,
};

/// GET /bike
pub async fn order_bike(State(state): State<AppState>) -> Result<Html<&'static str>, ApiError> {
    order(&state, VehicleKind::Bike).await
}

/// GET /scooter
pub async fn order_scooter(
    State(state): State<AppState>,
) -> Result<Html<&'static str>, ApiError> {
    order(&state, VehicleKind::Scooter).await
}

/// GET /car
pub async fn order_car(State(state): State<AppState>) -> Result<Html<&'static str>, ApiError> {
    order(&state, VehicleKind::Car).await
}

#[instrument(skip(state), fields(region = %state.labels.get("region").unwrap_or_default()))]
async fn order(state: &AppState, vehicle: VehicleKind) -> Result<Html<&'static str>, ApiError> {
    state.rides.order(vehicle).await?;
    Ok(Html(vehicle.ordered_html()))
}

#[derive(Debug, Deserialize)]
pub struct RideQuery {
    pub radius: Option<u32>,
}

/// GET /ride/:vehicle?radius=N
///
/// Any vehicle with an explicit search radius; answers with the ride report.
#[instrument(skip(state), fields(region = %state.labels.get("region").unwrap_or_default()))]
pub async fn order_ride(
    State(state): State<AppState>,
    Path(vehicle): Path<String>,
    Query(query): Query<RideQuery>,
) -> Result<Json<RideReport>, ApiError> {
    let vehicle = VehicleKind::parse(&vehicle)?;
    let radius = match query.radius {
        Some(radius) => SearchRadius::new(radius)?,
        None => vehicle.default_radius(),
    };
    let report = state.rides.order_with_radius(vehicle, radius).await?;
    Ok(Json(report))
}
