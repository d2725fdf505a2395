use axum::{extract::State, Json};
use serde::Deserialize;
use waypoint_shared::GeoPoint;
use waypoint_store::NearbyDestination;

use super::cards::search_radius;
use super::extract::QueryParams;
use super::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub(super) struct NearParams {
    lat: Option<f64>,
    lng: Option<f64>,
    radius: Option<f64>,
}

/// `GET /api/destinations?lat&lng&radius`
pub(super) async fn near(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<NearParams>,
) -> Result<Json<Vec<NearbyDestination>>, ApiError> {
    let (Some(lat), Some(lng)) = (params.lat, params.lng) else {
        return Err(ApiError::bad_request("Both `lat` and `lng` are required"));
    };
    let center = GeoPoint::new(lat, lng)?;
    let radius = search_radius(params.radius)?;

    let destinations = state.db.lock().await.destinations_near(center, radius)?;
    Ok(Json(destinations))
}
