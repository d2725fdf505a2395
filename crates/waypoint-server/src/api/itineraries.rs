//! Itinerary endpoints.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use rand::rngs::OsRng;
use serde_json::Value;
use waypoint_shared::validation::{coordinates, non_empty_string, number, tags, Body};
use waypoint_shared::{parse_date, parse_id};
use waypoint_store::{FullItinerary, Itinerary, NewDestination, NewItinerary};

use super::blocks::card_field;
use super::extract::JsonBody;
use super::{object, AppState};
use crate::auth::AuthUser;
use crate::error::ApiError;

/// `GET /api/itinerary`: the requester's itinerary, fully populated.
pub(super) async fn get_mine(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<FullItinerary>, ApiError> {
    let itinerary = state.db.lock().await.full_itinerary_for_user(user.id)?;
    Ok(Json(itinerary))
}

/// `POST /api/itinerary`
pub(super) async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let body = object(body);
    let new = new_itinerary(&body)?;

    let itinerary = state
        .db
        .lock()
        .await
        .create_itinerary(user.id, &new, &mut OsRng)?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/itineraries/{}", itinerary.id))],
        Json(itinerary),
    ))
}

/// `PUT /api/itinerary/:id/cards` with `{card}`
pub(super) async fn add_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "id")?;
    let card = card_field(&object(body))?;

    let itinerary = state.db.lock().await.add_card_to_itinerary(id, card)?;
    Ok((StatusCode::CREATED, Json(itinerary)))
}

/// `GET /api/itineraries`: itineraries assigned to the requesting ambassador.
pub(super) async fn list_assigned(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Itinerary>>, ApiError> {
    let itineraries = state
        .db
        .lock()
        .await
        .list_itineraries_for_ambassador(user.id)?;
    Ok(Json(itineraries))
}

/// `GET /api/itineraries/:id`: only its ambassador and its owner see it.
pub(super) async fn get_one(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<FullItinerary>, ApiError> {
    let id = parse_id(&id, "id")?;

    let db = state.db.lock().await;
    if !db.itinerary_visible_to(id, user.id)? {
        return Err(ApiError::NotFound);
    }
    Ok(Json(db.full_itinerary(id)?))
}

fn new_itinerary(body: &Body) -> Result<NewItinerary, ApiError> {
    let Some(partners) = non_empty_string(body, "partners")
        .map(str::trim)
        .filter(|p| !p.is_empty())
    else {
        return Err(ApiError::bad_request("Must include Partners"));
    };

    let date_start = non_empty_string(body, "dateStart")
        .map(|raw| parse_date(raw, "dateStart"))
        .transpose()?;
    let date_end = non_empty_string(body, "dateEnd")
        .map(|raw| parse_date(raw, "dateEnd"))
        .transpose()?;

    let destination = match non_empty_string(body, "destination").map(str::trim) {
        Some(label) if !label.is_empty() => Some(NewDestination {
            location_name: label.to_string(),
            tags: tags(body)?.unwrap_or_default(),
            location: coordinates(body)?,
            distance: number(body, "distance")?.unwrap_or(0.0),
        }),
        _ => None,
    };

    Ok(NewItinerary {
        partners: partners.to_string(),
        date_start,
        date_end,
        destination,
    })
}
