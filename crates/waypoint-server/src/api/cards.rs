//! Card endpoints.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;
use waypoint_shared::constants::DEFAULT_SEARCH_RADIUS_KM;
use waypoint_shared::validation::{
    coordinates, non_empty_string, number, string, tags, validate_card_update,
    validate_new_card, LOCATION_STRING_FIELD,
};
use waypoint_shared::{parse_id, GeoPoint, ValidationError};
use waypoint_store::{CardUpdate, NewCard};

use super::extract::{JsonBody, QueryParams};
use super::{object, AppState};
use crate::auth::AuthUser;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListParams {
    search_term: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
    radius: Option<f64>,
}

/// `GET /api/cards`: all cards, a text search, or a proximity query.
pub(super) async fn list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<Response, ApiError> {
    let db = state.db.lock().await;

    if let Some(term) = params
        .search_term
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Ok(Json(db.search_cards(term)?).into_response());
    }

    match (params.lat, params.lng) {
        (None, None) => Ok(Json(db.list_cards()?).into_response()),
        (Some(lat), Some(lng)) => {
            let center = GeoPoint::new(lat, lng)?;
            let radius = search_radius(params.radius)?;
            Ok(Json(db.cards_near(center, radius)?).into_response())
        }
        _ => Err(ApiError::bad_request("Both `lat` and `lng` are required")),
    }
}

/// A positive radius in km, defaulting when absent.
pub(super) fn search_radius(radius: Option<f64>) -> Result<f64, ApiError> {
    match radius {
        None => Ok(DEFAULT_SEARCH_RADIUS_KM),
        Some(r) if r.is_finite() && r > 0.0 => Ok(r),
        Some(_) => Err(ApiError::bad_request("The `radius` is not valid")),
    }
}

/// `GET /api/cards/:id`
pub(super) async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "id")?;
    let card = state.db.lock().await.get_card(id)?;
    Ok(Json(card).into_response())
}

/// `GET /api/cards/ambassador/:ambassador`
pub(super) async fn list_by_ambassador(
    State(state): State<AppState>,
    Path(ambassador): Path<String>,
) -> Result<Response, ApiError> {
    let ambassador = parse_id(&ambassador, "id")?;
    let cards = state.db.lock().await.list_cards_by_ambassador(ambassador)?;
    if cards.is_empty() {
        return Err(ApiError::NotFound);
    }
    Ok(Json(cards).into_response())
}

/// `POST /api/cards`: the requester becomes the card's ambassador.
pub(super) async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let body = object(body);
    validate_new_card(&body)?;

    let new = NewCard {
        name: string(&body, "name").unwrap_or_default().to_string(),
        description: string(&body, "description").unwrap_or_default().to_string(),
        address: string(&body, "address").unwrap_or_default().to_string(),
        hours: string(&body, "hours").unwrap_or_default().to_string(),
        phone: non_empty_string(&body, "phone").map(str::to_string),
        location: coordinates(&body)?,
        ambassador: user.id,
        tags: tags(&body)?.unwrap_or_default(),
        image: non_empty_string(&body, "image").map(str::to_string),
    };

    let card = state.db.lock().await.create_card(&new)?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/cards/{}", card.id))],
        Json(card),
    ))
}

/// `PUT /api/cards/:id`
pub(super) async fn update(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Response, ApiError> {
    let body = object(body);

    let Some(name) = non_empty_string(&body, "name") else {
        return Err(ApiError::bad_request("Missing `name` in request body"));
    };
    let id = parse_id(&raw_id, "id")?;
    if string(&body, "id") != Some(raw_id.as_str()) {
        return Err(ApiError::bad_request("Id's do not match"));
    }
    validate_card_update(&body)?;

    let ambassador = non_empty_string(&body, "ambassador")
        .map(|raw| parse_id(raw, "ambassador"))
        .transpose()?;

    let update = CardUpdate {
        name: name.to_string(),
        description: string(&body, "description").map(str::to_string),
        address: string(&body, "address").map(str::to_string),
        hours: string(&body, "hours").map(str::to_string),
        phone: string(&body, "phone").map(str::to_string),
        location: coordinates(&body)?,
        ambassador,
        tags: tags(&body)?,
        image: string(&body, "image").map(str::to_string),
    };

    let card = state.db.lock().await.update_card(id, &update)?;
    Ok(Json(card).into_response())
}

/// `PUT /api/cards/:id/rate`
pub(super) async fn rate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Response, ApiError> {
    let body = object(body);
    let rating = match number(&body, "rating") {
        Ok(Some(r)) if r != 0.0 => r,
        Ok(_) => return Err(ApiError::bad_request("Rating is empty")),
        Err(e) => return Err(e.into()),
    };
    let id = parse_id(&id, "id")?;

    let card = state.db.lock().await.rate_card(id, rating)?;
    Ok(Json(card).into_response())
}

/// `PUT /api/cards/:id/tips`
pub(super) async fn add_tip(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Response, ApiError> {
    let body = object(body);
    let tip = match body.get("tips") {
        None | Some(Value::Null) => return Err(ApiError::bad_request("Tips is empty")),
        Some(Value::String(s)) if s.trim().is_empty() => {
            return Err(ApiError::bad_request("Tips is empty"))
        }
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(ValidationError::new(
                "Incorrect field type: expected string",
                LOCATION_STRING_FIELD,
            )
            .into())
        }
    };
    let id = parse_id(&id, "id")?;

    let mut db = state.db.lock().await;
    let card = db.add_tip(id, &tip)?;
    Ok(Json(card).into_response())
}

/// `DELETE /api/cards/:id`
pub(super) async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, "id")?;
    if state.db.lock().await.delete_card(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_radius() {
        assert_eq!(search_radius(None).unwrap(), DEFAULT_SEARCH_RADIUS_KM);
        assert_eq!(search_radius(Some(3.5)).unwrap(), 3.5);
        assert!(search_radius(Some(0.0)).is_err());
        assert!(search_radius(Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_update_body_field_types_checked() {
        let body = object(serde_json::json!({ "name": "x", "hours": 5 }));
        let err = validate_card_update(&body).unwrap_err();
        assert_eq!(err.location, LOCATION_STRING_FIELD);
    }
}
