//! Block endpoints. Every response carries populated cards.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::Value;
use uuid::Uuid;
use waypoint_shared::validation::{non_empty_string, string, Body};
use waypoint_shared::{parse_date, parse_id};
use waypoint_store::{NewBlock, PopulatedBlock};

use super::extract::JsonBody;
use super::{object, AppState};
use crate::auth::AuthUser;
use crate::error::ApiError;

/// `GET /api/blocks`: the blocks of the requester's itinerary.
pub(super) async fn list_mine(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<PopulatedBlock>>, ApiError> {
    let blocks = state.db.lock().await.list_blocks_for_user(user.id)?;
    Ok(Json(blocks))
}

/// `POST /api/block`
pub(super) async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let body = object(body);

    let Some(title) = non_empty_string(&body, "title")
        .map(str::trim)
        .filter(|t| !t.is_empty())
    else {
        return Err(ApiError::bad_request("Must include a title"));
    };
    let date = non_empty_string(&body, "date")
        .map(|raw| parse_date(raw, "date"))
        .transpose()?;

    let new = NewBlock {
        title: title.to_string(),
        date,
    };
    let block = state.db.lock().await.create_block(user.id, &new)?;

    Ok((StatusCode::CREATED, Json(block)))
}

/// `PUT /api/block/:id/cards` with `{card}`
pub(super) async fn add_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "id")?;
    let card = card_field(&object(body))?;

    let block = state.db.lock().await.add_card_to_block(id, card)?;
    Ok((StatusCode::CREATED, Json(block)))
}

/// `PUT /api/block/:id/select` with `{card}`
pub(super) async fn select(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<PopulatedBlock>, ApiError> {
    let id = parse_id(&id, "id")?;
    let card = card_field(&object(body))?;

    let block = state.db.lock().await.select_card(id, card)?;
    Ok(Json(block))
}

/// `PUT /api/block/:id/deselect`
pub(super) async fn deselect(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PopulatedBlock>, ApiError> {
    let id = parse_id(&id, "id")?;
    let block = state.db.lock().await.deselect_card(id)?;
    Ok(Json(block))
}

/// `PUT /api/block/:id/removecard` with `{card}`. Older clients also send
/// the full remaining `cards` list; it is ignored.
pub(super) async fn remove_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<PopulatedBlock>, ApiError> {
    let id = parse_id(&id, "id")?;
    let body = object(body);
    if body.contains_key("cards") {
        tracing::debug!(block = %id, "ignoring client-supplied card list");
    }
    let card = card_field(&body)?;

    let block = state.db.lock().await.remove_card_from_block(id, card)?;
    Ok(Json(block))
}

/// `DELETE /api/block/:id`
pub(super) async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, "id")?;
    if state.db.lock().await.delete_block(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

/// The `card` id carried in a block or itinerary body.
pub(super) fn card_field(body: &Body) -> Result<Uuid, ApiError> {
    let raw = string(body, "card")
        .ok_or_else(|| ApiError::bad_request("Missing `card` in request body"))?;
    Ok(parse_id(raw, "card")?)
}
