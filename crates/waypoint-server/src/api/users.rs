use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use waypoint_shared::password::hash_password;
use waypoint_shared::validation::{string, validate_registration};
use waypoint_store::NewUser;

use super::extract::JsonBody;
use super::{object, AppState};
use crate::error::ApiError;

/// `POST /api/users`
pub(super) async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let body = object(body);
    validate_registration(&body)?;

    let email = string(&body, "email").unwrap_or_default();
    let password = string(&body, "password").unwrap_or_default();
    let name = string(&body, "name").unwrap_or_default().trim();
    let is_ambassador = body
        .get("isAmbassador")
        .or_else(|| body.get("ambassador"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let password = password.to_string();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("password hashing task failed: {e}")))??;

    let new = NewUser {
        email: email.to_string(),
        name: name.to_string(),
        password_hash,
        is_ambassador,
    };

    let user = state.db.lock().await.create_user(&new)?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/users/{}", user.id))],
        Json(user),
    ))
}
