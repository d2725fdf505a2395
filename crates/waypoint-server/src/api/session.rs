//! Login and token refresh.

use axum::{extract::State, Extension, Json};
use serde::Serialize;
use serde_json::Value;
use waypoint_shared::password::verify_password;
use waypoint_shared::validation::non_empty_string;

use super::extract::JsonBody;
use super::{object, AppState};
use crate::auth::AuthUser;
use crate::error::ApiError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TokenResponse {
    auth_token: String,
}

/// `POST /api/login`
pub(super) async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<TokenResponse>, ApiError> {
    let body = object(body);
    let (Some(email), Some(password)) = (
        non_empty_string(&body, "email"),
        non_empty_string(&body, "password"),
    ) else {
        return Err(ApiError::bad_request("Missing credentials"));
    };

    let user = state.db.lock().await.find_user_by_email(email)?;
    let Some(user) = user else {
        tracing::info!(email, "login rejected: unknown email");
        return Err(ApiError::Unauthorized);
    };

    let password = password.to_string();
    let stored = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| ApiError::Internal(format!("password check task failed: {e}")))?;
    if !verified {
        tracing::info!(email, "login rejected");
        return Err(ApiError::Unauthorized);
    }

    let identity = AuthUser {
        email: user.email.clone(),
        id: user.id,
    };
    let auth_token = state.auth.issue(&identity, &user.name)?;

    tracing::debug!(user = %user.id, "login");
    Ok(Json(TokenResponse { auth_token }))
}

/// `POST /api/refresh`
pub(super) async fn refresh(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<TokenResponse>, ApiError> {
    let auth_token = state.auth.issue(&user, &user.email)?;
    Ok(Json(TokenResponse { auth_token }))
}
