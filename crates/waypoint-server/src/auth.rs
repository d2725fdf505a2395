//! Token issuing, verification and the request guard.
//!
//! Tokens are HS256 JWTs carrying `{ user: {email, id}, sub, iat, exp }`.
//! One [`AuthGateway`] is built at start-up from the configured secret and
//! lifetime and shared through the application state.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// The identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub email: String,
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user: AuthUser,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct AuthGateway {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    expiry: Duration,
}

impl AuthGateway {
    pub fn new(secret: &str, expiry: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expiry,
        }
    }

    /// Sign a token for `user` that expires one lifetime from now.
    pub fn issue(&self, user: &AuthUser, subject: &str) -> Result<String, ApiError> {
        self.issue_at(user, subject, chrono::Utc::now().timestamp())
    }

    /// Sign a token as if it had been issued at `issued_at` (unix seconds).
    pub fn issue_at(
        &self,
        user: &AuthUser,
        subject: &str,
        issued_at: i64,
    ) -> Result<String, ApiError> {
        let lifetime = i64::try_from(self.expiry.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            user: user.clone(),
            sub: subject.to_string(),
            iat: issued_at,
            exp: issued_at.saturating_add(lifetime),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
    }

    /// Check signature and expiry. Every failure is [`ApiError::Unauthorized`].
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                ApiError::Unauthorized
            })
    }
}

/// Reject the request with 401 unless it carries a valid bearer token. On
/// success the [`AuthUser`] is stored in the request extensions.
pub async fn require_auth(
    State(auth): State<Arc<AuthGateway>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or(ApiError::Unauthorized)?;
    let claims = auth.verify(token)?;

    req.extensions_mut().insert(claims.user);
    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn user() -> AuthUser {
        AuthUser {
            email: "bob@bob.com".to_string(),
            id: Uuid::new_v4(),
        }
    }

    fn gateway() -> AuthGateway {
        AuthGateway::new("test-secret", Duration::from_secs(3600))
    }

    #[test]
    fn test_issue_then_verify() {
        let auth = gateway();
        let who = user();
        let token = auth.issue(&who, "Bob").unwrap();

        let claims = auth.verify(&token).unwrap();
        assert_eq!(claims.user, who);
        assert_eq!(claims.sub, "Bob");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = gateway().issue(&user(), "Bob").unwrap();
        let other = AuthGateway::new("other-secret", Duration::from_secs(3600));
        assert!(matches!(other.verify(&token), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn test_expired_rejected() {
        let auth = gateway();
        let two_hours_ago = chrono::Utc::now().timestamp() - 7200;
        let token = auth.issue_at(&user(), "Bob", two_hours_ago).unwrap();
        assert!(matches!(auth.verify(&token), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(gateway().verify("not.a.jwt"), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
