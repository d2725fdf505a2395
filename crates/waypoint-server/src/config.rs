//! Server configuration loaded from environment variables.
//!
//! All settings have defaults so the server can start with zero
//! configuration for local development. A `.env` file is read by the
//! binaries before this runs.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use waypoint_shared::constants::{DEFAULT_HTTP_PORT, DEFAULT_JWT_EXPIRY};

/// Signing secret used when `JWT_SECRET` is unset. Development only.
pub const DEV_JWT_SECRET: &str = "waypoint-dev-secret-change-me";

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `None` (the platform data directory).
    pub database_path: Option<PathBuf>,

    /// HMAC secret for signing tokens.
    /// Env: `JWT_SECRET`
    pub jwt_secret: String,

    /// Token lifetime.
    /// Env: `JWT_EXPIRY` (`7d`, `12h`, `30m`, `45s` or bare seconds)
    /// Default: 7 days
    pub jwt_expiry: Duration,

    /// Origin allowed by CORS.
    /// Env: `CLIENT_ORIGIN`
    /// Default: any origin.
    pub client_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expiry: Duration::from_secs(7 * 24 * 60 * 60),
            client_origin: None,
        }
    }
}

// The secret stays out of logs.
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("database_path", &self.database_path)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_expiry", &self.jwt_expiry)
            .field("client_origin", &self.client_origin)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => config.jwt_secret = secret,
            _ => tracing::warn!("JWT_SECRET not set, using the development secret"),
        }

        let expiry = std::env::var("JWT_EXPIRY").unwrap_or_else(|_| DEFAULT_JWT_EXPIRY.into());
        match parse_expiry(&expiry) {
            Ok(duration) => config.jwt_expiry = duration,
            Err(e) => {
                tracing::warn!(value = %expiry, error = %e, "Invalid JWT_EXPIRY, using default");
            }
        }

        if let Ok(origin) = std::env::var("CLIENT_ORIGIN") {
            if !origin.is_empty() {
                config.client_origin = Some(origin);
            }
        }

        config
    }
}

/// Parse a token lifetime such as `7d`, `12h`, `30m`, `45s` or `3600`.
pub fn parse_expiry(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    let (digits, unit) = match value.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&value[..idx], c),
        Some(_) => (value, 's'),
        None => return Err("empty duration".to_string()),
    };

    let amount: u64 = digits
        .parse()
        .map_err(|_| format!("expected a whole number, got {digits:?}"))?;
    let unit_secs = match unit.to_ascii_lowercase() {
        'd' => 24 * 60 * 60,
        'h' => 60 * 60,
        'm' => 60,
        's' => 1,
        other => return Err(format!("unknown unit {other:?}")),
    };

    match amount.checked_mul(unit_secs) {
        Some(0) => Err("duration must be positive".to_string()),
        Some(secs) => Ok(Duration::from_secs(secs)),
        None => Err("duration too large".to_string()),
    }
}
