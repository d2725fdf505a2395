//! HTTP surface: router assembly, shared state and small request helpers.
//!
//! Everything under `/api` except login and registration sits behind
//! [`require_auth`].

mod blocks;
mod cards;
mod destinations;
mod extract;
mod itineraries;
mod session;
mod users;

use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use waypoint_shared::validation::Body;
use waypoint_store::Database;

use crate::auth::{require_auth, AuthGateway};
use crate::config::ServerConfig;
use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub auth: Arc<AuthGateway>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        let auth = AuthGateway::new(&config.jwt_secret, config.jwt_expiry);
        Self {
            db: Arc::new(Mutex::new(db)),
            auth: Arc::new(auth),
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health_check))
        .route("/api/login", post(session::login))
        .route("/api/users", post(users::register));

    let protected = Router::new()
        .route("/api/refresh", post(session::refresh))
        // Cards
        .route("/api/cards", get(cards::list).post(cards::create))
        .route(
            "/api/cards/:id",
            get(cards::get_one).put(cards::update).delete(cards::remove),
        )
        .route("/api/cards/:id/rate", put(cards::rate))
        .route("/api/cards/:id/tips", put(cards::add_tip))
        .route(
            "/api/cards/ambassador/:ambassador",
            get(cards::list_by_ambassador),
        )
        // Blocks
        .route("/api/blocks", get(blocks::list_mine))
        .route("/api/block", post(blocks::create))
        .route("/api/block/:id", delete(blocks::remove))
        .route("/api/block/:id/cards", put(blocks::add_card))
        .route("/api/block/:id/select", put(blocks::select))
        .route("/api/block/:id/deselect", put(blocks::deselect))
        .route("/api/block/:id/removecard", put(blocks::remove_card))
        // Itineraries
        .route(
            "/api/itinerary",
            get(itineraries::get_mine).post(itineraries::create),
        )
        .route("/api/itinerary/:id/cards", put(itineraries::add_card))
        .route("/api/itineraries", get(itineraries::list_assigned))
        .route("/api/itineraries/:id", get(itineraries::get_one))
        // Destinations
        .route("/api/destinations", get(destinations::near))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .fallback(not_found)
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    match config.client_origin.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => cors.allow_origin(origin),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Invalid CLIENT_ORIGIN, allowing any origin");
            cors.allow_origin(Any)
        }
        None => cors.allow_origin(Any),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// The JSON object of a request body. Anything else reads as an empty
/// object so that field checks report what is missing.
fn object(value: Value) -> Body {
    match value {
        Value::Object(map) => map,
        _ => Body::new(),
    }
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
