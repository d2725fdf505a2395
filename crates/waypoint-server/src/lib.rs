//! # waypoint-server
//!
//! REST API for Waypoint, a travel itinerary planner.
//!
//! This crate provides:
//! - **Auth**: HS256 bearer tokens issued at login and checked by a
//!   middleware on every protected route
//! - **Cards**: points of interest owned by ambassadors, with ratings, tips,
//!   weighted text search and proximity search
//! - **Blocks and itineraries**: a user's trip plan, read back fully
//!   populated
//!
//! The binaries (`waypoint-server`, `waypoint-seed`) are thin wrappers
//! around [`build_router`] and the store.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;

use tracing_subscriber::EnvFilter;

pub use api::{build_router, serve, AppState};
pub use auth::{AuthGateway, AuthUser};
pub use config::ServerConfig;
pub use error::ApiError;

/// Initialize tracing for the binaries (respects `RUST_LOG`).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,waypoint_server=debug")),
        )
        .init();
}

/// Open the configured database, or the platform default when no path is
/// set.
pub fn open_database(config: &ServerConfig) -> waypoint_store::Result<waypoint_store::Database> {
    match &config.database_path {
        Some(path) => waypoint_store::Database::open_at(path),
        None => waypoint_store::Database::new(),
    }
}
