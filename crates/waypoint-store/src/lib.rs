//! # waypoint-store
//!
//! Persistence for Waypoint, backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model, the nested itinerary population used by read endpoints, and the
//! text/proximity searches over cards and destinations.

pub mod blocks;
pub mod cards;
pub mod database;
pub mod destinations;
pub mod itineraries;
pub mod migrations;
pub mod models;
pub mod population;
pub mod users;

mod error;
mod row;
#[cfg(test)]
mod test_support;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
