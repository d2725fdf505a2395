//! # waypoint-shared
//!
//! Types and pure helpers shared by the Waypoint store and server crates:
//! identifier parsing, request validation rules, geographic math and
//! password hashing.

pub mod constants;
pub mod error;
pub mod geo;
pub mod password;
pub mod types;
pub mod validation;

pub use error::{InputError, PasswordError, ValidationError};
pub use geo::{BoundingBox, GeoPoint};
pub use types::{parse_date, parse_id};
