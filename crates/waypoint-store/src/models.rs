//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` so it can be handed directly to the HTTP
//! layer: identifiers are exposed as `id`, fields are camelCase and the
//! password hash is never serialized.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use waypoint_shared::GeoPoint;

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered account. Ambassadors may own cards and are assigned to
/// itineraries.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_ambassador: bool,
    /// The user's current itinerary, if any.
    pub itinerary: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert a [`User`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub is_ambassador: bool,
}

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

/// A point of interest owned by an ambassador.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub address: String,
    pub hours: String,
    pub phone: Option<String>,
    pub location: Option<GeoPoint>,
    pub ambassador: Uuid,
    pub rating_score: f64,
    pub rating_count: i64,
    /// `rating_score / rating_count`; derived on read, never stored.
    pub average_rating: Option<f64>,
    pub tips: Vec<String>,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert a [`Card`].
#[derive(Debug, Clone)]
pub struct NewCard {
    pub name: String,
    pub description: String,
    pub address: String,
    pub hours: String,
    pub phone: Option<String>,
    pub location: Option<GeoPoint>,
    pub ambassador: Uuid,
    pub tags: Vec<String>,
    pub image: Option<String>,
}

/// Partial card update. `None` leaves a column unchanged.
#[derive(Debug, Clone, Default)]
pub struct CardUpdate {
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub hours: Option<String>,
    pub phone: Option<String>,
    pub location: Option<GeoPoint>,
    pub ambassador: Option<Uuid>,
    pub tags: Option<Vec<String>>,
    pub image: Option<String>,
}

/// A card returned by a text search with its relevance (higher is better).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoredCard {
    #[serde(flatten)]
    pub card: Card,
    pub score: f64,
}

/// A card returned by a proximity query.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NearbyCard {
    #[serde(flatten)]
    pub card: Card,
    pub distance_km: f64,
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A dated grouping of candidate cards with at most one selected card.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: Uuid,
    pub title: String,
    pub date: Option<DateTime<Utc>>,
    pub cards: Vec<Uuid>,
    pub selected_card: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert a [`Block`].
#[derive(Debug, Clone)]
pub struct NewBlock {
    pub title: String,
    pub date: Option<DateTime<Utc>>,
}

/// A block with its card references expanded.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedBlock {
    pub id: Uuid,
    pub title: String,
    pub date: Option<DateTime<Utc>>,
    pub cards: Vec<Card>,
    pub selected_card: Option<Card>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Destination
// ---------------------------------------------------------------------------

/// The named place an itinerary travels to.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub id: Uuid,
    pub location_name: String,
    pub tags: Vec<String>,
    pub location: Option<GeoPoint>,
    pub distance: f64,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert a [`Destination`].
#[derive(Debug, Clone)]
pub struct NewDestination {
    pub location_name: String,
    pub tags: Vec<String>,
    pub location: Option<GeoPoint>,
    pub distance: f64,
}

/// A destination returned by a proximity query.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NearbyDestination {
    #[serde(flatten)]
    pub destination: Destination,
    pub distance_km: f64,
}

// ---------------------------------------------------------------------------
// Itinerary
// ---------------------------------------------------------------------------

/// A trip plan with references kept as ids.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    pub id: Uuid,
    pub partners: String,
    pub ambassador: Option<Uuid>,
    pub destination: Option<Uuid>,
    pub blocks: Vec<Uuid>,
    pub cards: Vec<Uuid>,
    pub date_start: Option<DateTime<Utc>>,
    pub date_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to create an [`Itinerary`].
#[derive(Debug, Clone)]
pub struct NewItinerary {
    pub partners: String,
    pub date_start: Option<DateTime<Utc>>,
    pub date_end: Option<DateTime<Utc>>,
    pub destination: Option<NewDestination>,
}

/// An itinerary with ambassador, destination and blocks (and their cards)
/// expanded.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FullItinerary {
    pub id: Uuid,
    pub partners: String,
    pub ambassador: Option<User>,
    pub destination: Option<Destination>,
    pub blocks: Vec<PopulatedBlock>,
    pub cards: Vec<Uuid>,
    pub date_start: Option<DateTime<Utc>>,
    pub date_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
