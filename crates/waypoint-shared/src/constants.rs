/// Application name
pub const APP_NAME: &str = "Waypoint";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default token lifetime, in the `JWT_EXPIRY` notation
pub const DEFAULT_JWT_EXPIRY: &str = "7d";

/// Registration size limits (characters)
pub const EMAIL_MIN_LEN: usize = 5;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 72;

/// Mean Earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Radius used by proximity queries when the caller gives none (km)
pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 25.0;

/// Full-text search weights per indexed card column
pub const SEARCH_WEIGHT_NAME: f64 = 10.0;
pub const SEARCH_WEIGHT_TAGS: f64 = 5.0;
pub const SEARCH_WEIGHT_DESCRIPTION: f64 = 2.0;
pub const SEARCH_WEIGHT_TIPS: f64 = 1.0;
