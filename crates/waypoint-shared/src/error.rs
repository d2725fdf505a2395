use thiserror::Error;

/// A rejected request body, reported to clients as a 422.
///
/// `location` names the check (or the field) that failed so clients can
/// point at the offending input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub location: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: location.into(),
        }
    }
}

/// Malformed scalar inputs that are reported as 400s.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("The `{0}` is not valid")]
    InvalidId(&'static str),

    #[error("The `{0}` is not valid")]
    InvalidDate(&'static str),

    #[error("Coordinates out of range: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
}

/// The password hasher failed; never caused by client input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Password hashing failed: {0}")]
pub struct PasswordError(pub String);
