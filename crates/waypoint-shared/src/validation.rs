//! Request body validation.
//!
//! Bodies are checked as raw JSON objects so that wrong types can be
//! reported precisely instead of surfacing as deserialization failures.
//! Every check runs before anything is written.

use serde_json::{Map, Value};

use crate::constants::{EMAIL_MIN_LEN, PASSWORD_MAX_LEN, PASSWORD_MIN_LEN};
use crate::error::ValidationError;
use crate::geo::GeoPoint;

pub type Body = Map<String, Value>;

/// String fields a card must carry.
pub const CARD_REQUIRED_FIELDS: [&str; 4] = ["name", "description", "address", "hours"];

/// String fields a card may carry.
pub const CARD_OPTIONAL_FIELDS: [&str; 2] = ["phone", "image"];

const REGISTRATION_FIELDS: [&str; 3] = ["email", "password", "name"];
const REGISTRATION_TRIMMED_FIELDS: [&str; 2] = ["email", "password"];

pub const LOCATION_HAS_FIELDS: &str = "hasFields";
pub const LOCATION_STRING_FIELD: &str = "stringField";
pub const LOCATION_TRIMMED_FIELD: &str = "trimmedField";

/// A value that counts as "not supplied": absent, null, false, zero or "".
fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

fn is_untrimmed(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if s.trim() != s)
}

/// Present, non-null, and not a string.
fn is_wrong_type(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null) | Some(Value::String(_)))
}

/// Validate a card creation body.
pub fn validate_new_card(body: &Body) -> Result<(), ValidationError> {
    if CARD_REQUIRED_FIELDS.iter().any(|f| is_blank(body.get(*f))) {
        return Err(ValidationError::new("Missing field", LOCATION_HAS_FIELDS));
    }

    let all_string_fields = CARD_REQUIRED_FIELDS.iter().chain(CARD_OPTIONAL_FIELDS.iter());

    if all_string_fields.clone().any(|f| is_wrong_type(body.get(*f))) {
        return Err(ValidationError::new(
            "Incorrect field type: expected string",
            LOCATION_STRING_FIELD,
        ));
    }

    if all_string_fields.clone().any(|f| is_untrimmed(body.get(*f))) {
        return Err(ValidationError::new(
            "Field cannot start or end with whitespace",
            LOCATION_TRIMMED_FIELD,
        ));
    }

    coordinates(body)?;
    tags(body)?;
    Ok(())
}

/// Validate the string fields present in a card update body.
///
/// Presence of `name` is checked by the caller since a missing name is a
/// 400, not a 422.
pub fn validate_card_update(body: &Body) -> Result<(), ValidationError> {
    let fields = CARD_REQUIRED_FIELDS
        .iter()
        .chain(CARD_OPTIONAL_FIELDS.iter())
        .chain(std::iter::once(&"ambassador"));

    if fields.clone().any(|f| is_wrong_type(body.get(*f))) {
        return Err(ValidationError::new(
            "Incorrect field type: expected string",
            LOCATION_STRING_FIELD,
        ));
    }
    if fields.clone().any(|f| is_untrimmed(body.get(*f))) {
        return Err(ValidationError::new(
            "Field cannot start or end with whitespace",
            LOCATION_TRIMMED_FIELD,
        ));
    }

    coordinates(body)?;
    tags(body)?;
    Ok(())
}

/// Validate a user registration body.
pub fn validate_registration(body: &Body) -> Result<(), ValidationError> {
    if let Some(field) = REGISTRATION_FIELDS.iter().find(|f| !body.contains_key(**f)) {
        return Err(ValidationError::new(
            format!("Missing {field} in request body"),
            *field,
        ));
    }

    if let Some(field) = REGISTRATION_FIELDS
        .iter()
        .find(|f| !matches!(body.get(**f), Some(Value::String(_))))
    {
        return Err(ValidationError::new(
            format!("{field} must be a string"),
            *field,
        ));
    }

    if let Some(field) = REGISTRATION_TRIMMED_FIELDS
        .iter()
        .find(|f| is_untrimmed(body.get(**f)))
    {
        return Err(ValidationError::new(
            format!("{field} must not have any leading or trailing whitespace"),
            *field,
        ));
    }

    let sizes: [(&str, Option<usize>, Option<usize>); 2] = [
        ("email", Some(EMAIL_MIN_LEN), None),
        ("password", Some(PASSWORD_MIN_LEN), Some(PASSWORD_MAX_LEN)),
    ];
    for (field, min, max) in sizes {
        let len = string(body, field).map(|s| s.chars().count()).unwrap_or(0);
        if let Some(min) = min.filter(|min| len < *min) {
            return Err(ValidationError::new(
                format!("{field} must be {min} characters or longer"),
                field,
            ));
        }
        if let Some(max) = max.filter(|max| len > *max) {
            return Err(ValidationError::new(
                format!("{field} must be {max} characters or smaller"),
                field,
            ));
        }
    }

    match body.get("isAmbassador").or_else(|| body.get("ambassador")) {
        None | Some(Value::Null) | Some(Value::Bool(_)) => Ok(()),
        Some(_) => Err(ValidationError::new(
            "isAmbassador must be a boolean",
            "isAmbassador",
        )),
    }
}

/// Borrow a string field, treating null and non-strings as absent.
pub fn string<'a>(body: &'a Body, field: &str) -> Option<&'a str> {
    body.get(field).and_then(Value::as_str)
}

/// Like [`string`] but also treats "" as absent.
pub fn non_empty_string<'a>(body: &'a Body, field: &str) -> Option<&'a str> {
    string(body, field).filter(|s| !s.is_empty())
}

/// Read an optional numeric field.
pub fn number(body: &Body, field: &str) -> Result<Option<f64>, ValidationError> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(Some).map_err(|_| {
            ValidationError::new(format!("{field} must be a number"), field)
        }),
        Some(_) => Err(ValidationError::new(
            format!("{field} must be a number"),
            field,
        )),
    }
}

/// Read the optional `latitude`/`longitude` pair. Both or neither must be
/// supplied.
pub fn coordinates(body: &Body) -> Result<Option<GeoPoint>, ValidationError> {
    match (number(body, "latitude")?, number(body, "longitude")?) {
        (None, None) => Ok(None),
        (Some(lat), Some(lng)) => GeoPoint::new(lat, lng)
            .map(Some)
            .map_err(|e| ValidationError::new(e.to_string(), "location")),
        _ => Err(ValidationError::new(
            "latitude and longitude must be supplied together",
            "location",
        )),
    }
}

/// Read the optional `tags` array of strings.
pub fn tags(body: &Body) -> Result<Option<Vec<String>>, ValidationError> {
    match body.get("tags") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| ValidationError::new("tags must be strings", "tags"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|tags| Some(tags.into_iter().filter(|t| !t.is_empty()).collect())),
        Some(_) => Err(ValidationError::new("tags must be an array", "tags")),
    }
}
