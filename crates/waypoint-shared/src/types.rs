use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::InputError;

/// Parse a client-supplied identifier.
///
/// `what` is the name reported back in the error message, e.g. `id` gives
/// ``The `id` is not valid``.
pub fn parse_id(raw: &str, what: &'static str) -> Result<Uuid, InputError> {
    Uuid::parse_str(raw.trim()).map_err(|_| InputError::InvalidId(what))
}

/// Parse a client-supplied date: RFC 3339 timestamps or plain `YYYY-MM-DD`
/// calendar dates (taken as midnight UTC).
pub fn parse_date(raw: &str, what: &'static str) -> Result<DateTime<Utc>, InputError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or(InputError::InvalidDate(what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "id").unwrap(), id);
        assert_eq!(
            parse_id("000000000000000000000001", "id").unwrap_err(),
            InputError::InvalidId("id")
        );
        assert_eq!(
            parse_id("nope", "id").unwrap_err().to_string(),
            "The `id` is not valid"
        );
    }

    #[test]
    fn test_parse_date_formats() {
        let dt = parse_date("2018-06-01T10:30:00Z", "date").unwrap();
        assert_eq!(dt.hour(), 10);

        let day = parse_date("2018-06-01", "date").unwrap();
        assert_eq!((day.year(), day.month(), day.day()), (2018, 6, 1));
        assert_eq!(day.hour(), 0);

        assert!(parse_date("June 1st", "date").is_err());
    }
}
