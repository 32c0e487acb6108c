use chrono::{SecondsFormat, TimeZone, Utc};
use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};

use crate::error::ApiError;

pub mod account;
pub mod annual_objective;
pub mod career;
pub mod coaching;
pub mod evaluation;
pub mod objective;
pub mod project;
pub mod project_collaborator;
pub mod role;
pub mod user;
pub mod user_profile;

pub fn parse_id(value: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(value).map_err(|_| ApiError::BadRequest("INVALID_ID"))
}

pub fn parse_optional_id(value: &Option<String>) -> Result<Option<ObjectId>, ApiError> {
    match value.as_deref() {
        Some(value) if !value.is_empty() => parse_id(value).map(Some),
        _ => Ok(None),
    }
}

/// `$dateToString` pattern matching the output of `to_rfc3339`.
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.%LZ";

/// UTC timestamp with millisecond precision, e.g. `2025-03-14T09:26:53.589Z`.
pub fn to_rfc3339(time: &DateTime) -> String {
    Utc.timestamp_millis_opt(time.timestamp_millis())
        .single()
        .map(|time| time.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

/// Aggregation expression rendering a date field the way `to_rfc3339` does.
pub fn date_to_string(field: &str) -> Document {
    doc! {
        "$dateToString": { "date": field, "format": DATE_FORMAT, "timezone": "UTC" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_parsed_or_rejected() {
        let id = ObjectId::new();
        assert_eq!(parse_id(&id.to_hex()).unwrap(), id);
        assert!(matches!(
            parse_id("not-an-id"),
            Err(ApiError::BadRequest("INVALID_ID"))
        ));
        assert_eq!(parse_optional_id(&Some(String::new())).unwrap(), None);
        assert_eq!(parse_optional_id(&None).unwrap(), None);
    }

    #[test]
    fn dates_render_with_milliseconds() {
        assert_eq!(
            to_rfc3339(&DateTime::from_millis(1_741_944_413_589)),
            "2025-03-14T09:26:53.589Z"
        );
        assert_eq!(
            to_rfc3339(&DateTime::from_millis(1_735_689_600_000)),
            "2025-01-01T00:00:00.000Z"
        );
    }

    #[test]
    fn aggregated_dates_use_the_same_format() {
        assert_eq!(
            date_to_string("$created_at"),
            doc! {
                "$dateToString": {
                    "date": "$created_at",
                    "format": "%Y-%m-%dT%H:%M:%S.%LZ",
                    "timezone": "UTC",
                }
            }
        );
    }
}
