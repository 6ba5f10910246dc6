//! Shared validation helpers for inbound HTTP adapters.

use serde_json::json;
use uuid::Uuid;

use crate::domain::Error;

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(self) -> &'static str {
        self.0
    }
}

pub(crate) fn parse_uuid(value: &str, field: FieldName) -> Result<Uuid, Error> {
    Uuid::parse_str(value).map_err(|_| {
        let name = field.as_str();
        Error::invalid_request(format!("{name} must be a valid UUID")).with_details(json!({
            "field": name,
            "value": value,
            "code": "invalid_uuid",
        }))
    })
}

pub(crate) fn require_positive(value: u32, field: FieldName) -> Result<u32, Error> {
    if value == 0 {
        let name = field.as_str();
        return Err(
            Error::invalid_request(format!("{name} must be at least 1")).with_details(json!({
                "field": name,
                "code": "out_of_range",
            })),
        );
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_uuid_accepts_canonical_form() {
        let parsed = parse_uuid("3fa85f64-5717-4562-b3fc-2c963f66afa6", FieldName::new("id"))
            .expect("valid uuid");
        assert_eq!(parsed.to_string(), "3fa85f64-5717-4562-b3fc-2c963f66afa6");
    }

    #[test]
    fn parse_uuid_reports_the_field() {
        let error = parse_uuid("nope", FieldName::new("merchantId")).expect_err("invalid uuid");
        let details = error.details().expect("details attached");
        assert_eq!(
            details.get("field").and_then(serde_json::Value::as_str),
            Some("merchantId")
        );
    }

    #[test]
    fn require_positive_rejects_zero() {
        let error = require_positive(0, FieldName::new("delta")).expect_err("zero rejected");
        assert_eq!(error.code(), crate::domain::ErrorCode::InvalidRequest);
    }
}
