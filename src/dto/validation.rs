//! Validation helpers for DTOs.

use validator::ValidationError;

use super::parse_rfc3339;

/// Validates that a token-like field holds something other than whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("value must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Validates that a timestamp is RFC 3339, e.g. `2024-05-01T12:00:00Z`.
pub fn validate_rfc3339(value: &str) -> Result<(), ValidationError> {
    parse_rfc3339(value).map(|_| ()).map_err(|parse_err| {
        let mut err = ValidationError::new("rfc3339");
        err.message = Some(format!("expected an RFC 3339 timestamp: {parse_err}").into());
        err
    })
}
