//! Input validation utilities.
//!
//! Services run these before touching any store, so a rejected request has no side effects.

use crate::error::{ServiceError, ServiceResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Returns the trimmed value of a required field.
///
/// # Arguments
///
/// * `field` - Name used in the `Missing <field>` message.
/// * `value` - The raw request value.
///
/// # Errors
///
/// Returns `ServiceError::MissingField` if the value is absent or blank.
pub fn required(field: &'static str, value: Option<String>) -> ServiceResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ServiceError::MissingField(field)),
    }
}

/// Returns a required field exactly as given.
///
/// Only an absent or empty value is rejected; whitespace is part of the value. Used for
/// secrets, where trimming would change what is stored.
///
/// # Errors
///
/// Returns `ServiceError::MissingField` if the value is absent or empty.
pub fn present(field: &'static str, value: Option<String>) -> ServiceResult<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ServiceError::MissingField(field)),
    }
}

/// Decodes a standard base64 payload, tolerating surrounding whitespace.
///
/// # Errors
///
/// Returns `ServiceError::InvalidInput("Invalid data")` if the payload is not valid base64.
pub fn decode_base64(data: &str) -> ServiceResult<Vec<u8>> {
    STANDARD
        .decode(data.trim())
        .map_err(|_| ServiceError::InvalidInput("Invalid data".into()))
}
