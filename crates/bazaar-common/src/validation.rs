//! Input validation utilities.
//!
//! Centralized validation helpers used by the send path and the service layer.

use validator::Validate;

use crate::error::BazaarError;

/// Validate a request body, returning a BazaarError::Validation on failure.
pub fn validate_request<T: Validate>(body: &T) -> Result<(), BazaarError> {
    body.validate().map_err(|e| BazaarError::Validation {
        message: format_validation_errors(e),
    })
}

/// Format validation errors into a human-readable string.
fn format_validation_errors(errors: validator::ValidationErrors) -> String {
    let mut messages = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for '{field}'"))
            })
        })
        .collect::<Vec<_>>();
    messages.sort();
    messages.join("; ")
}

/// Validate a message body against the configured length ceiling.
pub fn validate_body(body: &str, max_len: u32) -> Result<(), BazaarError> {
    if body.trim().is_empty() {
        return Err(BazaarError::Validation {
            message: "Message cannot be empty or whitespace only".into(),
        });
    }
    let len = body.chars().count();
    if len > max_len as usize {
        return Err(BazaarError::Validation {
            message: format!("Message is {len} characters, limit is {max_len}"),
        });
    }
    Ok(())
}

/// Validate that a channel hash looks like a content address (no whitespace, bounded length).
pub fn validate_channel_hash(hash: &str) -> Result<(), BazaarError> {
    if hash.is_empty() || hash.len() > 128 {
        return Err(BazaarError::Validation {
            message: "Channel hash must be 1-128 characters".into(),
        });
    }
    if !hash.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(BazaarError::Validation {
            message: "Channel hash can only contain ASCII letters and digits".into(),
        });
    }
    Ok(())
}
