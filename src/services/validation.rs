//! Input validation errors shared by the account and task services.
//!
//! Always a client-side problem: mapped to 400 `VALIDATION_ERROR`.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("{0} cannot be empty")]
    Empty(&'static str),
    #[error("{field} must be <= {max} chars")]
    TooLong { field: &'static str, max: usize },
    #[error("invalid status '{0}' (expected one of: pending, in_progress, done)")]
    InvalidStatus(String),
    #[error("{0} cannot be set by the client")]
    ReadOnly(&'static str),
    #[error("{0} must be >= 1")]
    NotPositive(&'static str),
    #[error("invalid {0}")]
    Malformed(&'static str),
}

/// Trim `value` and require it to be non-empty.
pub fn required_text(field: &'static str, value: Option<&str>) -> Result<String, ValidationError> {
    let value = value.ok_or(ValidationError::Required(field))?;
    non_empty_text(field, value)
}

pub fn non_empty_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty(field));
    }
    Ok(trimmed.to_string())
}
