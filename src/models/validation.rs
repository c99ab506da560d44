//! Rules shared by the payload validations

use regex::Regex;
use validator::{ValidationError, ValidationErrors};

lazy_static! {
    pub static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[1-9]\d{0,15}$").unwrap();
}

/// Blank strings pass a plain length check
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("must not be blank".into());
        return Err(error);
    }
    Ok(())
}

/// Single-error `ValidationErrors`, for state checks done outside of payload validation
pub fn validation_errors(field: &'static str, code: &'static str, message: String) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    errors.add(field, error);
    errors
}
