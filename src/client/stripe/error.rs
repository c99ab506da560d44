use std::fmt;

use failure::{Backtrace, Context, Fail};
use serde_json;
use validator::{ValidationError, ValidationErrors};

use http::client::ErrorKind as HttpErrorKind;

#[derive(Debug)]
pub struct Error {
    inner: Context<ErrorKind>,
}

#[derive(Clone, PartialEq, Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "stripe client error - malformed input")]
    MalformedInput,
    #[fail(display = "stripe client error - unauthorized")]
    Unauthorized,
    #[fail(display = "stripe client error - not found")]
    NotFound,
    #[fail(display = "stripe client error - internal error")]
    Internal,
    #[fail(display = "stripe client error - bad request")]
    Validation(serde_json::Value),
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorSource {
    #[fail(display = "stripe client source - http client")]
    HttpClient,
    #[fail(display = "stripe client source - serde_qs")]
    SerdeQs,
}

derive_error_impls!();

/// Error object of a failed Stripe call
#[derive(Clone, Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Clone, Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<String>,
    decline_code: Option<String>,
    message: Option<String>,
    param: Option<String>,
}

impl From<HttpErrorKind> for ErrorKind {
    fn from(kind: HttpErrorKind) -> Self {
        match kind {
            HttpErrorKind::Api { status: 401, .. } => ErrorKind::Unauthorized,
            HttpErrorKind::Api { status: 404, .. } => ErrorKind::NotFound,
            HttpErrorKind::Api { status, ref body } if status == 400 || status == 402 => validation_kind(status, body),
            _ => ErrorKind::Internal,
        }
    }
}

/// Card declines and invalid parameters are reported back as validation errors
fn validation_kind(status: u16, body: &str) -> ErrorKind {
    let mut error = ValidationError::new("stripe");
    error.add_param("http_status".into(), &status);
    if let Ok(ApiErrorBody { error: api_error }) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = api_error.message {
            error.message = Some(message.into());
        }
        if let Some(code) = api_error.code {
            error.add_param("code".into(), &code);
        }
        if let Some(decline_code) = api_error.decline_code {
            error.add_param("decline_code".into(), &decline_code);
        }
        if let Some(error_type) = api_error.error_type {
            error.add_param("error_type".into(), &error_type);
        }
        if let Some(param) = api_error.param {
            error.add_param("param".into(), &param);
        }
    }
    let mut errors = ValidationErrors::new();
    errors.add("payment", error);
    ErrorKind::Validation(serde_json::to_value(errors).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, body: &str) -> ErrorKind {
        HttpErrorKind::Api {
            status,
            body: body.to_string(),
        }
        .into()
    }

    #[test]
    fn test_card_error_becomes_validation() {
        let body = r#"{"error": {"type": "card_error", "code": "card_declined", "decline_code": "insufficient_funds", "message": "Your card has insufficient funds."}}"#;
        match api(402, body) {
            ErrorKind::Validation(payload) => {
                let error = &payload["payment"][0];
                assert_eq!(error["message"], "Your card has insufficient funds.");
                assert_eq!(error["params"]["decline_code"], "insufficient_funds");
                assert_eq!(error["params"]["http_status"], 402);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_other_statuses() {
        assert_eq!(api(401, "{}"), ErrorKind::Unauthorized);
        assert_eq!(api(404, "{}"), ErrorKind::NotFound);
        assert_eq!(api(500, "{}"), ErrorKind::Internal);
        assert_eq!(ErrorKind::from(HttpErrorKind::Timeout), ErrorKind::Internal);
    }

    #[test]
    fn test_unparsable_error_body_is_still_validation() {
        match api(400, "<html>") {
            ErrorKind::Validation(payload) => assert_eq!(payload["payment"][0]["code"], "stripe"),
            other => panic!("unexpected kind {:?}", other),
        }
    }
}
