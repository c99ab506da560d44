use hyper::StatusCode;
use serde_json;

use http::errors::{Codeable, PayloadCarrier};
use services::ErrorKind as ServiceErrorKind;

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "Not found")]
    NotFound,
    #[fail(display = "Parse error")]
    Parse,
    #[fail(display = "Validation error")]
    Validate(serde_json::Value),
    #[fail(display = "Server is refusing to fullfil the reqeust")]
    Forbidden,
    #[fail(display = "Internal server error")]
    Internal,
}

impl Codeable for Error {
    fn code(&self) -> StatusCode {
        match *self {
            Error::NotFound => StatusCode::NotFound,
            Error::Validate(_) => StatusCode::BadRequest,
            Error::Parse => StatusCode::UnprocessableEntity,
            Error::Internal => StatusCode::InternalServerError,
            Error::Forbidden => StatusCode::Forbidden,
        }
    }
}

impl PayloadCarrier for Error {
    fn payload(&self) -> Option<serde_json::Value> {
        match *self {
            Error::Validate(ref e) => Some(e.clone()),
            _ => None,
        }
    }
}

impl From<ServiceErrorKind> for Error {
    fn from(kind: ServiceErrorKind) -> Self {
        match kind {
            ServiceErrorKind::NotFound => Error::NotFound,
            ServiceErrorKind::Forbidden => Error::Forbidden,
            ServiceErrorKind::MalformedInput => Error::Parse,
            ServiceErrorKind::Validation(payload) => Error::Validate(payload),
            ServiceErrorKind::Internal => Error::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_errors_map_to_statuses() {
        let cases = vec![
            (ServiceErrorKind::NotFound, StatusCode::NotFound),
            (ServiceErrorKind::Forbidden, StatusCode::Forbidden),
            (ServiceErrorKind::MalformedInput, StatusCode::UnprocessableEntity),
            (ServiceErrorKind::Validation(json!({"email": []})), StatusCode::BadRequest),
            (ServiceErrorKind::Internal, StatusCode::InternalServerError),
        ];
        for (kind, status) in cases {
            assert_eq!(Error::from(kind).code(), status);
        }
    }

    #[test]
    fn test_only_validation_carries_payload() {
        let payload = json!({"max_hours": [{"code": "range"}]});
        assert_eq!(Error::Validate(payload.clone()).payload(), Some(payload));
        assert_eq!(Error::Forbidden.payload(), None);
    }
}
