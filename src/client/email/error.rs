use std::fmt;

use failure::{Backtrace, Context, Fail};

use http::client::ErrorKind as HttpErrorKind;

#[derive(Debug)]
pub struct Error {
    inner: Context<ErrorKind>,
}

#[derive(Clone, PartialEq, Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "email client error - not configured")]
    NotConfigured,
    #[fail(display = "email client error - rejected by provider")]
    Rejected,
    #[fail(display = "email client error - internal error")]
    Internal,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorSource {
    #[fail(display = "email client source - http client")]
    HttpClient,
    #[fail(display = "email client source - serde_json")]
    SerdeJson,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorContext {
    #[fail(display = "email client context - api key is missing")]
    ApiKey,
    #[fail(display = "email client context - sender is missing")]
    Sender,
}

derive_error_impls!();

impl From<HttpErrorKind> for ErrorKind {
    fn from(kind: HttpErrorKind) -> Self {
        match kind {
            HttpErrorKind::Api { status, .. } if status >= 400 && status < 500 => ErrorKind::Rejected,
            _ => ErrorKind::Internal,
        }
    }
}
