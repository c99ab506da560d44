use std::fmt;

use failure::{Backtrace, Context, Fail};

#[derive(Debug)]
pub struct Error {
    inner: Context<ErrorKind>,
}

#[derive(Clone, PartialEq, Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "http client error - network")]
    Network,
    #[fail(display = "http client error - timeout")]
    Timeout,
    #[fail(display = "http client error - api responded with {}", status)]
    Api { status: u16, body: String },
    #[fail(display = "http client error - failed to parse response")]
    Parse,
    #[fail(display = "http client error - internal")]
    Internal,
}

impl ErrorKind {
    /// Failures where the request may not have reached the remote side
    pub fn is_transient(&self) -> bool {
        match *self {
            ErrorKind::Network | ErrorKind::Timeout => true,
            _ => false,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorSource {
    #[fail(display = "http client source - hyper")]
    Hyper,
    #[fail(display = "http client source - io")]
    Io,
    #[fail(display = "http client source - utf8")]
    Utf8,
    #[fail(display = "http client source - serde_json")]
    SerdeJson,
}

derive_error_impls!();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_errors_are_transient() {
        assert!(ErrorKind::Network.is_transient());
        assert!(ErrorKind::Timeout.is_transient());
        assert!(!ErrorKind::Parse.is_transient());
        assert!(!ErrorKind::Api {
            status: 502,
            body: String::new()
        }
        .is_transient());
    }
}
