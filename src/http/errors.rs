//! Traits an error has to implement to be rendered by `Application`

use hyper::StatusCode;
use serde_json;

/// Http status of an error
pub trait Codeable {
    fn code(&self) -> StatusCode;
}

/// Optional details sent to the client along with the status
pub trait PayloadCarrier {
    fn payload(&self) -> Option<serde_json::Value>;
}

/// Body of every error response
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorMessage {
    pub code: u16,
    pub description: String,
    pub payload: Option<serde_json::Value>,
}
