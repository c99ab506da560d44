//! Helpers for reading requests and writing responses in controllers

use failure::{Error as FailureError, Fail};
use futures::{Future, IntoFuture, Stream};
use hyper::header::{Authorization, Headers};
use hyper::Body;
use serde::de::DeserializeOwned;
use serde::ser::Serialize;
use serde_json;
use serde_qs;

use super::controller::ControllerFuture;
use errors::Error;

/// Reads the whole body and deserializes it from json
pub fn parse_body<T>(body: Body) -> Box<Future<Item = T, Error = FailureError>>
where
    T: DeserializeOwned + 'static,
{
    Box::new(
        body.concat2()
            .map_err(|e| FailureError::from(e.context(Error::Parse)))
            .and_then(|chunk| String::from_utf8(chunk.to_vec()).map_err(|e| e.context(Error::Parse).into()))
            .and_then(|body| {
                serde_json::from_str::<T>(&body).map_err(|e| {
                    e.context(format!("Could not parse request body: {}", body))
                        .context(Error::Parse)
                        .into()
                })
            }),
    )
}

/// Deserializes the query string, a missing query reads as an empty one
pub fn parse_query<T>(query: Option<&str>) -> Result<T, FailureError>
where
    T: DeserializeOwned,
{
    let query = query.unwrap_or("");
    serde_qs::from_str::<T>(query).map_err(|e| {
        format_err!("{}", e)
            .context(format!("Could not parse query string: {}", query))
            .context(Error::Parse)
            .into()
    })
}

/// Resolves the future and serializes its item into a json response body
pub fn serialize_future<T, E, F>(f: F) -> ControllerFuture
where
    F: IntoFuture<Item = T, Error = E> + 'static,
    F::Future: 'static,
    E: Into<FailureError> + 'static,
    T: Serialize + 'static,
{
    Box::new(f.into_future().map_err(|e| -> FailureError { e.into() }).and_then(|item| {
        serde_json::to_string(&item).map_err(|e| e.context("Could not serialize response").context(Error::Internal).into())
    }))
}

/// Raw value of the `Authorization` header
pub fn authorization(headers: &Headers) -> Option<String> {
    headers.get::<Authorization<String>>().map(|auth| auth.0.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Paging {
        search: Option<String>,
        offset: Option<i64>,
        count: Option<i64>,
    }

    #[test]
    fn test_parse_query() {
        let paging: Paging = parse_query(Some("search=north%20side&offset=20&count=10")).unwrap();
        assert_eq!(
            paging,
            Paging {
                search: Some("north side".to_string()),
                offset: Some(20),
                count: Some(10),
            }
        );
    }

    #[test]
    fn test_parse_missing_query() {
        let paging: Paging = parse_query(None).unwrap();
        assert_eq!(
            paging,
            Paging {
                search: None,
                offset: None,
                count: None,
            }
        );
    }

    #[test]
    fn test_parse_bad_query() {
        let err = parse_query::<Paging>(Some("offset=ten")).unwrap_err();
        let found = err
            .iter_chain()
            .filter_map(|cause| cause.downcast_ref::<::failure::Context<Error>>())
            .any(|ctx| match *ctx.get_context() {
                Error::Parse => true,
                _ => false,
            });
        assert!(found);
    }

    #[test]
    fn test_parse_body() {
        let body = Body::from(r#"{"search": "garage", "offset": 1, "count": 2}"#);
        let paging: Paging = parse_body(body).wait().unwrap();
        assert_eq!(paging.search, Some("garage".to_string()));
        assert!(parse_body::<Paging>(Body::from("{")).wait().is_err());
    }
}
