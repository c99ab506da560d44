//! Hyper service wrapping a `Controller`: logs requests and turns
//! controller errors into json error responses.

use std::marker::PhantomData;
use std::time::Instant;

use failure::{Context, Error as FailureError, Fail};
use futures::Future;
use hyper;
use hyper::header::{ContentLength, ContentType};
use hyper::server::{Request, Response, Service};
use hyper::StatusCode;
use serde_json;

use super::errors::{Codeable, ErrorMessage, PayloadCarrier};
use sentry_integration;

/// Serialized response body or the error chain of a failed request
pub type ControllerFuture = Box<Future<Item = String, Error = FailureError>>;

pub trait Controller {
    fn call(&self, request: Request) -> ControllerFuture;
}

pub struct Application<E> {
    controller: Box<Controller>,
    _error: PhantomData<E>,
}

impl<E> Application<E>
where
    E: Fail + Codeable + PayloadCarrier,
{
    pub fn new<C: Controller + 'static>(controller: C) -> Self {
        Application {
            controller: Box::new(controller),
            _error: PhantomData,
        }
    }
}

impl<E> Service for Application<E>
where
    E: Fail + Codeable + PayloadCarrier,
{
    type Request = Request;
    type Response = Response;
    type Error = hyper::Error;
    type Future = Box<Future<Item = Response, Error = hyper::Error>>;

    fn call(&self, req: Request) -> Self::Future {
        let method = req.method().clone();
        let uri = req.uri().clone();
        let started_at = Instant::now();
        debug!("Received request {} {}", method, uri);

        Box::new(self.controller.call(req).then(move |res| {
            let (status, body) = match res {
                Ok(body) => (StatusCode::Ok, body),
                Err(error) => {
                    let (status, message) = error_message::<E>(&error);
                    if status.is_server_error() {
                        error!("{} {} failed: {}", method, uri, chain_to_string(&error));
                        sentry_integration::report(&error);
                    } else {
                        warn!("{} {} rejected: {}", method, uri, chain_to_string(&error));
                    }
                    let body = serde_json::to_string(&message).unwrap_or_else(|_| String::from("{}"));
                    (status, body)
                }
            };

            let elapsed = started_at.elapsed();
            info!(
                "{} {} - {} in {}.{:03}s",
                method,
                uri,
                status.as_u16(),
                elapsed.as_secs(),
                elapsed.subsec_nanos() / 1_000_000
            );

            Ok(Response::new()
                .with_status(status)
                .with_header(ContentType::json())
                .with_header(ContentLength(body.len() as u64))
                .with_body(body))
        }))
    }
}

/// Picks the outermost `E` of the chain, anything else is an internal error
pub fn error_message<E>(error: &FailureError) -> (StatusCode, ErrorMessage)
where
    E: Fail + Codeable + PayloadCarrier,
{
    let found = error
        .iter_chain()
        .filter_map(|cause| {
            cause
                .downcast_ref::<E>()
                .or_else(|| cause.downcast_ref::<Context<E>>().map(|ctx| ctx.get_context()))
        })
        .next();

    match found {
        Some(e) => {
            let status = e.code();
            let message = ErrorMessage {
                code: status.as_u16(),
                description: e.to_string(),
                payload: e.payload(),
            };
            (status, message)
        }
        None => {
            let status = StatusCode::InternalServerError;
            let message = ErrorMessage {
                code: status.as_u16(),
                description: "Internal server error".to_string(),
                payload: None,
            };
            (status, message)
        }
    }
}

fn chain_to_string(error: &FailureError) -> String {
    error.iter_chain().map(|cause| cause.to_string()).collect::<Vec<_>>().join("; ")
}
