//! Outgoing HTTP. `Client` is a worker that owns the hyper client and runs on
//! the reactor; services only hold a `ClientHandle`, which is `Send` and feeds
//! the worker through a channel.

mod error;

use std::time::Duration;

use failure::Fail;
use futures::future::{self, Either, Loop};
use futures::sync::{mpsc, oneshot};
use futures::{Future, Sink, Stream};
use hyper;
use hyper::client::HttpConnector;
use hyper::{Headers, Method, Request, Uri};
use hyper_tls::HttpsConnector;
use serde::de::DeserializeOwned;
use serde_json;
use tokio_core::reactor::{Handle, Timeout};

pub use self::error::*;

const DNS_THREADS: usize = 4;

#[derive(Clone, Debug)]
pub struct Config {
    pub http_client_retries: usize,
    pub http_client_buffer_size: usize,
    pub timeout_duration_ms: u64,
}

/// Status and body of a completed exchange
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

pub type ClientResult = Result<Response, Error>;

pub trait HttpClient: Send + Sync + 'static {
    /// Non-2xx answers are reported as `ErrorKind::Api`
    fn request(
        &self,
        method: Method,
        url: String,
        body: Option<String>,
        headers: Option<Headers>,
    ) -> Box<Future<Item = Response, Error = Error> + Send>;

    fn request_json<T>(
        &self,
        method: Method,
        url: String,
        body: Option<String>,
        headers: Option<Headers>,
    ) -> Box<Future<Item = T, Error = Error> + Send>
    where
        T: DeserializeOwned + Send + 'static,
        Self: Sized,
    {
        Box::new(self.request(method, url, body, headers).and_then(|response| {
            let Response { status, body } = response;
            serde_json::from_str::<T>(&body).map_err(|e| ectx!(err e, ErrorSource::SerdeJson, ErrorKind::Parse => status, body))
        }))
    }
}

struct Payload {
    method: Method,
    url: String,
    body: Option<String>,
    headers: Option<Headers>,
    callback: oneshot::Sender<ClientResult>,
}

type HyperClient = hyper::Client<HttpsConnector<HttpConnector>>;

pub struct Client {
    client: HyperClient,
    tx: mpsc::Sender<Payload>,
    rx: mpsc::Receiver<Payload>,
    handle: Handle,
    max_retries: usize,
    buffer_size: usize,
    timeout_duration_ms: u64,
}

impl Client {
    pub fn new(config: &Config, handle: &Handle) -> Self {
        let (tx, rx) = mpsc::channel::<Payload>(config.http_client_buffer_size);
        let connector = HttpsConnector::new(DNS_THREADS, handle).expect("Failed to create TLS connector");
        let client = hyper::Client::configure().connector(connector).build(handle);

        Client {
            client,
            tx,
            rx,
            handle: handle.clone(),
            max_retries: config.http_client_retries,
            buffer_size: config.http_client_buffer_size,
            timeout_duration_ms: config.timeout_duration_ms,
        }
    }

    pub fn handle(&self) -> ClientHandle {
        ClientHandle {
            tx: self.tx.clone(),
            max_retries: self.max_retries,
        }
    }

    /// Worker stream, has to be spawned on the reactor for handles to get answers
    pub fn stream(self) -> impl Stream<Item = (), Error = ()> {
        let Client {
            client,
            rx,
            handle,
            buffer_size,
            timeout_duration_ms,
            ..
        } = self;

        rx.map(move |payload| Self::send_request(&client, &handle, timeout_duration_ms, payload))
            .buffer_unordered(buffer_size)
    }

    fn send_request(client: &HyperClient, handle: &Handle, timeout_duration_ms: u64, payload: Payload) -> Box<Future<Item = (), Error = ()>> {
        let Payload {
            method,
            url,
            body,
            headers,
            callback,
        } = payload;

        debug!("Sending {} request to {}", method, url);

        let uri = match url.parse::<Uri>() {
            Ok(uri) => uri,
            Err(e) => {
                let _ = callback.send(Err(ectx!(err e, ErrorSource::Hyper, ErrorKind::Internal => url)));
                return Box::new(future::ok(()));
            }
        };

        let timeout = match Timeout::new(Duration::from_millis(timeout_duration_ms), handle) {
            Ok(timeout) => timeout,
            Err(e) => {
                let _ = callback.send(Err(ectx!(err e, ErrorSource::Io, ErrorKind::Internal)));
                return Box::new(future::ok(()));
            }
        };

        let mut req = Request::new(method, uri);
        if let Some(headers) = headers {
            *req.headers_mut() = headers;
        }
        if let Some(body) = body {
            req.set_body(body);
        }

        let exchange: Box<Future<Item = Response, Error = Error>> = Box::new(
            client
                .request(req)
                .map_err(ectx!(ErrorSource::Hyper, ErrorKind::Network))
                .and_then(|res| {
                    let status = res.status();
                    res.body()
                        .concat2()
                        .map_err(ectx!(ErrorSource::Hyper, ErrorKind::Network))
                        .and_then(move |chunk| {
                            String::from_utf8(chunk.to_vec())
                                .map_err(ectx!(ErrorSource::Utf8, ErrorKind::Parse => status))
                                .map(|body| (status, body))
                        })
                })
                .and_then(|(status, body)| {
                    let code = status.as_u16();
                    if status.is_success() {
                        Ok(Response { status: code, body })
                    } else {
                        let e = format_err!("{} answered {}", status, body);
                        Err(ectx!(err e, ErrorKind::Api { status: code, body }))
                    }
                }),
        );

        Box::new(exchange.select2(timeout).then(move |res| {
            let result: ClientResult = match res {
                Ok(Either::A((response, _))) => Ok(response),
                Ok(Either::B((_, _))) => {
                    let e = format_err!("no response in {} ms", timeout_duration_ms);
                    Err(ectx!(err e, ErrorKind::Timeout))
                }
                Err(Either::A((e, _))) => Err(e),
                Err(Either::B((e, _))) => Err(ectx!(err e, ErrorSource::Io, ErrorKind::Internal)),
            };
            if let Err(ref e) = result {
                warn!("Outgoing request failed: {}", e);
            }
            let _ = callback.send(result);
            Ok(())
        }))
    }
}

#[derive(Clone)]
pub struct ClientHandle {
    tx: mpsc::Sender<Payload>,
    max_retries: usize,
}

impl ClientHandle {
    fn send_once(&self, method: Method, url: String, body: Option<String>, headers: Option<Headers>) -> Box<Future<Item = Response, Error = Error> + Send> {
        let (callback, answer) = oneshot::channel();
        let payload = Payload {
            method,
            url,
            body,
            headers,
            callback,
        };

        Box::new(
            self.tx
                .clone()
                .send(payload)
                .map_err(|_| {
                    let e = format_err!("http client worker is gone");
                    ectx!(err e, ErrorKind::Internal)
                })
                .and_then(|_| answer.map_err(ectx!(ErrorKind::Internal)))
                .and_then(|result| result),
        )
    }
}

impl HttpClient for ClientHandle {
    /// Transport failures are retried up to `http_client_retries` times
    fn request(
        &self,
        method: Method,
        url: String,
        body: Option<String>,
        headers: Option<Headers>,
    ) -> Box<Future<Item = Response, Error = Error> + Send> {
        let handle = self.clone();
        let max_retries = self.max_retries;

        Box::new(future::loop_fn(0, move |attempt| {
            handle
                .send_once(method.clone(), url.clone(), body.clone(), headers.clone())
                .then(move |res| match res {
                    Ok(response) => Ok(Loop::Break(response)),
                    Err(ref e) if e.kind().is_transient() && attempt < max_retries => {
                        warn!("Retrying request, attempt {} failed: {}", attempt + 1, e);
                        Ok(Loop::Continue(attempt + 1))
                    }
                    Err(e) => Err(e),
                })
        }))
    }
}
