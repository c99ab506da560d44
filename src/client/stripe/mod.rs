//! Stripe PaymentIntents over the REST API. Requests are form encoded,
//! nested maps use the bracket notation (`metadata[lot_id]=...`).

mod error;
mod types;

use failure::Fail;
use futures::{Future, IntoFuture};
use hyper::header::{Authorization, Bearer, ContentType, Headers};
use hyper::Method;
use serde_qs;

use config;
use http::client::HttpClient;
use models::PaymentIntentId;

pub use self::error::*;
pub use self::types::*;

pub trait StripeClient: Send + Sync + 'static {
    fn create_payment_intent(&self, input: NewPaymentIntent) -> Box<Future<Item = PaymentIntent, Error = Error> + Send>;

    fn get_payment_intent(&self, payment_intent_id: PaymentIntentId) -> Box<Future<Item = PaymentIntent, Error = Error> + Send>;
}

#[derive(Clone)]
pub struct StripeClientImpl<C: HttpClient + Clone> {
    client: C,
    url: String,
    secret_key: String,
}

impl<C: HttpClient + Clone> StripeClientImpl<C> {
    pub fn create_from_config(client: C, config: &config::Stripe) -> Self {
        Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        }
    }

    fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.set(Authorization(Bearer {
            token: self.secret_key.clone(),
        }));
        headers
    }
}

impl<C: HttpClient + Clone> StripeClient for StripeClientImpl<C> {
    fn create_payment_intent(&self, input: NewPaymentIntent) -> Box<Future<Item = PaymentIntent, Error = Error> + Send> {
        debug!("Creating payment intent of {} {}", input.amount, input.currency);

        let url = format!("{}/payment_intents", self.url);
        let mut headers = self.headers();
        headers.set(ContentType::form_url_encoded());
        headers.set_raw("Idempotency-Key", input.idempotency_key.clone());

        let client = self.client.clone();
        Box::new(
            serde_qs::to_string(&input)
                .map_err(|e| -> Error {
                    let e = format_err!("{}", e);
                    ectx!(err e, ErrorSource::SerdeQs, ErrorKind::MalformedInput => input)
                })
                .into_future()
                .and_then(move |body| {
                    client
                        .request_json::<PaymentIntent>(Method::Post, url.clone(), Some(body), Some(headers))
                        .map_err(ectx!(convert ErrorSource::HttpClient => url))
                }),
        )
    }

    fn get_payment_intent(&self, payment_intent_id: PaymentIntentId) -> Box<Future<Item = PaymentIntent, Error = Error> + Send> {
        debug!("Getting payment intent {}", payment_intent_id);

        let url = format!("{}/payment_intents/{}", self.url, payment_intent_id);
        Box::new(
            self.client
                .request_json::<PaymentIntent>(Method::Get, url.clone(), None, Some(self.headers()))
                .map_err(ectx!(convert ErrorSource::HttpClient => url)),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use http::client::tests::HttpClientMock;
    use models::{Amount, PaymentIntentStatus};

    fn stripe_config() -> config::Stripe {
        config::Stripe {
            url: "https://api.stripe.test/v1/".to_string(),
            secret_key: "sk_test_123".to_string(),
            currency: "usd".to_string(),
        }
    }

    fn new_intent() -> NewPaymentIntent {
        let mut metadata = BTreeMap::new();
        metadata.insert("lot_id".to_string(), "7d3c".to_string());
        metadata.insert("license_plate".to_string(), "ABC 123".to_string());
        NewPaymentIntent {
            amount: Amount::from_dollars(12),
            currency: "usd".to_string(),
            receipt_email: Some("driver@example.com".to_string()),
            description: None,
            metadata,
            idempotency_key: "order-1".to_string(),
        }
    }

    const INTENT: &str = r#"{
        "id": "pi_123",
        "object": "payment_intent",
        "amount": 1200,
        "currency": "usd",
        "status": "requires_payment_method",
        "client_secret": "pi_123_secret_456",
        "receipt_email": "driver@example.com",
        "metadata": {"lot_id": "7d3c"}
    }"#;

    #[test]
    fn test_create_is_form_encoded() {
        let http = HttpClientMock::default();
        http.respond(200, INTENT);
        let client = StripeClientImpl::create_from_config(http.clone(), &stripe_config());

        let intent = client.create_payment_intent(new_intent()).wait().unwrap();
        assert_eq!(intent.id, PaymentIntentId::new("pi_123".to_string()));
        assert_eq!(intent.status, PaymentIntentStatus::RequiresPaymentMethod);
        assert_eq!(intent.client_secret, Some("pi_123_secret_456".to_string()));

        let sent = http.last_request();
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.url, "https://api.stripe.test/v1/payment_intents");
        let body = sent.body.unwrap();
        assert!(body.contains("amount=1200"));
        assert!(body.contains("currency=usd"));
        assert!(body.contains("metadata[lot_id]=7d3c") || body.contains("metadata%5Blot_id%5D=7d3c"));
        assert!(!body.contains("description"));
        assert!(!body.contains("idempotency"));

        let headers = sent.headers.unwrap();
        assert_eq!(
            headers.get::<Authorization<Bearer>>().map(|auth| auth.0.token.clone()),
            Some("sk_test_123".to_string())
        );
        assert!(headers.get_raw("Idempotency-Key").is_some());
    }

    #[test]
    fn test_get_uses_intent_url() {
        let http = HttpClientMock::default();
        http.respond(200, INTENT);
        let client = StripeClientImpl::create_from_config(http.clone(), &stripe_config());

        client.get_payment_intent(PaymentIntentId::new("pi_123".to_string())).wait().unwrap();
        let sent = http.last_request();
        assert_eq!(sent.method, Method::Get);
        assert_eq!(sent.url, "https://api.stripe.test/v1/payment_intents/pi_123");
        assert!(sent.body.is_none());
    }

    #[test]
    fn test_missing_intent_is_not_found() {
        let http = HttpClientMock::default();
        http.respond(404, r#"{"error": {"type": "invalid_request_error", "code": "resource_missing"}}"#);
        let client = StripeClientImpl::create_from_config(http, &stripe_config());

        let err = client.get_payment_intent(PaymentIntentId::new("pi_404".to_string())).wait().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
