//! Transactional email through the SendGrid v3 API.

mod error;
pub mod templates;

use failure::Fail;
use futures::{future, Future, IntoFuture};
use hyper::header::{Authorization, Bearer, ContentType, Headers};
use hyper::Method;
use serde_json;

use config;
use http::client::HttpClient;

pub use self::error::*;

/// Message with both a plain text and an html body
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

pub trait EmailClient: Send + Sync + 'static {
    fn send(&self, email: Email) -> Box<Future<Item = (), Error = Error> + Send>;
}

#[derive(Clone, Debug, Serialize)]
struct Address {
    email: String,
}

#[derive(Clone, Debug, Serialize)]
struct Personalization {
    to: Vec<Address>,
}

#[derive(Clone, Debug, Serialize)]
struct Content {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: String,
}

#[derive(Clone, Debug, Serialize)]
struct MailSend {
    personalizations: Vec<Personalization>,
    from: Address,
    subject: String,
    content: Vec<Content>,
}

impl MailSend {
    fn new(email: Email, sender: String) -> Self {
        MailSend {
            personalizations: vec![Personalization {
                to: vec![Address { email: email.to }],
            }],
            from: Address { email: sender },
            subject: email.subject,
            content: vec![
                Content {
                    content_type: "text/plain",
                    value: email.text,
                },
                Content {
                    content_type: "text/html",
                    value: email.html,
                },
            ],
        }
    }
}

#[derive(Clone)]
pub struct EmailClientImpl<C: HttpClient + Clone> {
    client: C,
    url: String,
    api_key: Option<String>,
    sender: Option<String>,
}

impl<C: HttpClient + Clone> EmailClientImpl<C> {
    pub fn create_from_config(client: C, config: &config::Email) -> Self {
        Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            sender: config.sender.clone(),
        }
    }

    fn credentials(&self) -> Result<(String, String), Error> {
        let api_key = self.api_key.clone().ok_or_else(|| -> Error {
            let e = format_err!("SendGrid api key is not configured");
            ectx!(err e, ErrorContext::ApiKey, ErrorKind::NotConfigured)
        })?;
        let sender = self.sender.clone().ok_or_else(|| -> Error {
            let e = format_err!("SendGrid sender is not configured");
            ectx!(err e, ErrorContext::Sender, ErrorKind::NotConfigured)
        })?;
        Ok((api_key, sender))
    }
}

impl<C: HttpClient + Clone> EmailClient for EmailClientImpl<C> {
    fn send(&self, email: Email) -> Box<Future<Item = (), Error = Error> + Send> {
        let (api_key, sender) = match self.credentials() {
            Ok(credentials) => credentials,
            Err(e) => return Box::new(future::err(e)),
        };
        debug!("Sending email \"{}\" to {}", email.subject, email.to);

        let url = self.url.clone();
        let client = self.client.clone();
        let to = email.to.clone();
        let mut headers = Headers::new();
        headers.set(Authorization(Bearer { token: api_key }));
        headers.set(ContentType::json());

        Box::new(
            serde_json::to_string(&MailSend::new(email, sender))
                .map_err(|e| -> Error { ectx!(err e, ErrorSource::SerdeJson, ErrorKind::Internal) })
                .into_future()
                .and_then(move |body| {
                    client
                        .request(Method::Post, url.clone(), Some(body), Some(headers))
                        .map_err(ectx!(convert ErrorSource::HttpClient => url, to))
                })
                .map(|_| ()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::client::tests::HttpClientMock;

    fn email_config(api_key: Option<&str>, sender: Option<&str>) -> config::Email {
        config::Email {
            url: "https://api.sendgrid.test/v3/mail/send".to_string(),
            api_key: api_key.map(|s| s.to_string()),
            sender: sender.map(|s| s.to_string()),
            pass_url: "https://parking.test/checkout/success".to_string(),
        }
    }

    fn email() -> Email {
        Email {
            to: "driver@example.com".to_string(),
            subject: "Your parking pass".to_string(),
            text: "PARKING PASS: pi_1".to_string(),
            html: "<b>PARKING PASS</b>".to_string(),
        }
    }

    #[test]
    fn test_send_posts_mail_json() {
        let http = HttpClientMock::default();
        http.respond(202, "");
        let client = EmailClientImpl::create_from_config(http.clone(), &email_config(Some("SG.key"), Some("passes@parking.test")));

        client.send(email()).wait().unwrap();

        let sent = http.last_request();
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.url, "https://api.sendgrid.test/v3/mail/send");
        let body: serde_json::Value = serde_json::from_str(&sent.body.unwrap()).unwrap();
        assert_eq!(body["personalizations"][0]["to"][0]["email"], "driver@example.com");
        assert_eq!(body["from"]["email"], "passes@parking.test");
        assert_eq!(body["content"][0]["type"], "text/plain");
        assert_eq!(body["content"][1]["value"], "<b>PARKING PASS</b>");
        let headers = sent.headers.unwrap();
        assert_eq!(
            headers.get::<Authorization<Bearer>>().map(|auth| auth.0.token.clone()),
            Some("SG.key".to_string())
        );
    }

    #[test]
    fn test_missing_credentials_skip_the_provider() {
        let http = HttpClientMock::default();
        for config in vec![email_config(None, Some("passes@parking.test")), email_config(Some("SG.key"), None)] {
            let client = EmailClientImpl::create_from_config(http.clone(), &config);
            let err = client.send(email()).wait().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotConfigured);
        }
        assert!(http.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_rejected_message() {
        let http = HttpClientMock::default();
        http.respond(403, r#"{"errors": [{"message": "The from address does not match a verified Sender Identity"}]}"#);
        let client = EmailClientImpl::create_from_config(http, &email_config(Some("SG.key"), Some("nobody@parking.test")));
        let err = client.send(email()).wait().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);
    }
}
