//! Config module contains the top-level config for the app.

use std::env;

use config_crate::{Config as RawConfig, ConfigError, Environment, File};

use http::client::Config as HttpConfig;
use sentry_integration::SentryConfig;

/// Basic settings - HTTP binding, payment and email providers, booking rules
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: Server,
    pub client: Client,
    pub stripe: Stripe,
    pub email: Email,
    pub booking: Booking,
    pub sentry: Option<SentryConfig>,
}

/// Common server settings
#[derive(Debug, Deserialize, Clone)]
pub struct Server {
    pub host: String,
    pub port: String,
    pub database: String,
    pub thread_count: usize,
}

/// Http client settings
#[derive(Debug, Deserialize, Clone)]
pub struct Client {
    pub http_client_retries: usize,
    pub http_client_buffer_size: usize,
    pub timeout_duration_ms: u64,
}

impl From<Client> for HttpConfig {
    fn from(client: Client) -> Self {
        HttpConfig {
            http_client_retries: client.http_client_retries,
            http_client_buffer_size: client.http_client_buffer_size,
            timeout_duration_ms: client.timeout_duration_ms,
        }
    }
}

/// Stripe API access
#[derive(Debug, Deserialize, Clone)]
pub struct Stripe {
    /// e.g. `https://api.stripe.com/v1`
    pub url: String,
    pub secret_key: String,
    /// ISO code in lower case, e.g. `usd`
    pub currency: String,
}

/// SendGrid settings. Emails are not sent until both the key and the sender are set.
#[derive(Debug, Deserialize, Clone)]
pub struct Email {
    pub url: String,
    pub api_key: Option<String>,
    pub sender: Option<String>,
    /// Parking pass page, the payment intent id goes into its `session_id` parameter
    pub pass_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Booking {
    /// Offset of the lots' local time from UTC
    pub utc_offset_minutes: i64,
}

/// Creates new app config struct
/// #Examples
/// ```
/// use parking_lib::config::*;
///
/// let config = Config::new();
/// ```
impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        let mut s = RawConfig::new();
        s.merge(File::with_name("config/base"))?;

        // Note that this file is _optional_
        let env = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        s.merge(File::with_name(&format!("config/{}", env)).required(false))?;

        // Add in settings from the environment (with a prefix of PARKING)
        s.merge(Environment::with_prefix("PARKING").separator("__"))?;

        s.try_into()
    }
}
