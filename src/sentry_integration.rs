//! Error reporting to Sentry. Disabled unless a dsn is configured.

use failure::Error as FailureError;
use sentry;
use sentry::integrations::{failure as sentry_failure, panic};

#[derive(Debug, Deserialize, Clone)]
pub struct SentryConfig {
    pub dsn: String,
}

pub fn init(config: Option<&SentryConfig>) -> Option<sentry::internals::ClientInitGuard> {
    config.map(|config| {
        info!("Initializing sentry integration");
        let guard = sentry::init(config.dsn.as_str());
        panic::register_panic_handler();
        guard
    })
}

/// Sends the error with its cause chain, a no-op without an initialized client
pub fn report(error: &FailureError) {
    sentry_failure::capture_error(error);
}
