//! Parking is a booking backend for parking lots. Customers browse lots, pick
//! a price tier of a schedule that is bookable right now and pay for it with a
//! Stripe PaymentIntent; operators manage lots, schedules, prices, orders and staff.
//!
//! Requests flow through `Application -> Controller -> Service -> Repo + clients`.
//! Every layer has its own `Error` and only converts the errors of the layer
//! right below it, so the controller sees service errors and nothing else.

extern crate chrono;
extern crate config as config_crate;
#[macro_use]
extern crate derive_more;
#[macro_use]
extern crate diesel;
extern crate env_logger;
#[macro_use]
extern crate failure;
extern crate futures;
extern crate futures_cpupool;
extern crate hyper;
extern crate hyper_tls;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
extern crate r2d2;
extern crate r2d2_diesel;
extern crate regex;
extern crate sentry;
extern crate serde;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate serde_json;
extern crate serde_qs;
extern crate tokio_core;
extern crate tokio_signal;
extern crate uuid;
extern crate validator;
#[macro_use]
extern crate validator_derive;

#[macro_use]
pub mod macros;
pub mod client;
pub mod config;
pub mod controller;
pub mod errors;
pub mod http;
pub mod logger;
pub mod models;
pub mod repos;
pub mod router;
pub mod schema;
pub mod sentry_integration;
pub mod services;

use std::process;
use std::sync::Arc;

use diesel::pg::PgConnection;
use futures::{Future, Stream};
use futures_cpupool::CpuPool;
use hyper::server::Http;
use r2d2_diesel::ConnectionManager;
use tokio_core::reactor::Core;

use client::email::EmailClientImpl;
use client::stripe::StripeClientImpl;
use config::Config;
use controller::context::StaticContext;
use errors::Error;
use http::client::{Client, Config as HttpConfig};
use http::controller::Application;
use repos::acl::RolesCacheImpl;
use repos::repo_factory::ReposFactoryImpl;

/// Starts new web service from provided `Config`. Runs until ctrl-c.
pub fn start_server<F: FnOnce() + 'static>(config: Config, port: &Option<String>, callback: F) {
    // Prepare reactor
    let mut core = Core::new().expect("Unexpected error creating event loop core");
    let handle = Arc::new(core.handle());

    let http_config = HttpConfig::from(config.client.clone());
    let client = Client::new(&http_config, &handle);
    let client_handle = client.handle();
    handle.spawn(client.stream().for_each(|_| Ok(())));

    let thread_count = config.server.thread_count;

    let address = {
        let port = port.as_ref().unwrap_or(&config.server.port);
        format!("{}:{}", config.server.host, port).parse().expect("Could not parse address")
    };

    // Prepare database pool
    let database_url: String = config.server.database.parse().expect("Database URL must be set in configuration");
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let db_pool = r2d2::Pool::builder().build(manager).expect("Failed to create connection pool");

    // Prepare CPU pool
    let cpu_pool = CpuPool::new(thread_count);

    let roles_cache = RolesCacheImpl::default();
    let repo_factory = ReposFactoryImpl::new(roles_cache);

    let stripe_client = StripeClientImpl::create_from_config(client_handle.clone(), &config.stripe);
    let email_client = EmailClientImpl::create_from_config(client_handle, &config.email);

    let static_context = StaticContext::new(
        db_pool,
        cpu_pool,
        Arc::new(config),
        repo_factory,
        Arc::new(stripe_client),
        Arc::new(email_client),
    );

    let serve = Http::new()
        .serve_addr_handle(&address, &handle, move || {
            let controller = controller::ControllerImpl::new(static_context.clone());

            // Prepare application
            let app = Application::<Error>::new(controller);

            Ok(app)
        })
        .unwrap_or_else(|why| {
            error!("Http Server Initialization Error: {}", why);
            process::exit(1);
        });

    let handle_arc2 = handle.clone();
    handle.spawn(
        serve
            .for_each(move |conn| {
                handle_arc2.spawn(conn.map(|_| ()).map_err(|why| error!("Server Error: {:?}", why)));
                Ok(())
            })
            .map_err(|_| ()),
    );

    info!("Listening on http://{}, threads: {}", address, thread_count);
    handle.spawn_fn(move || {
        callback();
        Ok(())
    });

    core.run(tokio_signal::ctrl_c().flatten_stream().take(1u64).for_each(|()| {
        info!("Ctrl+C received. Exit");
        Ok(())
    }))
    .expect("Failed to wait for ctrl-c");
}
