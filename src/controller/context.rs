//! Shared state of the app and per request state handed to the services
use std::sync::Arc;

use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use futures_cpupool::CpuPool;
use r2d2::{ManageConnection, Pool};

use super::routes::*;
use client::email::EmailClient;
use client::stripe::StripeClient;
use config::Config;
use models::UserId;
use repos::repo_factory::*;
use router::RouteParser;

/// Pools, config and outgoing clients, cloned into every request
pub struct StaticContext<T, M, F>
where
    T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
    M: ManageConnection<Connection = T>,
    F: ReposFactory<T>,
{
    pub db_pool: Pool<M>,
    pub cpu_pool: CpuPool,
    pub config: Arc<Config>,
    pub route_parser: Arc<RouteParser<Route>>,
    pub repo_factory: F,
    pub stripe_client: Arc<dyn StripeClient>,
    pub email_client: Arc<dyn EmailClient>,
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > StaticContext<T, M, F>
{
    /// Create a new static context
    pub fn new(
        db_pool: Pool<M>,
        cpu_pool: CpuPool,
        config: Arc<Config>,
        repo_factory: F,
        stripe_client: Arc<dyn StripeClient>,
        email_client: Arc<dyn EmailClient>,
    ) -> Self {
        let route_parser = Arc::new(create_route_parser());
        Self {
            route_parser,
            db_pool,
            cpu_pool,
            config,
            repo_factory,
            stripe_client,
            email_client,
        }
    }
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > Clone for StaticContext<T, M, F>
{
    fn clone(&self) -> Self {
        Self {
            cpu_pool: self.cpu_pool.clone(),
            db_pool: self.db_pool.clone(),
            route_parser: self.route_parser.clone(),
            config: self.config.clone(),
            repo_factory: self.repo_factory.clone(),
            stripe_client: self.stripe_client.clone(),
            email_client: self.email_client.clone(),
        }
    }
}

/// Caller of the current request
#[derive(Clone, Debug)]
pub struct DynamicContext {
    pub user_id: Option<UserId>,
    pub correlation_token: String,
}

impl DynamicContext {
    /// Create a new dynamic context for each request
    pub fn new(user_id: Option<UserId>, correlation_token: String) -> Self {
        Self { user_id, correlation_token }
    }
}
