//! Services is a core layer for the app business logic like
//! validation, authorization, etc.

pub mod checkout;
pub mod error;
pub mod lots;
pub mod orders;
pub mod price_tiers;
pub mod schedules;
pub mod types;
pub mod users;

pub use self::error::*;
pub use self::types::*;

use chrono::{Duration, NaiveDateTime, Utc};
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::Fail;
use futures::future;
use r2d2::{ManageConnection, PooledConnection};

use controller::context::{DynamicContext, StaticContext};
use models::validation::validation_errors;
use models::{slugify, Order, PaymentStatus, UserId};
use repos::repo_factory::ReposFactory;
use repos::OrdersRepo;

/// Service layer entry point, one per request
pub struct Service<
    T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
    M: ManageConnection<Connection = T>,
    F: ReposFactory<T>,
> {
    pub static_context: StaticContext<T, M, F>,
    pub dynamic_context: DynamicContext,
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > Clone for Service<T, M, F>
{
    fn clone(&self) -> Self {
        Self {
            static_context: self.static_context.clone(),
            dynamic_context: self.dynamic_context.clone(),
        }
    }
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > Service<T, M, F>
{
    pub fn new(static_context: StaticContext<T, M, F>, dynamic_context: DynamicContext) -> Self {
        Self {
            static_context,
            dynamic_context,
        }
    }

    /// Runs blocking db work on the cpu pool with a connection from the db pool
    pub fn spawn_on_pool<R, Func>(&self, f: Func) -> ServiceFuture<R>
    where
        Func: FnOnce(PooledConnection<M>) -> Result<R, Error> + Send + 'static,
        R: Send + 'static,
    {
        let cpu_pool = self.static_context.cpu_pool.clone();
        let db_pool = self.static_context.db_pool.clone();
        Box::new(cpu_pool.spawn_fn(move || {
            db_pool
                .get()
                .map_err(ectx!(ErrorSource::R2d2, ErrorKind::Internal))
                .and_then(f)
        }))
    }

    /// Id of the authorized caller, `Forbidden` for anonymous requests
    pub fn current_user_id(&self) -> Result<UserId, Error> {
        self.dynamic_context
            .user_id
            .ok_or_else(|| ectx!(err ErrorContext::Unauthorized, ErrorKind::Forbidden))
    }

    /// Wall clock time of the lots
    pub fn lot_now(&self) -> NaiveDateTime {
        Utc::now().naive_utc() + Duration::minutes(self.static_context.config.booking.utc_offset_minutes)
    }
}

/// Boxes a ready result
pub fn ready<R: 'static>(result: Result<R, Error>) -> ServiceFuture<R> {
    Box::new(future::result(result))
}

/// First free slug among `base`, `base-2`, `base-3`, ... where `base` is the
/// slugified name, or `fallback` for names without any letters or digits
pub fn unique_slug<F>(name: &str, fallback: &str, mut is_taken: F) -> Result<String, Error>
where
    F: FnMut(&str) -> Result<bool, Error>,
{
    let base = match slugify(name) {
        ref slug if slug.is_empty() => fallback.to_string(),
        slug => slug,
    };
    let mut candidate = base.clone();
    let mut suffix = 1;
    while is_taken(&candidate)? {
        suffix += 1;
        candidate = format!("{}-{}", base, suffix);
    }
    Ok(candidate)
}

/// Missing records are reported as `NotFound` with the lookup in the context
pub fn not_found(context: ErrorContext, what: String) -> Error {
    let e = format_err!("{} not found", what);
    ectx!(err e, context, ErrorKind::NotFound)
}

/// Lots and schedules that bookings refer to can not be deleted
pub fn has_orders(field: &'static str, what: String) -> Error {
    let e = format_err!("{} has orders", what);
    let kind = ErrorKind::from(validation_errors(
        field,
        "has_orders",
        format!("{} has bookings and can not be deleted", what),
    ));
    ectx!(err e, ErrorContext::HasOrders, kind)
}

/// Outcome of a payment status change
#[derive(Debug)]
pub enum StatusChange {
    /// This call moved the order to the new status
    Changed(Order),
    /// The order already had the status, possibly set by a concurrent call
    Unchanged(Order),
}

fn transition_error(order: &Order, next: PaymentStatus) -> Error {
    let e = format_err!("Order {} is {}, can not become {}", order.order_id, order.payment_status, next);
    let kind = ErrorKind::from(validation_errors(
        "payment_status",
        "transition",
        format!("Order is already {}", order.payment_status),
    ));
    ectx!(err e, ErrorContext::PaymentStatusTransition, kind)
}

/// Moves `order` to `next` with a compare-and-set on its current status, so
/// exactly one of several concurrent callers gets `Changed`
pub fn change_payment_status(orders_repo: &OrdersRepo, order: Order, next: PaymentStatus) -> Result<StatusChange, Error> {
    if order.payment_status == next {
        return Ok(StatusChange::Unchanged(order));
    }
    if !order.payment_status.can_transition_to(next) {
        return Err(transition_error(&order, next));
    }

    let order_id = order.order_id;
    let current = order.payment_status;
    let updated = orders_repo
        .update_payment_status(order_id, current, next)
        .map_err(ectx!(try convert => order_id, current, next))?;
    if let Some(order) = updated {
        return Ok(StatusChange::Changed(order));
    }

    let order = orders_repo
        .get(order_id)
        .map_err(ectx!(try convert => order_id))?
        .ok_or_else(|| not_found(ErrorContext::OrderNotFound, format!("Order {}", order_id)))?;
    if order.payment_status == next {
        Ok(StatusChange::Unchanged(order))
    } else {
        Err(transition_error(&order, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::LotId;
    use repos::repo_factory::tests::*;

    #[test]
    fn test_unique_slug_suffixes() {
        let taken = vec!["downtown".to_string(), "downtown-2".to_string()];
        let slug = unique_slug("Downtown", "lot", |slug| Ok(taken.iter().any(|t| t == slug))).unwrap();
        assert_eq!(slug, "downtown-3");
        let slug = unique_slug("Uptown", "lot", |slug| Ok(taken.iter().any(|t| t == slug))).unwrap();
        assert_eq!(slug, "uptown");
    }

    #[test]
    fn test_unique_slug_fallback() {
        let slug = unique_slug("!!!", "lot", |_| Ok(false)).unwrap();
        assert_eq!(slug, "lot");
    }

    #[test]
    fn test_change_payment_status_settles_once() {
        let store = SharedStore::default();
        let stale = store.lock().unwrap().add_order(LotId::generate(), "ABC123", PaymentStatus::Pending);
        let repo_factory = ReposFactoryMock { store: store.clone() };
        let conn = MockConnection::default();
        let orders_repo = repo_factory.create_orders_repo_with_sys_acl(&conn);

        match change_payment_status(&*orders_repo, stale.clone(), PaymentStatus::Paid).unwrap() {
            StatusChange::Changed(order) => assert_eq!(order.payment_status, PaymentStatus::Paid),
            StatusChange::Unchanged(_) => panic!("pending order was not settled"),
        }
        // a caller that read the order before the settlement
        match change_payment_status(&*orders_repo, stale.clone(), PaymentStatus::Paid).unwrap() {
            StatusChange::Changed(_) => panic!("order settled twice"),
            StatusChange::Unchanged(order) => assert_eq!(order.payment_status, PaymentStatus::Paid),
        }
        let e = change_payment_status(&*orders_repo, stale, PaymentStatus::Failed).unwrap_err();
        match e.kind() {
            ErrorKind::Validation(_) => (),
            kind => panic!("unexpected error kind {:?}", kind),
        }
    }
}
