use diesel;
use diesel::connection::AnsiTransactionManager;
use diesel::dsl::exists;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_dsl::RunQueryDsl;
use diesel::sql_types::Bool;
use diesel::Connection;
use failure::Error as FailureError;
use failure::Fail;

use models::authorization::*;
use models::{
    LotId, NewOrder, Order, OrderId, OrderSearchResults, OrdersSearch, PaymentIntentId, PaymentStatus, ScheduleId, UserId,
};
use repos::legacy_acl::*;
use schema::orders::dsl as Orders;

use super::acl;
use super::error::*;
use super::lot_staff::user_supervises_lot;
use super::types::{contains_pattern, RepoResult};

type OrdersRepoAcl = Box<Acl<Resource, Action, Scope, FailureError, LotAccess>>;

type BoxedExpr = Box<BoxableExpression<::schema::orders::table, Pg, SqlType = Bool>>;

pub trait OrdersRepo {
    fn get(&self, order_id: OrderId) -> RepoResult<Option<Order>>;
    fn get_by_payment_intent(&self, payment_intent_id: PaymentIntentId) -> RepoResult<Option<Order>>;
    /// Orders of a lot, newest first
    fn search(&self, skip: i64, count: i64, search: OrdersSearch) -> RepoResult<OrderSearchResults>;
    fn create(&self, payload: NewOrder) -> RepoResult<Order>;
    /// Whether any booking refers to the lot
    fn exists_for_lot(&self, lot_id: LotId) -> RepoResult<bool>;
    /// Whether any booking refers to the schedule
    fn exists_for_schedule(&self, schedule_id: ScheduleId) -> RepoResult<bool>;
    /// Moves the order from `from` to `to` in one statement. `None` when the
    /// order is no longer `from`, e.g. a concurrent call settled it first.
    fn update_payment_status(&self, order_id: OrderId, from: PaymentStatus, to: PaymentStatus) -> RepoResult<Option<Order>>;
}

pub struct OrdersRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
    pub acl: OrdersRepoAcl,
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> OrdersRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T, acl: OrdersRepoAcl) -> Self {
        Self { db_conn, acl }
    }

    fn check(&self, action: Action, access: LotAccess) -> RepoResult<()> {
        acl::check(&*self.acl, Resource::Order, action, self, Some(&access))
            .map_err(ectx!(try ErrorKind::Forbidden => action, access))?;
        Ok(())
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> OrdersRepo for OrdersRepoImpl<'a, T> {
    fn get(&self, order_id: OrderId) -> RepoResult<Option<Order>> {
        debug!("Getting an order with ID: {}", order_id);

        let order = Orders::orders
            .filter(Orders::order_id.eq(order_id))
            .get_result::<Order>(self.db_conn)
            .optional()
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(try err e, ErrorSource::Diesel, error_kind => order_id)
            })?;

        if let Some(ref order) = order {
            self.check(Action::Read, LotAccess::from(order))?;
        }
        Ok(order)
    }

    fn get_by_payment_intent(&self, payment_intent_id: PaymentIntentId) -> RepoResult<Option<Order>> {
        debug!("Getting an order with payment intent: {}", payment_intent_id);

        let order = Orders::orders
            .filter(Orders::stripe_payment_intent_id.eq(&payment_intent_id))
            .get_result::<Order>(self.db_conn)
            .optional()
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(try err e, ErrorSource::Diesel, error_kind => payment_intent_id)
            })?;

        if let Some(ref order) = order {
            self.check(Action::Read, LotAccess::from(order))?;
        }
        Ok(order)
    }

    fn search(&self, skip: i64, count: i64, search: OrdersSearch) -> RepoResult<OrderSearchResults> {
        debug!("Searching orders, skip={}, count={}, search {:?}", skip, count, search);

        self.check(Action::Read, LotAccess::new(search.lot_id))?;

        let query: BoxedExpr = into_expr(search.clone());

        let orders = Orders::orders
            .filter(&query)
            .offset(skip)
            .limit(count)
            .order_by(Orders::created_at.desc())
            .get_results::<Order>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(try err e, ErrorSource::Diesel, error_kind => search)
            })?;

        let total_count = Orders::orders.filter(&query).count().get_result::<i64>(self.db_conn).map_err(|e| {
            let error_kind = ErrorKind::from(&e);
            ectx!(try err e, ErrorSource::Diesel, error_kind => search)
        })?;

        Ok(OrderSearchResults { total_count, orders })
    }

    fn create(&self, payload: NewOrder) -> RepoResult<Order> {
        debug!("Creating an order using payload: {:?}", payload);

        self.check(Action::Write, LotAccess::from(&payload))?;

        diesel::insert_into(Orders::orders)
            .values(&payload)
            .get_result::<Order>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => payload)
            })
    }

    fn exists_for_lot(&self, lot_id: LotId) -> RepoResult<bool> {
        debug!("Checking if lot {} has orders", lot_id);

        diesel::select(exists(Orders::orders.filter(Orders::lot_id.eq(lot_id))))
            .get_result::<bool>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => lot_id)
            })
    }

    fn exists_for_schedule(&self, schedule_id: ScheduleId) -> RepoResult<bool> {
        debug!("Checking if schedule {} has orders", schedule_id);

        diesel::select(exists(Orders::orders.filter(Orders::schedule_id.eq(schedule_id))))
            .get_result::<bool>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => schedule_id)
            })
    }

    fn update_payment_status(&self, order_id: OrderId, from: PaymentStatus, to: PaymentStatus) -> RepoResult<Option<Order>> {
        debug!("Updating payment status of order with ID: {} - {} -> {}", order_id, from, to);

        let order = self.get(order_id)?.ok_or_else(|| {
            let e = format_err!("Order {} not found", order_id);
            ectx!(try err e, ErrorKind::NotFound)
        })?;
        self.check(Action::Write, LotAccess::from(&order))?;

        if !from.can_transition_to(to) {
            let message = format!("Order {} can not go from {} to {}", order_id, from, to);
            let error_kind = constraint_error("transition", &message);
            return Err(ectx!(err format_err!("{}", message), error_kind => order_id, from, to));
        }

        let filter = Orders::orders
            .filter(Orders::order_id.eq(order_id))
            .filter(Orders::payment_status.eq(from));

        diesel::update(filter)
            .set((Orders::payment_status.eq(to), Orders::updated_at.eq(diesel::dsl::now)))
            .get_result::<Order>(self.db_conn)
            .optional()
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => order_id, from, to)
            })
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> CheckScope<Scope, LotAccess>
    for OrdersRepoImpl<'a, T>
{
    fn is_in_scope(&self, user_id: UserId, scope: &Scope, obj: Option<&LotAccess>) -> bool {
        match *scope {
            Scope::All => true,
            Scope::Owned => obj.map(|access| user_supervises_lot(self.db_conn, user_id, access.lot_id)).unwrap_or(false),
        }
    }
}

fn into_expr(search: OrdersSearch) -> BoxedExpr {
    let OrdersSearch { lot_id, license_plate } = search;

    let mut query: BoxedExpr = Box::new(Orders::lot_id.eq(lot_id));

    if let Some(plate) = license_plate {
        let plate = plate.trim().to_string();
        if !plate.is_empty() {
            let new_condition = Orders::license_plate.ilike(contains_pattern(&plate));
            query = and(query, Box::new(new_condition));
        }
    }

    query
}

fn and(old_condition: BoxedExpr, new_condition: BoxedExpr) -> BoxedExpr {
    Box::new(old_condition.and(new_condition))
}
