//! Bookings as seen by the lot operators

use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::Fail;
use r2d2::ManageConnection;

use super::types::ServiceFuture;
use super::{change_payment_status, not_found, ready, ErrorContext, ErrorKind, Service, StatusChange};
use models::*;
use repos::repo_factory::ReposFactory;

pub trait OrderService {
    /// Orders of a lot, newest first, optionally narrowed to a license plate
    fn lot_orders(&self, lot_id: LotId, license_plate: Option<String>, skip: i64, count: i64) -> ServiceFuture<OrderSearchResults>;
    fn get_order(&self, order_id: OrderId) -> ServiceFuture<Order>;
    /// Manual settlement of an order by its operators
    fn update_payment_status(&self, order_id: OrderId, payment_status: PaymentStatus) -> ServiceFuture<Order>;
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > OrderService for Service<T, M, F>
{
    fn lot_orders(&self, lot_id: LotId, license_plate: Option<String>, skip: i64, count: i64) -> ServiceFuture<OrderSearchResults> {
        let user_id = match self.current_user_id() {
            Ok(user_id) => user_id,
            Err(e) => return ready(Err(e)),
        };
        let repo_factory = self.static_context.repo_factory.clone();
        let search = OrdersSearch {
            lot_id,
            license_plate: license_plate.and_then(|plate| {
                let plate = plate.trim().to_uppercase();
                if plate.is_empty() {
                    None
                } else {
                    Some(plate)
                }
            }),
        };

        self.spawn_on_pool(move |conn| {
            let lots_repo = repo_factory.create_lots_repo_with_sys_acl(&conn);
            let orders_repo = repo_factory.create_orders_repo(&conn, Some(user_id));

            lots_repo
                .get(lot_id)
                .map_err(ectx!(try convert => lot_id))?
                .ok_or_else(|| not_found(ErrorContext::LotNotFound, format!("Lot {}", lot_id)))?;
            orders_repo
                .search(skip, count, search.clone())
                .map_err(ectx!(convert => skip, count, search))
        })
    }

    fn get_order(&self, order_id: OrderId) -> ServiceFuture<Order> {
        let user_id = match self.current_user_id() {
            Ok(user_id) => user_id,
            Err(e) => return ready(Err(e)),
        };
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let orders_repo = repo_factory.create_orders_repo(&conn, Some(user_id));
            orders_repo
                .get(order_id)
                .map_err(ectx!(try convert => order_id))?
                .ok_or_else(|| not_found(ErrorContext::OrderNotFound, format!("Order {}", order_id)))
        })
    }

    fn update_payment_status(&self, order_id: OrderId, payment_status: PaymentStatus) -> ServiceFuture<Order> {
        let user_id = match self.current_user_id() {
            Ok(user_id) => user_id,
            Err(e) => return ready(Err(e)),
        };
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let orders_repo = repo_factory.create_orders_repo(&conn, Some(user_id));

            conn.transaction(move || {
                let order = orders_repo
                    .get(order_id)
                    .map_err(ectx!(try convert => order_id))?
                    .ok_or_else(|| not_found(ErrorContext::OrderNotFound, format!("Order {}", order_id)))?;

                let order = match change_payment_status(&*orders_repo, order, payment_status)? {
                    StatusChange::Changed(order) => order,
                    StatusChange::Unchanged(order) => return Ok(order),
                };
                info!("Order {} set to {} by user {}", order_id, payment_status, user_id);
                Ok(order)
            })
        })
    }
}
