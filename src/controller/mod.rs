//! `Controller` is a top layer that handles all http-related
//! stuff like reading bodies, parsing params, forming a response.
//! Basically it provides inputs to `Service` layer and converts outputs
//! of `Service` layer to http responses

pub mod context;
pub mod requests;
pub mod routes;

use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::{Error as FailureError, Fail};
use futures::future;
use futures::{Future, IntoFuture};
use hyper::server::Request;
use hyper::{Delete, Get, Post, Put};
use r2d2::ManageConnection;
use serde::ser::Serialize;
use uuid::Uuid;

use self::context::{DynamicContext, StaticContext};
use self::requests::*;
use self::routes::Route;
use errors::Error;
use http::controller::{Controller, ControllerFuture};
use http::request_util::{authorization, parse_body, parse_query, serialize_future};
use models::*;
use repos::repo_factory::*;
use services::checkout::CheckoutService;
use services::lots::LotService;
use services::orders::OrderService;
use services::price_tiers::PriceTierService;
use services::schedules::{LotRef, ScheduleService};
use services::users::UserService;
use services::{Error as ServiceError, Service};

/// Controller handles route parsing and calling `Service` layer
pub struct ControllerImpl<T, M, F>
where
    T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
    M: ManageConnection<Connection = T>,
    F: ReposFactory<T>,
{
    pub static_context: StaticContext<T, M, F>,
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > ControllerImpl<T, M, F>
{
    /// Create a new controller based on services
    pub fn new(static_context: StaticContext<T, M, F>) -> Self {
        Self { static_context }
    }
}

/// Wraps a service error into the http error matching its kind
fn service_error(e: ServiceError) -> FailureError {
    let kind = Error::from(e.kind());
    e.context(kind).into()
}

fn serialize<T, Fut>(f: Fut) -> ControllerFuture
where
    Fut: Future<Item = T, Error = ServiceError> + 'static,
    T: Serialize + 'static,
{
    serialize_future(f.map_err(service_error))
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > Controller for ControllerImpl<T, M, F>
{
    /// Handle a request and get future response
    fn call(&self, req: Request) -> ControllerFuture {
        // the gateway in front of the app puts the authenticated user id into this header
        let user_id = authorization(req.headers()).and_then(|id| id.parse::<UserId>().ok());
        let correlation_token = Uuid::new_v4().to_string();
        debug!("Request {} {} from user {:?}, token {}", req.method(), req.path(), user_id, correlation_token);
        let dynamic_context = DynamicContext::new(user_id, correlation_token);
        let service = Service::new(self.static_context.clone(), dynamic_context);

        let method = req.method().clone();
        let path = req.path().to_string();
        let query = req.query().map(|query| query.to_string());
        let query = query.as_ref().map(|query| query.as_str());

        match (&method, self.static_context.route_parser.test(&path)) {
            (&Get, Some(Route::Healthcheck)) => serialize_future(future::ok::<_, FailureError>("Ok")),

            // Lots
            (&Get, Some(Route::Lots)) => serialize_future(parse_query::<LotsQuery>(query).into_future().and_then(move |lots_query| {
                debug!("Received request to search lots {:?}", lots_query);
                let (offset, count) = lots_query.paging();
                service.search_lots(lots_query.search, offset, count).map_err(service_error)
            })),
            (&Post, Some(Route::Lots)) => serialize_future(parse_body::<NewLotPayload>(req.body()).and_then(move |payload| {
                debug!("Received request to create lot {:?}", payload);
                service.create_lot(payload).map_err(service_error)
            })),
            (&Get, Some(Route::LotsDashboard)) => {
                debug!("Received request to get lots of user {:?}", user_id);
                serialize(service.lots_for_staff())
            }
            (&Get, Some(Route::LotBySlug { slug })) => {
                debug!("Received request to get lot by slug {}", slug);
                serialize(service.get_lot_by_slug(slug))
            }
            (&Get, Some(Route::LotBySlugAvailable { slug })) => {
                serialize_future(parse_query::<AvailabilityQuery>(query).into_future().and_then(move |availability_query| {
                    debug!("Received request to get available schedules of lot {} at {:?}", slug, availability_query.at);
                    service
                        .available_schedules(LotRef::Slug(slug), availability_query.at)
                        .map_err(service_error)
                }))
            }
            (&Get, Some(Route::Lot { lot_id })) => {
                debug!("Received request to get lot {}", lot_id);
                serialize(service.get_lot(lot_id))
            }
            (&Put, Some(Route::Lot { lot_id })) => serialize_future(parse_body::<UpdateLot>(req.body()).and_then(move |payload| {
                debug!("Received request to update lot {} with {:?}", lot_id, payload);
                service.update_lot(lot_id, payload).map_err(service_error)
            })),
            (&Delete, Some(Route::Lot { lot_id })) => {
                debug!("Received request to delete lot {}", lot_id);
                serialize(service.delete_lot(lot_id))
            }
            (&Get, Some(Route::LotSchedules { lot_id })) => {
                debug!("Received request to get schedules of lot {}", lot_id);
                serialize(service.lot_schedules(lot_id))
            }
            (&Get, Some(Route::LotAvailable { lot_id })) => {
                serialize_future(parse_query::<AvailabilityQuery>(query).into_future().and_then(move |availability_query| {
                    debug!("Received request to get available schedules of lot {} at {:?}", lot_id, availability_query.at);
                    service
                        .available_schedules(LotRef::Id(lot_id), availability_query.at)
                        .map_err(service_error)
                }))
            }
            (&Get, Some(Route::LotOrders { lot_id })) => {
                serialize_future(parse_query::<OrdersQuery>(query).into_future().and_then(move |orders_query| {
                    debug!("Received request to get orders of lot {} {:?}", lot_id, orders_query);
                    let (offset, count) = orders_query.paging();
                    service
                        .lot_orders(lot_id, orders_query.plate, offset, count)
                        .map_err(service_error)
                }))
            }
            (&Get, Some(Route::LotStaff { lot_id })) => {
                debug!("Received request to get staff of lot {}", lot_id);
                serialize(service.lot_staff(lot_id))
            }
            (&Post, Some(Route::LotStaff { lot_id })) => {
                serialize_future(parse_body::<AssignStaffPayload>(req.body()).and_then(move |payload| {
                    debug!("Received request to assign staff to lot {} {:?}", lot_id, payload);
                    service.assign_staff(lot_id, payload).map_err(service_error)
                }))
            }
            (&Delete, Some(Route::LotStaffMember { lot_id, user_id })) => {
                debug!("Received request to remove user {} from lot {}", user_id, lot_id);
                serialize(service.remove_staff(lot_id, user_id))
            }

            // Schedules and prices
            (&Post, Some(Route::Schedules)) => {
                serialize_future(parse_body::<NewSchedulePayload>(req.body()).and_then(move |payload| {
                    debug!("Received request to create schedule {:?}", payload);
                    service.create_schedule(payload).map_err(service_error)
                }))
            }
            (&Put, Some(Route::Schedule { schedule_id })) => {
                serialize_future(parse_body::<UpdateSchedule>(req.body()).and_then(move |payload| {
                    debug!("Received request to update schedule {} with {:?}", schedule_id, payload);
                    service.update_schedule(schedule_id, payload).map_err(service_error)
                }))
            }
            (&Delete, Some(Route::Schedule { schedule_id })) => {
                debug!("Received request to delete schedule {}", schedule_id);
                serialize(service.delete_schedule(schedule_id))
            }
            (&Get, Some(Route::SchedulePriceTiers { schedule_id })) => {
                debug!("Received request to get price tiers of schedule {}", schedule_id);
                serialize(service.schedule_price_tiers(schedule_id))
            }
            (&Post, Some(Route::PriceTiers)) => {
                serialize_future(parse_body::<NewPriceTierPayload>(req.body()).and_then(move |payload| {
                    debug!("Received request to create price tier {:?}", payload);
                    service.create_price_tier(payload).map_err(service_error)
                }))
            }
            (&Get, Some(Route::PriceTier { price_id })) => {
                debug!("Received request to get price tier {}", price_id);
                serialize(service.get_price_tier(price_id))
            }
            (&Put, Some(Route::PriceTier { price_id })) => {
                serialize_future(parse_body::<UpdatePriceTier>(req.body()).and_then(move |payload| {
                    debug!("Received request to update price tier {} with {:?}", price_id, payload);
                    service.update_price_tier(price_id, payload).map_err(service_error)
                }))
            }
            (&Delete, Some(Route::PriceTier { price_id })) => {
                debug!("Received request to delete price tier {}", price_id);
                serialize(service.delete_price_tier(price_id))
            }

            // Checkout and orders
            (&Post, Some(Route::Checkout)) => serialize_future(parse_body::<CheckoutPayload>(req.body()).and_then(move |payload| {
                debug!("Received request to check out {:?}", payload);
                service.create_checkout(payload).map_err(service_error)
            })),
            (&Post, Some(Route::CheckoutConfirm { payment_intent_id })) => {
                debug!("Received request to confirm payment intent {}", payment_intent_id);
                serialize(service.confirm_checkout(payment_intent_id))
            }
            (&Get, Some(Route::OrderByPaymentIntent { payment_intent_id })) => {
                debug!("Received request to get order by payment intent {}", payment_intent_id);
                serialize(service.order_by_payment_intent(payment_intent_id))
            }
            (&Get, Some(Route::Order { order_id })) => {
                debug!("Received request to get order {}", order_id);
                serialize(service.get_order(order_id))
            }
            (&Put, Some(Route::OrderPaymentStatus { order_id })) => {
                serialize_future(parse_body::<UpdatePaymentStatus>(req.body()).and_then(move |payload| {
                    debug!("Received request to set payment status of order {} to {}", order_id, payload.payment_status);
                    service
                        .update_payment_status(order_id, payload.payment_status)
                        .map_err(service_error)
                }))
            }

            // Users
            (&Get, Some(Route::CurrentUser)) => {
                debug!("Received request to get current user {:?}", user_id);
                serialize(service.current_user())
            }
            (&Post, Some(Route::Users)) => serialize_future(parse_body::<NewUser>(req.body()).and_then(move |payload| {
                debug!("Received request to create user {:?}", payload);
                service.create_user(payload).map_err(service_error)
            })),
            (&Put, Some(Route::User { user_id })) => serialize_future(parse_body::<UpdateUser>(req.body()).and_then(move |payload| {
                debug!("Received request to update user {} with {:?}", user_id, payload);
                service.update_user(user_id, payload).map_err(service_error)
            })),

            // Fallback
            (m, _) => Box::new(future::err(
                format_err!("Request to non existing endpoint in parking service! {:?} {:?}", m, path)
                    .context(Error::NotFound)
                    .into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::Future;
    use hyper::header::Authorization;
    use hyper::{Method, StatusCode};
    use serde_json::{self, Value};

    use super::*;
    use http::controller::error_message;
    use repos::repo_factory::tests::*;

    fn call(store: &SharedStore, method: Method, path: &str, user_id: Option<UserId>) -> Result<Value, StatusCode> {
        let controller = ControllerImpl::new(create_service(None, store.clone()).static_context);
        let mut request = Request::new(method, path.parse().unwrap());
        if let Some(user_id) = user_id {
            request.headers_mut().set(Authorization(user_id.to_string()));
        }
        controller
            .call(request)
            .wait()
            .map(|body| serde_json::from_str(&body).unwrap())
            .map_err(|e| error_message::<Error>(&e).0)
    }

    #[test]
    fn test_healthcheck() {
        let store = SharedStore::default();
        assert_eq!(call(&store, Method::Get, "/healthcheck", None), Ok(json!("Ok")));
    }

    #[test]
    fn test_public_lot_listing() {
        let store = SharedStore::default();
        {
            let mut store = store.lock().unwrap();
            store.add_lot("Stadium North", LotStatus::Open);
            store.add_lot("Old Garage", LotStatus::Closed);
        }

        let lots = call(&store, Method::Get, "/lots?count=10", None).unwrap();
        let names: Vec<&str> = lots
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|lot| lot["name"].as_str())
            .collect();
        assert_eq!(names, vec!["Stadium North"]);

        assert_eq!(call(&store, Method::Get, "/lots?count=ten", None), Err(StatusCode::UnprocessableEntity));
    }

    #[test]
    fn test_dashboard_needs_authorization() {
        let store = SharedStore::default();
        let admin = store.lock().unwrap().add_user(Role::Admin);

        assert_eq!(call(&store, Method::Get, "/lots/dashboard", None), Err(StatusCode::Forbidden));
        assert!(call(&store, Method::Get, "/lots/dashboard", Some(admin.user_id)).is_ok());
    }

    #[test]
    fn test_unknown_routes() {
        let store = SharedStore::default();
        assert_eq!(call(&store, Method::Get, "/garages", None), Err(StatusCode::NotFound));
        assert_eq!(call(&store, Method::Patch, "/lots", None), Err(StatusCode::NotFound));
        let missing = format!("/lots/{}", LotId::generate());
        assert_eq!(call(&store, Method::Get, &missing, None), Err(StatusCode::NotFound));
    }
}
