//! Customer bookings: payment intent creation, confirmation and the parking pass

use chrono::NaiveDateTime;
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::Fail;
use futures::{future, Future};
use r2d2::ManageConnection;
use validator::Validate;

use super::types::ServiceFuture;
use super::{change_payment_status, not_found, ready, Error, ErrorContext, ErrorKind, Service, StatusChange};
use client::email::templates::parking_pass_email;
use client::stripe::{Metadata, NewPaymentIntent, PaymentIntent};
use models::validation::validation_errors;
use models::*;
use repos::repo_factory::ReposFactory;
use repos::{LotsRepo, PriceTiersRepo, SchedulesRepo};
use services::error::validation_error;

pub trait CheckoutService {
    /// Creates a payment intent for the chosen tier and a pending order waiting for it
    fn create_checkout(&self, payload: CheckoutPayload) -> ServiceFuture<Checkout>;
    /// Settles the order of a payment intent according to the intent status
    fn confirm_checkout(&self, payment_intent_id: PaymentIntentId) -> ServiceFuture<Order>;
    /// Parking pass shown on the success page
    fn order_by_payment_intent(&self, payment_intent_id: PaymentIntentId) -> ServiceFuture<ParkingPass>;
}

/// Lot, schedule and tier of a booking request, checked to fit together
struct Booking {
    lot: Lot,
    schedule: Schedule,
    tier: PriceTier,
}

fn invalid(field: &'static str, code: &'static str, message: String) -> Error {
    validation_error(validation_errors(field, code, message))
}

fn load_booking(
    lots_repo: &LotsRepo,
    schedules_repo: &SchedulesRepo,
    price_tiers_repo: &PriceTiersRepo,
    payload: &CheckoutPayload,
    now: NaiveDateTime,
) -> Result<Booking, Error> {
    let lot_id = payload.lot_id;
    let lot = lots_repo
        .get(lot_id)
        .map_err(ectx!(try convert => lot_id))?
        .ok_or_else(|| not_found(ErrorContext::LotNotFound, format!("Lot {}", lot_id)))?;
    if !lot.is_open() {
        return Err(invalid("lot_id", "closed", format!("{} is not taking bookings", lot.name)));
    }

    let schedule_id = payload.schedule_id;
    let schedule = schedules_repo
        .get(schedule_id)
        .map_err(ectx!(try convert => schedule_id))?
        .ok_or_else(|| not_found(ErrorContext::ScheduleNotFound, format!("Schedule {}", schedule_id)))?;
    if schedule.lot_id != lot_id {
        return Err(invalid("schedule_id", "mismatch", "The schedule belongs to another lot".to_string()));
    }
    if !schedule.is_active_at(now) {
        return Err(invalid("schedule_id", "inactive", format!("{} is not bookable right now", schedule.name)));
    }

    let price_id = payload.price_id;
    let tier = price_tiers_repo
        .get(price_id)
        .map_err(ectx!(try convert => price_id))?
        .ok_or_else(|| not_found(ErrorContext::PriceTierNotFound, format!("Price tier {}", price_id)))?;
    if tier.schedule_id != schedule_id {
        return Err(invalid("price_id", "mismatch", "The price belongs to another schedule".to_string()));
    }

    Ok(Booking { lot, schedule, tier })
}

fn intent_metadata(order_id: OrderId, payload: &CheckoutPayload) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("order_id".to_string(), order_id.to_string());
    metadata.insert("lot_id".to_string(), payload.lot_id.to_string());
    metadata.insert("schedule_id".to_string(), payload.schedule_id.to_string());
    metadata.insert("price_id".to_string(), payload.price_id.to_string());
    metadata.insert("phone".to_string(), payload.phone.clone());
    metadata.insert("license_plate".to_string(), payload.normalized_plate());
    metadata.insert("license_state".to_string(), payload.license_state.trim().to_string());
    metadata
}

/// Outcome of applying an intent status to its order
enum Settlement {
    /// The order became paid, the pass still has to be sent
    Paid(ParkingPass),
    /// Nothing to notify about
    Unchanged(Order),
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > CheckoutService for Service<T, M, F>
{
    fn create_checkout(&self, payload: CheckoutPayload) -> ServiceFuture<Checkout> {
        if let Err(errors) = payload.validate() {
            return ready(Err(validation_error(errors)));
        }
        let repo_factory = self.static_context.repo_factory.clone();
        let stripe_client = self.static_context.stripe_client.clone();
        let currency = self.static_context.config.stripe.currency.clone();
        let now = self.lot_now();
        let service = self.clone();

        let fut = self
            .spawn_on_pool({
                let payload = payload.clone();
                move |conn| {
                    let lots_repo = repo_factory.create_lots_repo_with_sys_acl(&conn);
                    let schedules_repo = repo_factory.create_schedules_repo_with_sys_acl(&conn);
                    let price_tiers_repo = repo_factory.create_price_tiers_repo_with_sys_acl(&conn);
                    load_booking(&*lots_repo, &*schedules_repo, &*price_tiers_repo, &payload, now)
                }
            })
            .and_then(move |booking| {
                let order_id = OrderId::generate();
                let new_intent = NewPaymentIntent {
                    amount: booking.tier.price,
                    currency,
                    receipt_email: Some(payload.email.trim().to_string()),
                    description: Some(format!("Parking at {}, up to {} hours", booking.lot.name, booking.tier.max_hours)),
                    metadata: intent_metadata(order_id, &payload),
                    idempotency_key: order_id.to_string(),
                };
                stripe_client
                    .create_payment_intent(new_intent.clone())
                    .map_err(ectx!(convert => new_intent))
                    .map(move |intent| (order_id, payload, booking, intent))
            })
            .and_then(move |(order_id, payload, booking, intent): (OrderId, CheckoutPayload, Booking, PaymentIntent)| {
                let client_secret = match intent.client_secret.clone() {
                    Some(client_secret) => client_secret,
                    None => {
                        let e = format_err!("Payment intent {} came without a client secret", intent.id);
                        return future::Either::A(future::err::<Checkout, Error>(ectx!(err e, ErrorContext::PaymentIntentStatus, ErrorKind::Internal)));
                    }
                };
                let new_order = NewOrder {
                    order_id,
                    lot_id: booking.lot.lot_id,
                    schedule_id: booking.schedule.schedule_id,
                    price_tier: Some(booking.tier.price_id),
                    email: payload.email.trim().to_string(),
                    phone: payload.phone.clone(),
                    license_plate: payload.normalized_plate(),
                    license_state: payload.license_state.trim().to_string(),
                    vehicle_type: payload.vehicle_type,
                    start_time: now,
                    end_time: booking.tier.exit_time(now),
                    total_amount: booking.tier.price,
                    payment_status: PaymentStatus::Pending,
                    stripe_payment_intent_id: intent.id,
                };
                let repo_factory = service.static_context.repo_factory.clone();
                future::Either::B(
                    service
                        .spawn_on_pool(move |conn| {
                            let orders_repo = repo_factory.create_orders_repo_with_sys_acl(&conn);
                            orders_repo.create(new_order.clone()).map_err(ectx!(convert => new_order))
                        })
                        .map(move |order| {
                            info!(
                                "Order {} for {} pending on payment intent {}",
                                order.order_id, order.total_amount, order.stripe_payment_intent_id
                            );
                            Checkout { order, client_secret }
                        }),
                )
            });

        Box::new(fut)
    }

    fn confirm_checkout(&self, payment_intent_id: PaymentIntentId) -> ServiceFuture<Order> {
        let stripe_client = self.static_context.stripe_client.clone();
        let email_client = self.static_context.email_client.clone();
        let pass_url = self.static_context.config.email.pass_url.clone();
        let service = self.clone();

        let fut = stripe_client
            .get_payment_intent(payment_intent_id.clone())
            .map_err(ectx!(convert => payment_intent_id))
            .and_then(move |intent| {
                let next = match intent.status {
                    PaymentIntentStatus::Succeeded => PaymentStatus::Paid,
                    PaymentIntentStatus::Canceled => PaymentStatus::Failed,
                    status => {
                        return future::Either::A(future::err::<Settlement, Error>(invalid(
                            "payment_intent",
                            "status",
                            format!("Payment intent {} is not settled, status: {:?}", intent.id, status),
                        )))
                    }
                };

                let repo_factory = service.static_context.repo_factory.clone();
                future::Either::B(service.spawn_on_pool(move |conn| {
                    let orders_repo = repo_factory.create_orders_repo_with_sys_acl(&conn);
                    let lots_repo = repo_factory.create_lots_repo_with_sys_acl(&conn);
                    let price_tiers_repo = repo_factory.create_price_tiers_repo_with_sys_acl(&conn);

                    let intent_id = intent.id.clone();
                    let order = orders_repo
                        .get_by_payment_intent(intent_id.clone())
                        .map_err(ectx!(try convert => intent_id))?
                        .ok_or_else(|| not_found(ErrorContext::OrderNotFound, format!("Order of payment intent {}", intent.id)))?;

                    let order = match change_payment_status(&*orders_repo, order, next)? {
                        StatusChange::Changed(order) => order,
                        StatusChange::Unchanged(order) => return Ok(Settlement::Unchanged(order)),
                    };
                    info!("Order {} is {} after payment intent {}", order.order_id, next, intent.id);

                    if next != PaymentStatus::Paid {
                        return Ok(Settlement::Unchanged(order));
                    }
                    let pass = parking_pass(&*lots_repo, &*price_tiers_repo, order)?;
                    Ok(Settlement::Paid(pass))
                }))
            })
            .and_then(move |settlement| match settlement {
                Settlement::Unchanged(order) => future::Either::A(future::ok::<Order, Error>(order)),
                Settlement::Paid(pass) => {
                    let email = parking_pass_email(&pass, &pass_url);
                    let order = pass.order;
                    let order_id = order.order_id;
                    // the order stays paid when the pass can not be delivered
                    future::Either::B(email_client.send(email).then(move |res| {
                        if let Err(e) = res {
                            error!("Failed to send the parking pass of order {}: {}", order_id, e);
                        }
                        Ok::<Order, Error>(order)
                    }))
                }
            });

        Box::new(fut)
    }

    fn order_by_payment_intent(&self, payment_intent_id: PaymentIntentId) -> ServiceFuture<ParkingPass> {
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let orders_repo = repo_factory.create_orders_repo_with_sys_acl(&conn);
            let lots_repo = repo_factory.create_lots_repo_with_sys_acl(&conn);
            let price_tiers_repo = repo_factory.create_price_tiers_repo_with_sys_acl(&conn);

            let intent_id = payment_intent_id.clone();
            let order = orders_repo
                .get_by_payment_intent(intent_id.clone())
                .map_err(ectx!(try convert => intent_id))?
                .ok_or_else(|| not_found(ErrorContext::OrderNotFound, format!("Order of payment intent {}", payment_intent_id)))?;
            parking_pass(&*lots_repo, &*price_tiers_repo, order)
        })
    }
}

fn parking_pass(lots_repo: &LotsRepo, price_tiers_repo: &PriceTiersRepo, order: Order) -> Result<ParkingPass, Error> {
    let lot_id = order.lot_id;
    let lot = lots_repo
        .get(lot_id)
        .map_err(ectx!(try convert => lot_id))?
        .ok_or_else(|| not_found(ErrorContext::LotNotFound, format!("Lot {}", lot_id)))?;
    let price_tier = match order.price_tier {
        Some(price_id) => price_tiers_repo.get(price_id).map_err(ectx!(try convert => price_id))?,
        None => None,
    };
    Ok(ParkingPass {
        order,
        lot_name: lot.name,
        lot_location: lot.location,
        price_tier,
    })
}
