use models::{LotId, OrderId, PaymentIntentId, PriceTierId, ScheduleId, UserId};
use router::RouteParser;

/// List of all routes with params for the app
#[derive(Clone, Debug, PartialEq)]
pub enum Route {
    Healthcheck,
    Lots,
    LotsDashboard,
    Lot { lot_id: LotId },
    LotBySlug { slug: String },
    LotBySlugAvailable { slug: String },
    LotSchedules { lot_id: LotId },
    LotAvailable { lot_id: LotId },
    LotOrders { lot_id: LotId },
    LotStaff { lot_id: LotId },
    LotStaffMember { lot_id: LotId, user_id: UserId },
    Schedules,
    Schedule { schedule_id: ScheduleId },
    SchedulePriceTiers { schedule_id: ScheduleId },
    PriceTiers,
    PriceTier { price_id: PriceTierId },
    Checkout,
    CheckoutConfirm { payment_intent_id: PaymentIntentId },
    OrderByPaymentIntent { payment_intent_id: PaymentIntentId },
    Order { order_id: OrderId },
    OrderPaymentStatus { order_id: OrderId },
    CurrentUser,
    Users,
    User { user_id: UserId },
}

pub fn create_route_parser() -> RouteParser<Route> {
    let mut route_parser = RouteParser::default();

    route_parser.add_route(r"^/healthcheck$", || Route::Healthcheck);

    // Lots
    route_parser.add_route(r"^/lots$", || Route::Lots);
    route_parser.add_route(r"^/lots/dashboard$", || Route::LotsDashboard);
    route_parser.add_route_with_params(r"^/lots/by-slug/([^/]+)$", |params| {
        params.get(0).map(|slug| Route::LotBySlug { slug: slug.to_string() })
    });
    route_parser.add_route_with_params(r"^/lots/by-slug/([^/]+)/available$", |params| {
        params.get(0).map(|slug| Route::LotBySlugAvailable { slug: slug.to_string() })
    });
    route_parser.add_route_with_params(r"^/lots/([^/]+)$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse().ok())
            .map(|lot_id| Route::Lot { lot_id })
    });
    route_parser.add_route_with_params(r"^/lots/([^/]+)/schedules$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse().ok())
            .map(|lot_id| Route::LotSchedules { lot_id })
    });
    route_parser.add_route_with_params(r"^/lots/([^/]+)/available$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse().ok())
            .map(|lot_id| Route::LotAvailable { lot_id })
    });
    route_parser.add_route_with_params(r"^/lots/([^/]+)/orders$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse().ok())
            .map(|lot_id| Route::LotOrders { lot_id })
    });
    route_parser.add_route_with_params(r"^/lots/([^/]+)/staff$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse().ok())
            .map(|lot_id| Route::LotStaff { lot_id })
    });
    route_parser.add_route_with_params(r"^/lots/([^/]+)/staff/([^/]+)$", |params| {
        let lot_id = params.get(0).and_then(|string_id| string_id.parse().ok());
        let user_id = params.get(1).and_then(|string_id| string_id.parse().ok());
        match (lot_id, user_id) {
            (Some(lot_id), Some(user_id)) => Some(Route::LotStaffMember { lot_id, user_id }),
            _ => None,
        }
    });

    // Schedules and prices
    route_parser.add_route(r"^/schedules$", || Route::Schedules);
    route_parser.add_route_with_params(r"^/schedules/([^/]+)$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse().ok())
            .map(|schedule_id| Route::Schedule { schedule_id })
    });
    route_parser.add_route_with_params(r"^/schedules/([^/]+)/price_tiers$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse().ok())
            .map(|schedule_id| Route::SchedulePriceTiers { schedule_id })
    });
    route_parser.add_route(r"^/price_tiers$", || Route::PriceTiers);
    route_parser.add_route_with_params(r"^/price_tiers/([^/]+)$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse().ok())
            .map(|price_id| Route::PriceTier { price_id })
    });

    // Checkout and orders
    route_parser.add_route(r"^/checkout$", || Route::Checkout);
    route_parser.add_route_with_params(r"^/checkout/([^/]+)/confirm$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse().ok())
            .map(|payment_intent_id| Route::CheckoutConfirm { payment_intent_id })
    });
    route_parser.add_route_with_params(r"^/orders/by-payment-intent/([^/]+)$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse().ok())
            .map(|payment_intent_id| Route::OrderByPaymentIntent { payment_intent_id })
    });
    route_parser.add_route_with_params(r"^/orders/([^/]+)$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse().ok())
            .map(|order_id| Route::Order { order_id })
    });
    route_parser.add_route_with_params(r"^/orders/([^/]+)/payment_status$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse().ok())
            .map(|order_id| Route::OrderPaymentStatus { order_id })
    });

    // Users
    route_parser.add_route(r"^/users/current$", || Route::CurrentUser);
    route_parser.add_route(r"^/users$", || Route::Users);
    route_parser.add_route_with_params(r"^/users/([^/]+)$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse().ok())
            .map(|user_id| Route::User { user_id })
    });

    route_parser
}
