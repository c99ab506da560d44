use chrono::NaiveDateTime;
use validator::Validate;

use models::validation::{not_blank, PHONE_REGEX};
use models::{Amount, LotId, Order, PriceTier, PriceTierId, ScheduleId, VehicleType};

/// Customer booking request
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct CheckoutPayload {
    pub lot_id: LotId,
    pub schedule_id: ScheduleId,
    pub price_id: PriceTierId,
    #[validate(email)]
    pub email: String,
    #[validate(regex = "PHONE_REGEX")]
    pub phone: String,
    #[validate(length(min = "1", max = "16"), custom = "not_blank")]
    pub license_plate: String,
    #[validate(length(min = "2", max = "32"))]
    pub license_state: String,
    #[serde(default)]
    pub vehicle_type: VehicleType,
}

impl CheckoutPayload {
    /// License plates are stored upper-case without surrounding blanks
    pub fn normalized_plate(&self) -> String {
        self.license_plate.trim().to_uppercase()
    }
}

/// Pending order together with the secret the payment form needs
#[derive(Clone, Debug, Serialize)]
pub struct Checkout {
    pub order: Order,
    pub client_secret: String,
}

/// Everything the parking pass shows for a paid order
#[derive(Clone, Debug, Serialize)]
pub struct ParkingPass {
    pub order: Order,
    pub lot_name: String,
    pub lot_location: String,
    pub price_tier: Option<PriceTier>,
}

impl ParkingPass {
    pub fn enter_after(&self) -> NaiveDateTime {
        self.order.start_time
    }

    pub fn exit_by(&self) -> NaiveDateTime {
        self.order.end_time
    }

    pub fn total(&self) -> Amount {
        self.order.total_amount
    }
}
