use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use diesel::sql_types::{Uuid as SqlUuid, VarChar};
use uuid::Uuid;

use models::{Amount, LotId, PaymentIntentId, PriceTierId, ScheduleId};
use schema::orders;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, From, FromStr, Serialize, Deserialize, FromSqlRow, AsExpression)]
#[sql_type = "SqlUuid"]
pub struct OrderId(Uuid);
derive_newtype_sql!(order_id_sql, SqlUuid, OrderId, OrderId);

impl OrderId {
    pub fn new(id: Uuid) -> Self {
        OrderId(id)
    }

    pub fn inner(&self) -> &Uuid {
        &self.0
    }

    pub fn generate() -> Self {
        OrderId(Uuid::new_v4())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, FromSqlRow, AsExpression)]
#[sql_type = "VarChar"]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    /// Pending orders settle once, either way. Settled orders stay as they are.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        match (self, next) {
            (current, next) if current == next => true,
            (PaymentStatus::Pending, PaymentStatus::Paid) | (PaymentStatus::Pending, PaymentStatus::Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PaymentStatus::Pending => write!(f, "PENDING"),
            PaymentStatus::Paid => write!(f, "PAID"),
            PaymentStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "FAILED" => Ok(PaymentStatus::Failed),
            other => Err(format!("Unrecognized enum variant for PaymentStatus: {}", other)),
        }
    }
}

derive_text_enum_sql!(payment_status_sql, PaymentStatus);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, FromSqlRow, AsExpression)]
#[sql_type = "VarChar"]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleType {
    Standard,
    Oversize,
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            VehicleType::Standard => write!(f, "STANDARD"),
            VehicleType::Oversize => write!(f, "OVERSIZE"),
        }
    }
}

impl FromStr for VehicleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STANDARD" => Ok(VehicleType::Standard),
            "OVERSIZE" => Ok(VehicleType::Oversize),
            other => Err(format!("Unrecognized enum variant for VehicleType: {}", other)),
        }
    }
}

derive_text_enum_sql!(vehicle_type_sql, VehicleType);

impl Default for VehicleType {
    fn default() -> Self {
        VehicleType::Standard
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Queryable)]
pub struct Order {
    pub order_id: OrderId,
    pub lot_id: LotId,
    pub schedule_id: ScheduleId,
    pub price_tier: Option<PriceTierId>,
    pub email: String,
    pub phone: String,
    pub license_plate: String,
    pub license_state: String,
    pub vehicle_type: VehicleType,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub total_amount: Amount,
    pub payment_status: PaymentStatus,
    pub stripe_payment_intent_id: PaymentIntentId,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize, Insertable)]
#[table_name = "orders"]
pub struct NewOrder {
    pub order_id: OrderId,
    pub lot_id: LotId,
    pub schedule_id: ScheduleId,
    pub price_tier: Option<PriceTierId>,
    pub email: String,
    pub phone: String,
    pub license_plate: String,
    pub license_state: String,
    pub vehicle_type: VehicleType,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub total_amount: Amount,
    pub payment_status: PaymentStatus,
    pub stripe_payment_intent_id: PaymentIntentId,
}

/// Operator search over a lot's orders
#[derive(Clone, Debug)]
pub struct OrdersSearch {
    pub lot_id: LotId,
    /// Case-insensitive substring of the license plate
    pub license_plate: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderSearchResults {
    pub total_count: i64,
    pub orders: Vec<Order>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct UpdatePaymentStatus {
    pub payment_status: PaymentStatus,
}
