use chrono::{Duration, NaiveDateTime};
use diesel::sql_types::Uuid as SqlUuid;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use models::{Amount, ScheduleId};
use schema::price_tiers;

/// Longest booking a tier can cover, a month. Mirrored by the `max_hours` range rules below.
pub const MAX_TIER_HOURS: i32 = 24 * 31;

/// Smallest amount the card provider charges
pub const MIN_TIER_PRICE_CENTS: i64 = 50;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, From, FromStr, Serialize, Deserialize, FromSqlRow, AsExpression)]
#[sql_type = "SqlUuid"]
pub struct PriceTierId(Uuid);
derive_newtype_sql!(price_tier_id_sql, SqlUuid, PriceTierId, PriceTierId);

impl PriceTierId {
    pub fn new(id: Uuid) -> Self {
        PriceTierId(id)
    }

    pub fn inner(&self) -> &Uuid {
        &self.0
    }

    pub fn generate() -> Self {
        PriceTierId(Uuid::new_v4())
    }
}

/// "Up to `max_hours` hours for `price`"
#[derive(Clone, Debug, Serialize, Deserialize, Queryable)]
pub struct PriceTier {
    pub price_id: PriceTierId,
    pub schedule_id: ScheduleId,
    pub max_hours: i32,
    pub price: Amount,
    pub created_at: NaiveDateTime,
}

impl PriceTier {
    /// Latest moment a car parked at `start` may leave
    pub fn exit_time(&self, start: NaiveDateTime) -> NaiveDateTime {
        start + Duration::hours(i64::from(self.max_hours))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct NewPriceTierPayload {
    pub schedule_id: ScheduleId,
    #[validate(range(min = "1", max = "744"))]
    pub max_hours: i32,
    #[validate(custom = "chargeable_price")]
    pub price: Amount,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "price_tiers"]
pub struct NewPriceTier {
    pub price_id: PriceTierId,
    pub schedule_id: ScheduleId,
    pub max_hours: i32,
    pub price: Amount,
}

impl From<NewPriceTierPayload> for NewPriceTier {
    fn from(payload: NewPriceTierPayload) -> Self {
        NewPriceTier {
            price_id: PriceTierId::generate(),
            schedule_id: payload.schedule_id,
            max_hours: payload.max_hours,
            price: payload.price,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, AsChangeset, Validate)]
#[table_name = "price_tiers"]
pub struct UpdatePriceTier {
    #[validate(range(min = "1", max = "744"))]
    pub max_hours: Option<i32>,
    #[validate(custom = "chargeable_price")]
    pub price: Option<Amount>,
}

impl UpdatePriceTier {
    pub fn is_empty(&self) -> bool {
        self.max_hours.is_none() && self.price.is_none()
    }
}

/// Every tier is paid through a payment intent, so free tiers can not be checked out
fn chargeable_price(price: &Amount) -> Result<(), ValidationError> {
    if price.cents() < MIN_TIER_PRICE_CENTS {
        let mut error = ValidationError::new("min_price");
        error.message = Some(format!("price must be at least {} cents", MIN_TIER_PRICE_CENTS).into());
        return Err(error);
    }
    Ok(())
}
