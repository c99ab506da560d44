use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, NaiveTime};
use diesel::sql_types::{Uuid as SqlUuid, VarChar};
use regex::Regex;
use uuid::Uuid;
use validator::Validate;

use models::validation::{not_blank, PHONE_REGEX};
use schema::lots;

lazy_static! {
    static ref SLUG_SEPARATORS: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, From, FromStr, Serialize, Deserialize, FromSqlRow, AsExpression)]
#[sql_type = "SqlUuid"]
pub struct LotId(Uuid);
derive_newtype_sql!(lot_id_sql, SqlUuid, LotId, LotId);

impl LotId {
    pub fn new(id: Uuid) -> Self {
        LotId(id)
    }

    pub fn inner(&self) -> &Uuid {
        &self.0
    }

    pub fn generate() -> Self {
        LotId(Uuid::new_v4())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, FromSqlRow, AsExpression)]
#[sql_type = "VarChar"]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LotStatus {
    Open,
    Closed,
}

impl fmt::Display for LotStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            LotStatus::Open => write!(f, "OPEN"),
            LotStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

impl FromStr for LotStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(LotStatus::Open),
            "CLOSED" => Ok(LotStatus::Closed),
            other => Err(format!("Unrecognized enum variant for LotStatus: {}", other)),
        }
    }
}

derive_text_enum_sql!(lot_status_sql, LotStatus);

#[derive(Clone, Debug, Serialize, Deserialize, Queryable)]
pub struct Lot {
    pub lot_id: LotId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub description_tag: Option<String>,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub phone: String,
    pub space_count: i32,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
    pub is_24_hours: bool,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub status: LotStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Lot {
    pub fn is_open(&self) -> bool {
        self.status == LotStatus::Open
    }
}

/// Lot fields accepted from operators. Id and slug are assigned by the service.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct NewLotPayload {
    #[validate(length(min = "1", max = "100"), custom = "not_blank")]
    pub name: String,
    pub description: Option<String>,
    pub description_tag: Option<String>,
    #[validate(length(min = "1", max = "200"), custom = "not_blank")]
    pub location: String,
    #[validate(range(min = "-90", max = "90"))]
    pub latitude: Option<f64>,
    #[validate(range(min = "-180", max = "180"))]
    pub longitude: Option<f64>,
    #[validate(regex = "PHONE_REGEX")]
    pub phone: String,
    #[validate(range(min = "1", max = "100000"))]
    pub space_count: i32,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
    #[serde(default)]
    pub is_24_hours: bool,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub status: Option<LotStatus>,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "lots"]
pub struct NewLot {
    pub lot_id: LotId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub description_tag: Option<String>,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub phone: String,
    pub space_count: i32,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
    pub is_24_hours: bool,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub status: LotStatus,
}

impl NewLot {
    pub fn new(lot_id: LotId, slug: String, payload: NewLotPayload) -> Self {
        NewLot {
            lot_id,
            name: payload.name.trim().to_string(),
            slug,
            description: payload.description,
            description_tag: payload.description_tag,
            location: payload.location.trim().to_string(),
            latitude: payload.latitude,
            longitude: payload.longitude,
            phone: payload.phone,
            space_count: payload.space_count,
            open_time: payload.open_time,
            close_time: payload.close_time,
            is_24_hours: payload.is_24_hours,
            amenities: payload.amenities,
            images: payload.images,
            status: payload.status.unwrap_or(LotStatus::Open),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, AsChangeset, Validate)]
#[table_name = "lots"]
pub struct UpdateLot {
    #[validate(length(min = "1", max = "100"), custom = "not_blank")]
    pub name: Option<String>,
    pub description: Option<String>,
    pub description_tag: Option<String>,
    #[validate(length(min = "1", max = "200"), custom = "not_blank")]
    pub location: Option<String>,
    #[validate(range(min = "-90", max = "90"))]
    pub latitude: Option<f64>,
    #[validate(range(min = "-180", max = "180"))]
    pub longitude: Option<f64>,
    #[validate(regex = "PHONE_REGEX")]
    pub phone: Option<String>,
    #[validate(range(min = "1", max = "100000"))]
    pub space_count: Option<i32>,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
    pub is_24_hours: Option<bool>,
    pub amenities: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub status: Option<LotStatus>,
}

/// Public lot listing filter
#[derive(Clone, Debug, Default)]
pub struct LotsSearch {
    /// Case-insensitive substring of the name or location
    pub term: Option<String>,
    pub status: Option<LotStatus>,
}

/// Url-friendly version of a name: lower-case ascii letters and digits
/// separated by single dashes.
pub fn slugify(name: &str) -> String {
    let lower = name.to_lowercase();
    SLUG_SEPARATORS.replace_all(&lower, "-").trim_matches('-').to_string()
}
