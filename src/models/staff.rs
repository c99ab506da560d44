use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use diesel::sql_types::VarChar;

use models::{LotId, UserId};
use schema::lot_staff;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, FromSqlRow, AsExpression)]
#[sql_type = "VarChar"]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffPosition {
    /// Manages schedules, price tiers and bookings of the lot
    Supervisor,
    Employee,
}

impl fmt::Display for StaffPosition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            StaffPosition::Supervisor => write!(f, "SUPERVISOR"),
            StaffPosition::Employee => write!(f, "EMPLOYEE"),
        }
    }
}

impl FromStr for StaffPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUPERVISOR" => Ok(StaffPosition::Supervisor),
            "EMPLOYEE" => Ok(StaffPosition::Employee),
            other => Err(format!("Unrecognized enum variant for StaffPosition: {}", other)),
        }
    }
}

derive_text_enum_sql!(staff_position_sql, StaffPosition);

#[derive(Clone, Debug, Serialize, Deserialize, Queryable)]
pub struct LotStaff {
    pub lot_id: LotId,
    pub user_id: UserId,
    pub position: StaffPosition,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize, Insertable)]
#[table_name = "lot_staff"]
pub struct NewLotStaff {
    pub lot_id: LotId,
    pub user_id: UserId,
    pub position: StaffPosition,
}

/// Body of the staff assignment request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssignStaffPayload {
    pub user_id: UserId,
    pub position: StaffPosition,
}

/// Staff member with the user profile, as shown to operators
#[derive(Clone, Debug, Serialize, Queryable)]
pub struct StaffMember {
    pub user_id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub position: StaffPosition,
}
