//! Enum for roles available in ACLs
use std::fmt;
use std::str::FromStr;

use diesel::sql_types::VarChar;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, FromSqlRow, AsExpression)]
#[sql_type = "VarChar"]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Runs the whole platform
    Admin,
    /// Owns lots and manages their staff
    Owner,
    /// Operates the lots they are assigned to
    Supervisor,
    Customer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Role::Admin => write!(f, "ADMIN"),
            Role::Owner => write!(f, "OWNER"),
            Role::Supervisor => write!(f, "SUPERVISOR"),
            Role::Customer => write!(f, "CUSTOMER"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "OWNER" => Ok(Role::Owner),
            "SUPERVISOR" => Ok(Role::Supervisor),
            "CUSTOMER" => Ok(Role::Customer),
            other => Err(format!("Unrecognized enum variant for Role: {}", other)),
        }
    }
}

derive_text_enum_sql!(role_sql, Role);
