use chrono::NaiveDateTime;
use diesel::sql_types::Uuid as SqlUuid;
use uuid::Uuid;
use validator::Validate;

use models::authorization::Role;
use models::validation::{not_blank, PHONE_REGEX};
use schema::users;

/// Id issued by the upstream authentication gateway
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, From, FromStr, Serialize, Deserialize, FromSqlRow, AsExpression)]
#[sql_type = "SqlUuid"]
pub struct UserId(Uuid);
derive_newtype_sql!(user_id_sql, SqlUuid, UserId, UserId);

impl UserId {
    pub fn new(id: Uuid) -> Self {
        UserId(id)
    }

    pub fn inner(&self) -> &Uuid {
        &self.0
    }

    pub fn generate() -> Self {
        UserId(Uuid::new_v4())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Queryable)]
pub struct User {
    pub user_id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize, Insertable, Validate)]
#[table_name = "users"]
pub struct NewUser {
    pub user_id: UserId,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = "1", max = "100"), custom = "not_blank")]
    pub full_name: Option<String>,
    #[validate(regex = "PHONE_REGEX")]
    pub phone: Option<String>,
    pub role: Role,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, AsChangeset, Validate)]
#[table_name = "users"]
pub struct UpdateUser {
    #[validate(length(min = "1", max = "100"), custom = "not_blank")]
    pub full_name: Option<String>,
    #[validate(regex = "PHONE_REGEX")]
    pub phone: Option<String>,
    pub role: Option<Role>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.phone.is_none() && self.role.is_none()
    }
}
