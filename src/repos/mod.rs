//! Repos is a module responsible for interacting with postgres db

#[macro_use]
pub mod acl;
pub mod error;
pub mod lot_staff;
pub mod lots;
pub mod orders;
pub mod price_tiers;
pub mod repo_factory;
pub mod schedules;
pub mod types;
pub mod users;

pub use self::acl::*;
pub use self::error::*;
pub use self::lot_staff::*;
pub use self::lots::*;
pub use self::orders::*;
pub use self::price_tiers::*;
pub use self::repo_factory::*;
pub use self::schedules::*;
pub use self::types::*;
pub use self::users::*;
