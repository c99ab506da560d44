//! Models contains all structures that are used in different
//! modules of the app

pub mod amount;
pub mod authorization;
pub mod availability;
pub mod checkout;
pub mod lot;
pub mod order;
pub mod payment_intent;
pub mod price_tier;
pub mod schedule;
pub mod staff;
pub mod user;
pub mod validation;

pub use self::amount::*;
pub use self::authorization::*;
pub use self::availability::*;
pub use self::checkout::*;
pub use self::lot::*;
pub use self::order::*;
pub use self::payment_intent::*;
pub use self::price_tier::*;
pub use self::schedule::*;
pub use self::staff::*;
pub use self::user::*;
