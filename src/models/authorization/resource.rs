//! Enum for resources available in ACLs
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Resource {
    Lot,
    LotStaff,
    Schedule,
    PriceTier,
    Order,
    User,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Resource::Lot => write!(f, "lot"),
            Resource::LotStaff => write!(f, "lot staff"),
            Resource::Schedule => write!(f, "schedule"),
            Resource::PriceTier => write!(f, "price tier"),
            Resource::Order => write!(f, "order"),
            Resource::User => write!(f, "user"),
        }
    }
}
