//! Objects the scope checks of repos work on

use models::{Lot, LotId, LotStaff, NewLotStaff, NewOrder, NewSchedule, NewUser, Order, Schedule, User, UserId};

/// Anything that belongs to a lot: the lot itself, its staff, schedules,
/// price tiers and orders
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LotAccess {
    pub lot_id: LotId,
}

impl LotAccess {
    pub fn new(lot_id: LotId) -> Self {
        LotAccess { lot_id }
    }
}

impl<'a> From<&'a Lot> for LotAccess {
    fn from(lot: &'a Lot) -> Self {
        LotAccess::new(lot.lot_id)
    }
}

impl<'a> From<&'a LotStaff> for LotAccess {
    fn from(staff: &'a LotStaff) -> Self {
        LotAccess::new(staff.lot_id)
    }
}

impl<'a> From<&'a NewLotStaff> for LotAccess {
    fn from(staff: &'a NewLotStaff) -> Self {
        LotAccess::new(staff.lot_id)
    }
}

impl<'a> From<&'a Schedule> for LotAccess {
    fn from(schedule: &'a Schedule) -> Self {
        LotAccess::new(schedule.lot_id)
    }
}

impl<'a> From<&'a NewSchedule> for LotAccess {
    fn from(schedule: &'a NewSchedule) -> Self {
        LotAccess::new(schedule.lot_id)
    }
}

impl<'a> From<&'a Order> for LotAccess {
    fn from(order: &'a Order) -> Self {
        LotAccess::new(order.lot_id)
    }
}

impl<'a> From<&'a NewOrder> for LotAccess {
    fn from(order: &'a NewOrder) -> Self {
        LotAccess::new(order.lot_id)
    }
}

/// A user record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UserAccess {
    pub user_id: UserId,
}

impl<'a> From<&'a User> for UserAccess {
    fn from(user: &'a User) -> Self {
        UserAccess { user_id: user.user_id }
    }
}

impl<'a> From<&'a NewUser> for UserAccess {
    fn from(user: &'a NewUser) -> Self {
        UserAccess { user_id: user.user_id }
    }
}
