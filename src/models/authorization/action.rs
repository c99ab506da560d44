//! Action enum for authorization
use std::fmt;

// All gives all permissions.
// Create - add a resource that has no owner yet, Read - get or list resources,
// Write - create, update or delete resources within the scope.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    All,
    Create,
    Read,
    Write,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Action::All => write!(f, "all"),
            Action::Create => write!(f, "create"),
            Action::Read => write!(f, "read"),
            Action::Write => write!(f, "write"),
        }
    }
}
