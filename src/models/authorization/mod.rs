//! Access control models: who (`Role`) may do what (`Action`) on which (`Resource`) within which `Scope`

pub mod access;
pub mod action;
pub mod permission;
pub mod resource;
pub mod role;
pub mod scope;

pub use self::access::{LotAccess, UserAccess};
pub use self::action::Action;
pub use self::permission::Permission;
pub use self::resource::Resource;
pub use self::role::Role;
pub use self::scope::Scope;
