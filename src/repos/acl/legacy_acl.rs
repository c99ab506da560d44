//! Access control primitives the repos are built on

use models::UserId;

/// Decides whether an action on a resource is allowed
pub trait Acl<Resource, Action, Scope, Error, T> {
    fn allows(&self, resource: Resource, action: Action, scope_checker: &CheckScope<Scope, T>, obj: Option<&T>) -> Result<bool, Error>;
}

/// Implemented by repos: tells if an object lies within a scope for a user
pub trait CheckScope<Scope, T> {
    fn is_in_scope(&self, user_id: UserId, scope: &Scope, obj: Option<&T>) -> bool;
}

/// Allows everything. Used for public reads and internal writes.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemACL;

impl<Resource, Action, Scope, Error, T> Acl<Resource, Action, Scope, Error, T> for SystemACL {
    fn allows(&self, _resource: Resource, _action: Action, _scope_checker: &CheckScope<Scope, T>, _obj: Option<&T>) -> Result<bool, Error> {
        Ok(true)
    }
}

/// Denies everything. Used for callers without a user id.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnauthorizedACL;

impl<Resource, Action, Scope, Error, T> Acl<Resource, Action, Scope, Error, T> for UnauthorizedACL {
    fn allows(&self, _resource: Resource, _action: Action, _scope_checker: &CheckScope<Scope, T>, _obj: Option<&T>) -> Result<bool, Error> {
        Ok(false)
    }
}
