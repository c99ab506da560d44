//! Repos is a module responsible for interacting with access control lists

#[macro_use]
pub mod macros;
pub mod legacy_acl;
pub mod roles_cache;

pub use self::roles_cache::RolesCacheImpl;

use std::collections::HashMap;
use std::rc::Rc;

use errors::Error;
use failure::Error as FailureError;
use failure::Fail;

use self::legacy_acl::{Acl, CheckScope};

use models::authorization::*;
use models::UserId;

pub fn check<T>(
    acl: &Acl<Resource, Action, Scope, FailureError, T>,
    resource: Resource,
    action: Action,
    scope_checker: &CheckScope<Scope, T>,
    obj: Option<&T>,
) -> Result<(), FailureError> {
    acl.allows(resource, action, scope_checker, obj).and_then(|allowed| {
        if allowed {
            Ok(())
        } else {
            Err(Error::Forbidden
                .context(format!("Denied request to do {:?} on {:?}", action, resource))
                .into())
        }
    })
}

/// ApplicationAcl holds the permissions of every role and the roles of the caller
#[derive(Clone)]
pub struct ApplicationAcl {
    acls: Rc<HashMap<Role, Vec<Permission>>>,
    roles: Vec<Role>,
    user_id: UserId,
}

impl ApplicationAcl {
    pub fn new(roles: Vec<Role>, user_id: UserId) -> Self {
        let mut hash = HashMap::new();
        hash.insert(
            Role::Admin,
            vec![
                permission!(Resource::Lot),
                permission!(Resource::LotStaff),
                permission!(Resource::Schedule),
                permission!(Resource::PriceTier),
                permission!(Resource::Order),
                permission!(Resource::User),
            ],
        );
        hash.insert(
            Role::Owner,
            vec![
                permission!(Resource::Lot, Action::Create),
                permission!(Resource::Lot, Action::All, Scope::Owned),
                permission!(Resource::LotStaff, Action::All, Scope::Owned),
                permission!(Resource::Schedule, Action::All, Scope::Owned),
                permission!(Resource::PriceTier, Action::All, Scope::Owned),
                permission!(Resource::Order, Action::All, Scope::Owned),
                permission!(Resource::User, Action::Read),
                permission!(Resource::User, Action::Write, Scope::Owned),
            ],
        );
        hash.insert(
            Role::Supervisor,
            vec![
                permission!(Resource::Lot, Action::Read, Scope::Owned),
                permission!(Resource::LotStaff, Action::Read, Scope::Owned),
                permission!(Resource::Schedule, Action::All, Scope::Owned),
                permission!(Resource::PriceTier, Action::All, Scope::Owned),
                permission!(Resource::Order, Action::All, Scope::Owned),
                permission!(Resource::User, Action::Read, Scope::Owned),
                permission!(Resource::User, Action::Write, Scope::Owned),
            ],
        );
        hash.insert(
            Role::Customer,
            vec![
                permission!(Resource::User, Action::Read, Scope::Owned),
                permission!(Resource::User, Action::Write, Scope::Owned),
            ],
        );
        ApplicationAcl {
            acls: Rc::new(hash),
            roles,
            user_id,
        }
    }
}

impl<T> Acl<Resource, Action, Scope, FailureError, T> for ApplicationAcl {
    fn allows(
        &self,
        resource: Resource,
        action: Action,
        scope_checker: &CheckScope<Scope, T>,
        obj: Option<&T>,
    ) -> Result<bool, FailureError> {
        let empty: Vec<Permission> = Vec::new();
        let user_id = self.user_id;
        let hashed_acls = self.acls.clone();
        let mut acls = self
            .roles
            .iter()
            .flat_map(|role| hashed_acls.get(role).unwrap_or(&empty))
            .filter(|permission| (permission.resource == resource) && ((permission.action == action) || (permission.action == Action::All)))
            .filter(|permission| scope_checker.is_in_scope(user_id, &permission.scope, obj));

        Ok(acls.next().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::legacy_acl::{Acl, CheckScope};
    use super::*;
    use models::LotId;

    /// Owned lots are listed up front instead of being looked up in lot_staff
    struct ScopeChecker {
        supervised: Vec<LotId>,
    }

    impl CheckScope<Scope, LotAccess> for ScopeChecker {
        fn is_in_scope(&self, _user_id: UserId, scope: &Scope, obj: Option<&LotAccess>) -> bool {
            match *scope {
                Scope::All => true,
                Scope::Owned => obj.map(|access| self.supervised.contains(&access.lot_id)).unwrap_or(false),
            }
        }
    }

    impl CheckScope<Scope, UserAccess> for ScopeChecker {
        fn is_in_scope(&self, user_id: UserId, scope: &Scope, obj: Option<&UserAccess>) -> bool {
            match *scope {
                Scope::All => true,
                Scope::Owned => obj.map(|access| access.user_id == user_id).unwrap_or(false),
            }
        }
    }

    fn setup() -> (ScopeChecker, LotAccess, LotAccess) {
        let own = LotId::generate();
        let other = LotId::generate();
        (ScopeChecker { supervised: vec![own] }, LotAccess::new(own), LotAccess::new(other))
    }

    fn allows(acl: &ApplicationAcl, resource: Resource, action: Action, checker: &ScopeChecker, obj: Option<&LotAccess>) -> bool {
        Acl::<Resource, Action, Scope, FailureError, LotAccess>::allows(acl, resource, action, checker, obj).unwrap()
    }

    fn allows_user(acl: &ApplicationAcl, action: Action, checker: &ScopeChecker, obj: &UserAccess) -> bool {
        Acl::<Resource, Action, Scope, FailureError, UserAccess>::allows(acl, Resource::User, action, checker, Some(obj)).unwrap()
    }

    #[test]
    fn test_admin_can_do_everything() {
        let (checker, own, other) = setup();
        let acl = ApplicationAcl::new(vec![Role::Admin], UserId::generate());

        for resource in [Resource::Lot, Resource::LotStaff, Resource::Schedule, Resource::PriceTier, Resource::Order].iter() {
            assert!(allows(&acl, *resource, Action::Write, &checker, Some(&other)));
            assert!(allows(&acl, *resource, Action::Read, &checker, Some(&own)));
        }
        assert!(allows(&acl, Resource::Lot, Action::Create, &checker, None));
        let someone = UserAccess { user_id: UserId::generate() };
        assert!(allows_user(&acl, Action::Write, &checker, &someone));
    }

    #[test]
    fn test_owner_manages_own_lots_only() {
        let (checker, own, other) = setup();
        let acl = ApplicationAcl::new(vec![Role::Owner], UserId::generate());

        assert!(allows(&acl, Resource::Lot, Action::Create, &checker, None));
        assert!(allows(&acl, Resource::Lot, Action::Write, &checker, Some(&own)));
        assert!(!allows(&acl, Resource::Lot, Action::Write, &checker, Some(&other)));
        assert!(allows(&acl, Resource::LotStaff, Action::Write, &checker, Some(&own)));
        assert!(!allows(&acl, Resource::LotStaff, Action::Write, &checker, Some(&other)));
        assert!(allows(&acl, Resource::Order, Action::Read, &checker, Some(&own)));
        assert!(!allows(&acl, Resource::Order, Action::Read, &checker, Some(&other)));
    }

    #[test]
    fn test_supervisor_runs_schedules_but_not_lots() {
        let (checker, own, other) = setup();
        let acl = ApplicationAcl::new(vec![Role::Supervisor], UserId::generate());

        assert!(!allows(&acl, Resource::Lot, Action::Create, &checker, None));
        assert!(allows(&acl, Resource::Lot, Action::Read, &checker, Some(&own)));
        assert!(!allows(&acl, Resource::Lot, Action::Write, &checker, Some(&own)));
        assert!(!allows(&acl, Resource::LotStaff, Action::Write, &checker, Some(&own)));
        assert!(allows(&acl, Resource::Schedule, Action::Write, &checker, Some(&own)));
        assert!(allows(&acl, Resource::PriceTier, Action::Write, &checker, Some(&own)));
        assert!(!allows(&acl, Resource::Schedule, Action::Write, &checker, Some(&other)));
        assert!(allows(&acl, Resource::Order, Action::Write, &checker, Some(&own)));
    }

    #[test]
    fn test_customer_sees_only_own_profile() {
        let (checker, own, _) = setup();
        let user_id = UserId::generate();
        let acl = ApplicationAcl::new(vec![Role::Customer], user_id);

        assert!(!allows(&acl, Resource::Lot, Action::Create, &checker, None));
        assert!(!allows(&acl, Resource::Schedule, Action::Read, &checker, Some(&own)));
        assert!(!allows(&acl, Resource::Order, Action::Read, &checker, Some(&own)));

        let me = UserAccess { user_id };
        let someone = UserAccess { user_id: UserId::generate() };
        assert!(allows_user(&acl, Action::Read, &checker, &me));
        assert!(allows_user(&acl, Action::Write, &checker, &me));
        assert!(!allows_user(&acl, Action::Read, &checker, &someone));
    }

    #[test]
    fn test_no_roles_no_access() {
        let (checker, own, _) = setup();
        let acl = ApplicationAcl::new(vec![], UserId::generate());
        assert!(!allows(&acl, Resource::Lot, Action::Read, &checker, Some(&own)));
    }

    #[test]
    fn test_check_reports_forbidden() {
        let (checker, _, other) = setup();
        let acl = ApplicationAcl::new(vec![Role::Supervisor], UserId::generate());
        let err = check::<LotAccess>(&acl, Resource::Order, Action::Read, &checker, Some(&other)).unwrap_err();
        let forbidden = err.iter_chain().any(|cause| match cause.downcast_ref::<Error>() {
            Some(Error::Forbidden) => true,
            _ => false,
        });
        assert!(forbidden);
    }
}
