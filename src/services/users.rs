//! Accounts of the platform users and the staff of the lots

use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::Fail;
use r2d2::ManageConnection;
use validator::Validate;

use super::types::ServiceFuture;
use super::{not_found, ready, Error, ErrorContext, ErrorKind, Service};
use models::*;
use repos::repo_factory::ReposFactory;
use repos::UsersRepo;
use services::error::validation_error;

pub trait UserService {
    fn current_user(&self) -> ServiceFuture<User>;
    /// Registers a user, admins only
    fn create_user(&self, payload: NewUser) -> ServiceFuture<User>;
    /// Users edit their own profile, roles are changed by admins only
    fn update_user(&self, user_id: UserId, payload: UpdateUser) -> ServiceFuture<User>;
    fn lot_staff(&self, lot_id: LotId) -> ServiceFuture<Vec<StaffMember>>;
    /// Assigns a user to a lot, or changes their position there
    fn assign_staff(&self, lot_id: LotId, payload: AssignStaffPayload) -> ServiceFuture<LotStaff>;
    fn remove_staff(&self, lot_id: LotId, user_id: UserId) -> ServiceFuture<LotStaff>;
}

fn load_user(users_repo: &UsersRepo, user_id: UserId) -> Result<User, Error> {
    users_repo
        .get(user_id)
        .map_err(ectx!(try convert => user_id))?
        .ok_or_else(|| not_found(ErrorContext::UserNotFound, format!("User {}", user_id)))
}

fn forbidden(context: ErrorContext, message: String) -> Error {
    let e = format_err!("{}", message);
    ectx!(err e, context, ErrorKind::Forbidden)
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > UserService for Service<T, M, F>
{
    fn current_user(&self) -> ServiceFuture<User> {
        let user_id = match self.current_user_id() {
            Ok(user_id) => user_id,
            Err(e) => return ready(Err(e)),
        };
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let users_repo = repo_factory.create_users_repo(&conn, Some(user_id));
            load_user(&*users_repo, user_id)
        })
    }

    fn create_user(&self, payload: NewUser) -> ServiceFuture<User> {
        let caller_id = match self.current_user_id() {
            Ok(user_id) => user_id,
            Err(e) => return ready(Err(e)),
        };
        if let Err(errors) = payload.validate() {
            return ready(Err(validation_error(errors)));
        }
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let sys_users_repo = repo_factory.create_users_repo_with_sys_acl(&conn);
            let users_repo = repo_factory.create_users_repo(&conn, Some(caller_id));

            let caller = load_user(&*sys_users_repo, caller_id)?;
            if caller.role != Role::Admin {
                return Err(forbidden(
                    ErrorContext::Unauthorized,
                    format!("User {} is not allowed to register users", caller_id),
                ));
            }

            let user = users_repo.create(payload.clone()).map_err(ectx!(try convert => payload))?;
            info!("User {} registered as {} by {}", user.user_id, user.role, caller_id);
            Ok(user)
        })
    }

    fn update_user(&self, user_id: UserId, payload: UpdateUser) -> ServiceFuture<User> {
        let caller_id = match self.current_user_id() {
            Ok(user_id) => user_id,
            Err(e) => return ready(Err(e)),
        };
        if let Err(errors) = payload.validate() {
            return ready(Err(validation_error(errors)));
        }
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let sys_users_repo = repo_factory.create_users_repo_with_sys_acl(&conn);
            let users_repo = repo_factory.create_users_repo(&conn, Some(caller_id));

            let caller = load_user(&*sys_users_repo, caller_id)?;
            let is_admin = caller.role == Role::Admin;
            if !is_admin && caller_id != user_id {
                return Err(forbidden(
                    ErrorContext::Unauthorized,
                    format!("User {} can not edit user {}", caller_id, user_id),
                ));
            }
            if !is_admin && payload.role.is_some() {
                return Err(forbidden(ErrorContext::RoleChange, format!("User {} can not change roles", caller_id)));
            }

            if payload.is_empty() {
                return load_user(&*users_repo, user_id);
            }
            load_user(&*sys_users_repo, user_id)?;

            let role = payload.role;
            let user = users_repo
                .update(user_id, payload.clone())
                .map_err(ectx!(try convert => user_id, payload))?;
            if let Some(role) = role {
                info!("User {} is now {}, changed by {}", user_id, role, caller_id);
            }
            Ok(user)
        })
    }

    fn lot_staff(&self, lot_id: LotId) -> ServiceFuture<Vec<StaffMember>> {
        let user_id = match self.current_user_id() {
            Ok(user_id) => user_id,
            Err(e) => return ready(Err(e)),
        };
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let lots_repo = repo_factory.create_lots_repo_with_sys_acl(&conn);
            let lot_staff_repo = repo_factory.create_lot_staff_repo(&conn, Some(user_id));

            lots_repo
                .get(lot_id)
                .map_err(ectx!(try convert => lot_id))?
                .ok_or_else(|| not_found(ErrorContext::LotNotFound, format!("Lot {}", lot_id)))?;
            lot_staff_repo.list_by_lot(lot_id).map_err(ectx!(convert => lot_id))
        })
    }

    fn assign_staff(&self, lot_id: LotId, payload: AssignStaffPayload) -> ServiceFuture<LotStaff> {
        let caller_id = match self.current_user_id() {
            Ok(user_id) => user_id,
            Err(e) => return ready(Err(e)),
        };
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let lots_repo = repo_factory.create_lots_repo_with_sys_acl(&conn);
            let sys_users_repo = repo_factory.create_users_repo_with_sys_acl(&conn);
            let lot_staff_repo = repo_factory.create_lot_staff_repo(&conn, Some(caller_id));

            conn.transaction(move || {
                lots_repo
                    .get(lot_id)
                    .map_err(ectx!(try convert => lot_id))?
                    .ok_or_else(|| not_found(ErrorContext::LotNotFound, format!("Lot {}", lot_id)))?;
                let user = load_user(&*sys_users_repo, payload.user_id)?;

                let new_staff = NewLotStaff {
                    lot_id,
                    user_id: user.user_id,
                    position: payload.position,
                };
                let staff = lot_staff_repo.add(new_staff.clone()).map_err(ectx!(try convert => new_staff))?;

                // customers get access to the dashboard with their first assignment
                if user.role == Role::Customer {
                    let promotion = UpdateUser {
                        role: Some(Role::Supervisor),
                        ..Default::default()
                    };
                    let user_id = user.user_id;
                    sys_users_repo
                        .update(user_id, promotion.clone())
                        .map_err(ectx!(try convert => user_id, promotion))?;
                }

                info!("User {} is {} at lot {}, assigned by {}", staff.user_id, staff.position, lot_id, caller_id);
                Ok(staff)
            })
        })
    }

    fn remove_staff(&self, lot_id: LotId, user_id: UserId) -> ServiceFuture<LotStaff> {
        let caller_id = match self.current_user_id() {
            Ok(user_id) => user_id,
            Err(e) => return ready(Err(e)),
        };
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let lot_staff_repo = repo_factory.create_lot_staff_repo(&conn, Some(caller_id));
            let staff = lot_staff_repo
                .remove(lot_id, user_id)
                .map_err(ectx!(try convert => lot_id, user_id))?
                .ok_or_else(|| not_found(ErrorContext::UserNotFound, format!("User {} does not work at lot {}", user_id, lot_id)))?;
            info!("User {} removed from lot {} by {}", user_id, lot_id, caller_id);
            Ok(staff)
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::Future;

    use super::*;
    use repos::repo_factory::tests::*;

    fn setup() -> (SharedStore, User, User) {
        let store = SharedStore::default();
        let (admin, customer) = {
            let mut store = store.lock().unwrap();
            (store.add_user(Role::Admin), store.add_user(Role::Customer))
        };
        (store, admin, customer)
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            user_id: UserId::generate(),
            email: email.to_string(),
            full_name: Some("Sam Lee".to_string()),
            phone: None,
            role: Role::Owner,
        }
    }

    #[test]
    fn test_current_user() {
        let (store, admin, _) = setup();

        let user = create_service(Some(admin.user_id), store.clone()).current_user().wait().unwrap();
        assert_eq!(user.user_id, admin.user_id);

        let e = create_service(None, store.clone()).current_user().wait().unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Forbidden);

        let e = create_service(Some(UserId::generate()), store).current_user().wait().unwrap_err();
        assert_eq!(e.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_create_user_admin_only() {
        let (store, admin, customer) = setup();

        let e = create_service(Some(customer.user_id), store.clone())
            .create_user(new_user("owner@example.com"))
            .wait()
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Forbidden);

        let service = create_service(Some(admin.user_id), store);
        let user = service.create_user(new_user("owner@example.com")).wait().unwrap();
        assert_eq!(user.role, Role::Owner);

        let e = service.create_user(new_user("owner@example.com")).wait().unwrap_err();
        match e.kind() {
            ErrorKind::Validation(_) => (),
            kind => panic!("unexpected {:?}", kind),
        }

        let e = service.create_user(new_user("broken")).wait().unwrap_err();
        match e.kind() {
            ErrorKind::Validation(errors) => assert!(errors.get("email").is_some()),
            kind => panic!("unexpected {:?}", kind),
        }
    }

    #[test]
    fn test_update_own_profile() {
        let (store, admin, customer) = setup();
        let service = create_service(Some(customer.user_id), store);

        let update = UpdateUser {
            phone: Some("+15557654321".to_string()),
            ..Default::default()
        };
        let user = service.update_user(customer.user_id, update.clone()).wait().unwrap();
        assert_eq!(user.phone, Some("+15557654321".to_string()));

        let e = service.update_user(admin.user_id, update).wait().unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Forbidden);

        let promotion = UpdateUser {
            role: Some(Role::Admin),
            ..Default::default()
        };
        let e = service.update_user(customer.user_id, promotion).wait().unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Forbidden);

        let unchanged = service.update_user(customer.user_id, UpdateUser::default()).wait().unwrap();
        assert_eq!(unchanged.phone, Some("+15557654321".to_string()));
    }

    #[test]
    fn test_admin_changes_roles() {
        let (store, admin, customer) = setup();
        let service = create_service(Some(admin.user_id), store);

        let promotion = UpdateUser {
            role: Some(Role::Owner),
            ..Default::default()
        };
        let user = service.update_user(customer.user_id, promotion.clone()).wait().unwrap();
        assert_eq!(user.role, Role::Owner);

        let e = service.update_user(UserId::generate(), promotion).wait().unwrap_err();
        assert_eq!(e.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_assign_and_remove_staff() {
        let (store, admin, customer) = setup();
        let lot = store.lock().unwrap().add_lot("Harbor", LotStatus::Open);
        let service = create_service(Some(admin.user_id), store.clone());

        let staff = service
            .assign_staff(
                lot.lot_id,
                AssignStaffPayload {
                    user_id: customer.user_id,
                    position: StaffPosition::Employee,
                },
            )
            .wait()
            .unwrap();
        assert_eq!(staff.position, StaffPosition::Employee);

        let members = service.lot_staff(lot.lot_id).wait().unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].email, customer.email);

        let promoted = store
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|user| user.user_id == customer.user_id)
            .map(|user| user.role);
        assert_eq!(promoted, Some(Role::Supervisor));

        let moved = service
            .assign_staff(
                lot.lot_id,
                AssignStaffPayload {
                    user_id: customer.user_id,
                    position: StaffPosition::Supervisor,
                },
            )
            .wait()
            .unwrap();
        assert_eq!(moved.position, StaffPosition::Supervisor);
        assert_eq!(service.lot_staff(lot.lot_id).wait().unwrap().len(), 1);

        service.remove_staff(lot.lot_id, customer.user_id).wait().unwrap();
        assert!(service.lot_staff(lot.lot_id).wait().unwrap().is_empty());

        let e = service.remove_staff(lot.lot_id, customer.user_id).wait().unwrap_err();
        assert_eq!(e.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_assign_staff_unknown_lot_or_user() {
        let (store, admin, customer) = setup();
        let lot = store.lock().unwrap().add_lot("Harbor", LotStatus::Open);
        let service = create_service(Some(admin.user_id), store);

        let e = service
            .assign_staff(
                LotId::generate(),
                AssignStaffPayload {
                    user_id: customer.user_id,
                    position: StaffPosition::Employee,
                },
            )
            .wait()
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::NotFound);

        let e = service
            .assign_staff(
                lot.lot_id,
                AssignStaffPayload {
                    user_id: UserId::generate(),
                    position: StaffPosition::Employee,
                },
            )
            .wait()
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::NotFound);
    }
}
