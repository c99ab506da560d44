//! Repo for the users table. Every user has exactly one role, which is
//! what the ACL of all the other repos is built from.

use diesel;
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_dsl::RunQueryDsl;
use diesel::Connection;
use failure::Error as FailureError;
use failure::Fail;

use models::authorization::*;
use models::{NewUser, UpdateUser, User, UserId};
use repos::legacy_acl::*;
use schema::users::dsl as Users;

use super::acl;
use super::acl::RolesCacheImpl;
use super::error::*;
use super::types::RepoResult;

type UsersRepoAcl = Box<Acl<Resource, Action, Scope, FailureError, UserAccess>>;

pub trait UsersRepo {
    fn get(&self, user_id: UserId) -> RepoResult<Option<User>>;
    fn get_many(&self, user_ids: Vec<UserId>) -> RepoResult<Vec<User>>;
    fn create(&self, payload: NewUser) -> RepoResult<User>;
    fn update(&self, user_id: UserId, payload: UpdateUser) -> RepoResult<User>;
    /// Roles of a user, empty for unknown users
    fn list_for_user(&self, user_id: UserId) -> RepoResult<Vec<Role>>;
}

pub struct UsersRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
    pub acl: UsersRepoAcl,
    pub cached_roles: RolesCacheImpl,
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> UsersRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T, acl: UsersRepoAcl, cached_roles: RolesCacheImpl) -> Self {
        Self { db_conn, acl, cached_roles }
    }

    fn check(&self, action: Action, access: UserAccess) -> RepoResult<()> {
        acl::check(&*self.acl, Resource::User, action, self, Some(&access))
            .map_err(ectx!(try ErrorKind::Forbidden => action, access))?;
        Ok(())
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> UsersRepo for UsersRepoImpl<'a, T> {
    fn get(&self, user_id: UserId) -> RepoResult<Option<User>> {
        debug!("Getting a user with ID: {}", user_id);

        let user = Users::users
            .filter(Users::user_id.eq(user_id))
            .get_result::<User>(self.db_conn)
            .optional()
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(try err e, ErrorSource::Diesel, error_kind => user_id)
            })?;

        if let Some(ref user) = user {
            self.check(Action::Read, UserAccess::from(user))?;
        }
        Ok(user)
    }

    fn get_many(&self, user_ids: Vec<UserId>) -> RepoResult<Vec<User>> {
        debug!("Getting users with IDs: {:?}", user_ids);

        let users = Users::users
            .filter(Users::user_id.eq_any(&user_ids))
            .order_by(Users::email.asc())
            .get_results::<User>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(try err e, ErrorSource::Diesel, error_kind => user_ids)
            })?;

        for user in &users {
            self.check(Action::Read, UserAccess::from(user))?;
        }
        Ok(users)
    }

    fn create(&self, payload: NewUser) -> RepoResult<User> {
        debug!("Creating a user using payload: {:?}", payload);

        self.check(Action::Create, UserAccess::from(&payload))?;

        diesel::insert_into(Users::users)
            .values(&payload)
            .get_result::<User>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => payload)
            })
    }

    fn update(&self, user_id: UserId, payload: UpdateUser) -> RepoResult<User> {
        debug!("Updating user {} with payload: {:?}", user_id, payload);

        self.check(Action::Write, UserAccess { user_id })?;

        let user = diesel::update(Users::users.filter(Users::user_id.eq(user_id)))
            .set(&payload)
            .get_result::<User>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(try err e, ErrorSource::Diesel, error_kind => user_id, payload)
            })?;

        if payload.role.is_some() {
            self.cached_roles.remove(user_id);
        }
        Ok(user)
    }

    fn list_for_user(&self, user_id: UserId) -> RepoResult<Vec<Role>> {
        debug!("Getting roles of user {}", user_id);

        self.check(Action::Read, UserAccess { user_id })?;

        if let Some(roles) = self.cached_roles.get(user_id) {
            return Ok(roles);
        }

        let roles = Users::users
            .filter(Users::user_id.eq(user_id))
            .select(Users::role)
            .get_results::<Role>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(try err e, ErrorSource::Diesel, error_kind => user_id)
            })?;

        // unknown users are not cached, they may sign up any moment
        if !roles.is_empty() {
            self.cached_roles.add_roles(user_id, &roles);
        }
        Ok(roles)
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> CheckScope<Scope, UserAccess>
    for UsersRepoImpl<'a, T>
{
    fn is_in_scope(&self, user_id: UserId, scope: &Scope, obj: Option<&UserAccess>) -> bool {
        match *scope {
            Scope::All => true,
            Scope::Owned => obj.map(|access| access.user_id == user_id).unwrap_or(false),
        }
    }
}
