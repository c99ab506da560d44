use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::Error as FailureError;

use models::*;
use repos::legacy_acl::{Acl, SystemACL, UnauthorizedACL};
use repos::*;

pub trait ReposFactory<C>: Clone + Send + Sync + 'static
where
    C: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
{
    fn create_lots_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<LotsRepo + 'a>;
    fn create_lots_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<LotsRepo + 'a>;
    fn create_lot_staff_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<LotStaffRepo + 'a>;
    fn create_lot_staff_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<LotStaffRepo + 'a>;
    fn create_schedules_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<SchedulesRepo + 'a>;
    fn create_schedules_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<SchedulesRepo + 'a>;
    fn create_price_tiers_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<PriceTiersRepo + 'a>;
    fn create_price_tiers_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<PriceTiersRepo + 'a>;
    fn create_orders_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<OrdersRepo + 'a>;
    fn create_orders_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<OrdersRepo + 'a>;
    fn create_users_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<UsersRepo + 'a>;
    fn create_users_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<UsersRepo + 'a>;
}

#[derive(Clone)]
pub struct ReposFactoryImpl {
    roles_cache: RolesCacheImpl,
}

impl ReposFactoryImpl {
    pub fn new(roles_cache: RolesCacheImpl) -> Self {
        Self { roles_cache }
    }

    pub fn get_roles<'a, C: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static>(
        &self,
        id: UserId,
        db_conn: &'a C,
    ) -> Vec<Role> {
        self.create_users_repo_with_sys_acl(db_conn)
            .list_for_user(id)
            .map_err(|e| error!("Failed to read roles of user {}: {}", id, e))
            .ok()
            .unwrap_or_default()
    }

    fn get_acl<'a, T, C: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static>(
        &self,
        db_conn: &'a C,
        user_id: Option<UserId>,
    ) -> Box<Acl<Resource, Action, Scope, FailureError, T>> {
        user_id.map_or(
            Box::new(UnauthorizedACL::default()) as Box<Acl<Resource, Action, Scope, FailureError, T>>,
            |id| {
                let roles = self.get_roles(id, db_conn);
                Box::new(ApplicationAcl::new(roles, id)) as Box<Acl<Resource, Action, Scope, FailureError, T>>
            },
        )
    }
}

impl<C> ReposFactory<C> for ReposFactoryImpl
where
    C: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
{
    fn create_lots_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<LotsRepo + 'a> {
        let acl = self.get_acl(db_conn, user_id);
        Box::new(LotsRepoImpl::new(db_conn, acl)) as Box<LotsRepo>
    }

    fn create_lots_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<LotsRepo + 'a> {
        Box::new(LotsRepoImpl::new(
            db_conn,
            Box::new(SystemACL::default()) as Box<Acl<Resource, Action, Scope, FailureError, LotAccess>>,
        )) as Box<LotsRepo>
    }

    fn create_lot_staff_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<LotStaffRepo + 'a> {
        let acl = self.get_acl(db_conn, user_id);
        Box::new(LotStaffRepoImpl::new(db_conn, acl)) as Box<LotStaffRepo>
    }

    fn create_lot_staff_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<LotStaffRepo + 'a> {
        Box::new(LotStaffRepoImpl::new(db_conn, Box::new(SystemACL::default()))) as Box<LotStaffRepo>
    }

    fn create_schedules_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<SchedulesRepo + 'a> {
        let acl = self.get_acl(db_conn, user_id);
        Box::new(SchedulesRepoImpl::new(db_conn, acl)) as Box<SchedulesRepo>
    }

    fn create_schedules_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<SchedulesRepo + 'a> {
        Box::new(SchedulesRepoImpl::new(db_conn, Box::new(SystemACL::default()))) as Box<SchedulesRepo>
    }

    fn create_price_tiers_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<PriceTiersRepo + 'a> {
        let acl = self.get_acl(db_conn, user_id);
        Box::new(PriceTiersRepoImpl::new(db_conn, acl)) as Box<PriceTiersRepo>
    }

    fn create_price_tiers_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<PriceTiersRepo + 'a> {
        Box::new(PriceTiersRepoImpl::new(db_conn, Box::new(SystemACL::default()))) as Box<PriceTiersRepo>
    }

    fn create_orders_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<OrdersRepo + 'a> {
        let acl = self.get_acl(db_conn, user_id);
        Box::new(OrdersRepoImpl::new(db_conn, acl)) as Box<OrdersRepo>
    }

    fn create_orders_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<OrdersRepo + 'a> {
        Box::new(OrdersRepoImpl::new(db_conn, Box::new(SystemACL::default()))) as Box<OrdersRepo>
    }

    fn create_users_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<UsersRepo + 'a> {
        let acl = self.get_acl(db_conn, user_id);
        Box::new(UsersRepoImpl::new(db_conn, acl, self.roles_cache.clone())) as Box<UsersRepo>
    }

    fn create_users_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<UsersRepo + 'a> {
        Box::new(UsersRepoImpl::new(
            db_conn,
            Box::new(SystemACL::default()) as Box<Acl<Resource, Action, Scope, FailureError, UserAccess>>,
            self.roles_cache.clone(),
        )) as Box<UsersRepo>
    }
}
