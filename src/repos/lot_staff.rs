//! Repo for the lot_staff table: supervisors and employees of a lot

use diesel;
use diesel::connection::AnsiTransactionManager;
use diesel::dsl::exists;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_dsl::RunQueryDsl;
use diesel::Connection;
use failure::Error as FailureError;
use failure::Fail;

use models::authorization::*;
use models::{LotId, LotStaff, NewLotStaff, StaffMember, StaffPosition, UserId};
use repos::legacy_acl::*;
use schema::lot_staff::dsl as LotStaffDsl;
use schema::users::dsl as Users;

use super::acl;
use super::error::*;
use super::types::RepoResult;

type LotStaffRepoAcl = Box<Acl<Resource, Action, Scope, FailureError, LotAccess>>;

pub trait LotStaffRepo {
    /// Staff of a lot with their profiles, oldest assignment first
    fn list_by_lot(&self, lot_id: LotId) -> RepoResult<Vec<StaffMember>>;

    /// Lots the user is attached to, with any position
    fn list_by_user(&self, user_id: UserId) -> RepoResult<Vec<LotStaff>>;

    /// Attaches a user to a lot or changes the position of an attached one
    fn add(&self, payload: NewLotStaff) -> RepoResult<LotStaff>;

    fn remove(&self, lot_id: LotId, user_id: UserId) -> RepoResult<Option<LotStaff>>;
}

pub struct LotStaffRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
    pub acl: LotStaffRepoAcl,
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> LotStaffRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T, acl: LotStaffRepoAcl) -> Self {
        Self { db_conn, acl }
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> LotStaffRepo for LotStaffRepoImpl<'a, T> {
    fn list_by_lot(&self, lot_id: LotId) -> RepoResult<Vec<StaffMember>> {
        debug!("Getting staff of lot {}", lot_id);

        acl::check(&*self.acl, Resource::LotStaff, Action::Read, self, Some(&LotAccess::new(lot_id)))
            .map_err(ectx!(try ErrorKind::Forbidden => lot_id))?;

        LotStaffDsl::lot_staff
            .inner_join(Users::users)
            .filter(LotStaffDsl::lot_id.eq(lot_id))
            .select((Users::user_id, Users::email, Users::full_name, Users::phone, LotStaffDsl::position))
            .order_by(LotStaffDsl::created_at.asc())
            .get_results::<StaffMember>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => lot_id)
            })
    }

    fn list_by_user(&self, user_id: UserId) -> RepoResult<Vec<LotStaff>> {
        debug!("Getting lots of staff member {}", user_id);

        let records = LotStaffDsl::lot_staff
            .filter(LotStaffDsl::user_id.eq(user_id))
            .order_by(LotStaffDsl::created_at.asc())
            .get_results::<LotStaff>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(try err e, ErrorSource::Diesel, error_kind => user_id)
            })?;

        for record in &records {
            acl::check(&*self.acl, Resource::LotStaff, Action::Read, self, Some(&LotAccess::from(record)))
                .map_err(ectx!(try ErrorKind::Forbidden => user_id))?;
        }

        Ok(records)
    }

    fn add(&self, payload: NewLotStaff) -> RepoResult<LotStaff> {
        debug!("Adding lot staff: {:?}", payload);

        let access = LotAccess::from(&payload);
        acl::check(&*self.acl, Resource::LotStaff, Action::Write, self, Some(&access))
            .map_err(ectx!(try ErrorKind::Forbidden => access))?;

        diesel::insert_into(LotStaffDsl::lot_staff)
            .values(&payload)
            .on_conflict((LotStaffDsl::lot_id, LotStaffDsl::user_id))
            .do_update()
            .set(LotStaffDsl::position.eq(payload.position))
            .get_result::<LotStaff>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => payload)
            })
    }

    fn remove(&self, lot_id: LotId, user_id: UserId) -> RepoResult<Option<LotStaff>> {
        debug!("Removing user {} from the staff of lot {}", user_id, lot_id);

        acl::check(&*self.acl, Resource::LotStaff, Action::Write, self, Some(&LotAccess::new(lot_id)))
            .map_err(ectx!(try ErrorKind::Forbidden => lot_id, user_id))?;

        let filtered = LotStaffDsl::lot_staff
            .filter(LotStaffDsl::lot_id.eq(lot_id))
            .filter(LotStaffDsl::user_id.eq(user_id));

        diesel::delete(filtered)
            .get_result::<LotStaff>(self.db_conn)
            .optional()
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => lot_id, user_id)
            })
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> CheckScope<Scope, LotAccess>
    for LotStaffRepoImpl<'a, T>
{
    fn is_in_scope(&self, user_id: UserId, scope: &Scope, obj: Option<&LotAccess>) -> bool {
        match *scope {
            Scope::All => true,
            Scope::Owned => obj.map(|access| user_supervises_lot(self.db_conn, user_id, access.lot_id)).unwrap_or(false),
        }
    }
}

/// Owned scope of every lot-related resource
pub fn user_supervises_lot<T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static>(
    conn: &T,
    user_id: UserId,
    lot_id: LotId,
) -> bool {
    let query = LotStaffDsl::lot_staff
        .filter(LotStaffDsl::lot_id.eq(lot_id))
        .filter(LotStaffDsl::user_id.eq(user_id))
        .filter(LotStaffDsl::position.eq(StaffPosition::Supervisor));

    diesel::select(exists(query)).get_result::<bool>(conn).unwrap_or_else(|e| {
        error!("Failed to check if user {} supervises lot {}: {}", user_id, lot_id, e);
        false
    })
}
