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
use models::{LotId, NewSchedule, Schedule, ScheduleChangeset, ScheduleId, UserId};
use repos::legacy_acl::*;
use schema::schedules::dsl as Schedules;

use super::acl;
use super::error::*;
use super::lot_staff::user_supervises_lot;
use super::types::RepoResult;

type SchedulesRepoAcl = Box<Acl<Resource, Action, Scope, FailureError, LotAccess>>;

pub trait SchedulesRepo {
    fn get(&self, schedule_id: ScheduleId) -> RepoResult<Option<Schedule>>;
    /// Schedules of a lot, events first, then by name
    fn list_by_lot(&self, lot_id: LotId) -> RepoResult<Vec<Schedule>>;
    fn slug_exists(&self, lot_id: LotId, slug: String) -> RepoResult<bool>;
    fn create(&self, payload: NewSchedule) -> RepoResult<Schedule>;
    fn update(&self, schedule_id: ScheduleId, payload: ScheduleChangeset) -> RepoResult<Schedule>;
    fn delete(&self, schedule_id: ScheduleId) -> RepoResult<Option<Schedule>>;
}

pub struct SchedulesRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
    pub acl: SchedulesRepoAcl,
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> SchedulesRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T, acl: SchedulesRepoAcl) -> Self {
        Self { db_conn, acl }
    }

    fn check(&self, action: Action, lot_id: LotId) -> RepoResult<()> {
        let access = LotAccess::new(lot_id);
        acl::check(&*self.acl, Resource::Schedule, action, self, Some(&access))
            .map_err(ectx!(try ErrorKind::Forbidden => action, access))?;
        Ok(())
    }

    fn get_raw(&self, schedule_id: ScheduleId) -> RepoResult<Option<Schedule>> {
        Schedules::schedules
            .filter(Schedules::schedule_id.eq(schedule_id))
            .get_result::<Schedule>(self.db_conn)
            .optional()
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => schedule_id)
            })
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> SchedulesRepo for SchedulesRepoImpl<'a, T> {
    fn get(&self, schedule_id: ScheduleId) -> RepoResult<Option<Schedule>> {
        debug!("Getting a schedule with ID: {}", schedule_id);

        let schedule = self.get_raw(schedule_id)?;
        if let Some(ref schedule) = schedule {
            self.check(Action::Read, schedule.lot_id)?;
        }
        Ok(schedule)
    }

    fn list_by_lot(&self, lot_id: LotId) -> RepoResult<Vec<Schedule>> {
        debug!("Getting schedules of lot {}", lot_id);

        self.check(Action::Read, lot_id)?;

        Schedules::schedules
            .filter(Schedules::lot_id.eq(lot_id))
            .order_by((Schedules::is_event.desc(), Schedules::name.asc()))
            .get_results::<Schedule>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => lot_id)
            })
    }

    fn slug_exists(&self, lot_id: LotId, slug: String) -> RepoResult<bool> {
        debug!("Checking if schedule slug {} is taken in lot {}", slug, lot_id);

        let query = Schedules::schedules.filter(Schedules::lot_id.eq(lot_id)).filter(Schedules::slug.eq(&slug));
        diesel::select(exists(query)).get_result::<bool>(self.db_conn).map_err(|e| {
            let error_kind = ErrorKind::from(&e);
            ectx!(err e, ErrorSource::Diesel, error_kind => lot_id, slug)
        })
    }

    fn create(&self, payload: NewSchedule) -> RepoResult<Schedule> {
        debug!("Creating a schedule using payload: {:?}", payload);

        self.check(Action::Write, payload.lot_id)?;

        diesel::insert_into(Schedules::schedules)
            .values(&payload)
            .get_result::<Schedule>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => payload)
            })
    }

    fn update(&self, schedule_id: ScheduleId, payload: ScheduleChangeset) -> RepoResult<Schedule> {
        debug!("Updating schedule {} with payload: {:?}", schedule_id, payload);

        let schedule = self.get_raw(schedule_id)?.ok_or_else(|| {
            let e = format_err!("Schedule {} not found", schedule_id);
            ectx!(try err e, ErrorKind::NotFound)
        })?;
        self.check(Action::Write, schedule.lot_id)?;

        diesel::update(Schedules::schedules.filter(Schedules::schedule_id.eq(schedule_id)))
            .set(&payload)
            .get_result::<Schedule>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => schedule_id, payload)
            })
    }

    fn delete(&self, schedule_id: ScheduleId) -> RepoResult<Option<Schedule>> {
        debug!("Deleting a schedule with ID: {}", schedule_id);

        let schedule = match self.get_raw(schedule_id)? {
            None => return Ok(None),
            Some(schedule) => schedule,
        };
        self.check(Action::Write, schedule.lot_id)?;

        diesel::delete(Schedules::schedules.filter(Schedules::schedule_id.eq(schedule_id)))
            .get_result::<Schedule>(self.db_conn)
            .optional()
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => schedule_id)
            })
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> CheckScope<Scope, LotAccess>
    for SchedulesRepoImpl<'a, T>
{
    fn is_in_scope(&self, user_id: UserId, scope: &Scope, obj: Option<&LotAccess>) -> bool {
        match *scope {
            Scope::All => true,
            Scope::Owned => obj.map(|access| user_supervises_lot(self.db_conn, user_id, access.lot_id)).unwrap_or(false),
        }
    }
}
