use diesel;
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_dsl::RunQueryDsl;
use diesel::Connection;
use failure::Error as FailureError;
use failure::Fail;

use models::authorization::*;
use models::{LotId, NewPriceTier, PriceTier, PriceTierId, ScheduleId, UpdatePriceTier, UserId};
use repos::legacy_acl::*;
use schema::price_tiers::dsl as PriceTiers;
use schema::schedules::dsl as Schedules;

use super::acl;
use super::error::*;
use super::lot_staff::user_supervises_lot;
use super::types::RepoResult;

type PriceTiersRepoAcl = Box<Acl<Resource, Action, Scope, FailureError, LotAccess>>;

pub trait PriceTiersRepo {
    fn get(&self, price_id: PriceTierId) -> RepoResult<Option<PriceTier>>;
    /// Tiers of a schedule, shortest stay first
    fn list_by_schedule(&self, schedule_id: ScheduleId) -> RepoResult<Vec<PriceTier>>;
    fn list_by_schedules(&self, schedule_ids: Vec<ScheduleId>) -> RepoResult<Vec<PriceTier>>;
    fn create(&self, payload: NewPriceTier) -> RepoResult<PriceTier>;
    fn update(&self, price_id: PriceTierId, payload: UpdatePriceTier) -> RepoResult<PriceTier>;
    fn delete(&self, price_id: PriceTierId) -> RepoResult<Option<PriceTier>>;
}

pub struct PriceTiersRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
    pub acl: PriceTiersRepoAcl,
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> PriceTiersRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T, acl: PriceTiersRepoAcl) -> Self {
        Self { db_conn, acl }
    }

    fn check(&self, action: Action, lot_id: LotId) -> RepoResult<()> {
        let access = LotAccess::new(lot_id);
        acl::check(&*self.acl, Resource::PriceTier, action, self, Some(&access))
            .map_err(ectx!(try ErrorKind::Forbidden => action, access))?;
        Ok(())
    }

    /// Tiers carry no lot of their own, it comes from their schedule
    fn lot_of_schedule(&self, schedule_id: ScheduleId) -> RepoResult<LotId> {
        Schedules::schedules
            .filter(Schedules::schedule_id.eq(schedule_id))
            .select(Schedules::lot_id)
            .get_result::<LotId>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => schedule_id)
            })
    }

    fn get_raw(&self, price_id: PriceTierId) -> RepoResult<Option<PriceTier>> {
        PriceTiers::price_tiers
            .filter(PriceTiers::price_id.eq(price_id))
            .get_result::<PriceTier>(self.db_conn)
            .optional()
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => price_id)
            })
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> PriceTiersRepo for PriceTiersRepoImpl<'a, T> {
    fn get(&self, price_id: PriceTierId) -> RepoResult<Option<PriceTier>> {
        debug!("Getting a price tier with ID: {}", price_id);

        let tier = self.get_raw(price_id)?;
        if let Some(ref tier) = tier {
            let lot_id = self.lot_of_schedule(tier.schedule_id)?;
            self.check(Action::Read, lot_id)?;
        }
        Ok(tier)
    }

    fn list_by_schedule(&self, schedule_id: ScheduleId) -> RepoResult<Vec<PriceTier>> {
        debug!("Getting price tiers of schedule {}", schedule_id);

        let lot_id = self.lot_of_schedule(schedule_id)?;
        self.check(Action::Read, lot_id)?;

        PriceTiers::price_tiers
            .filter(PriceTiers::schedule_id.eq(schedule_id))
            .order_by(PriceTiers::max_hours.asc())
            .get_results::<PriceTier>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => schedule_id)
            })
    }

    fn list_by_schedules(&self, schedule_ids: Vec<ScheduleId>) -> RepoResult<Vec<PriceTier>> {
        debug!("Getting price tiers of schedules {:?}", schedule_ids);

        if schedule_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut lot_ids = Schedules::schedules
            .filter(Schedules::schedule_id.eq_any(&schedule_ids))
            .select(Schedules::lot_id)
            .get_results::<LotId>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(try err e, ErrorSource::Diesel, error_kind => schedule_ids)
            })?;
        lot_ids.sort_by_key(|lot_id| *lot_id.inner());
        lot_ids.dedup();
        for lot_id in lot_ids {
            self.check(Action::Read, lot_id)?;
        }

        PriceTiers::price_tiers
            .filter(PriceTiers::schedule_id.eq_any(&schedule_ids))
            .order_by((PriceTiers::schedule_id.asc(), PriceTiers::max_hours.asc()))
            .get_results::<PriceTier>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => schedule_ids)
            })
    }

    fn create(&self, payload: NewPriceTier) -> RepoResult<PriceTier> {
        debug!("Creating a price tier using payload: {:?}", payload);

        let lot_id = self.lot_of_schedule(payload.schedule_id)?;
        self.check(Action::Write, lot_id)?;

        diesel::insert_into(PriceTiers::price_tiers)
            .values(&payload)
            .get_result::<PriceTier>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => payload)
            })
    }

    fn update(&self, price_id: PriceTierId, payload: UpdatePriceTier) -> RepoResult<PriceTier> {
        debug!("Updating price tier {} with payload: {:?}", price_id, payload);

        let tier = self.get_raw(price_id)?.ok_or_else(|| {
            let e = format_err!("Price tier {} not found", price_id);
            ectx!(try err e, ErrorKind::NotFound)
        })?;
        let lot_id = self.lot_of_schedule(tier.schedule_id)?;
        self.check(Action::Write, lot_id)?;

        if payload.is_empty() {
            return Ok(tier);
        }

        diesel::update(PriceTiers::price_tiers.filter(PriceTiers::price_id.eq(price_id)))
            .set(&payload)
            .get_result::<PriceTier>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => price_id, payload)
            })
    }

    fn delete(&self, price_id: PriceTierId) -> RepoResult<Option<PriceTier>> {
        debug!("Deleting a price tier with ID: {}", price_id);

        let tier = match self.get_raw(price_id)? {
            None => return Ok(None),
            Some(tier) => tier,
        };
        let lot_id = self.lot_of_schedule(tier.schedule_id)?;
        self.check(Action::Write, lot_id)?;

        diesel::delete(PriceTiers::price_tiers.filter(PriceTiers::price_id.eq(price_id)))
            .get_result::<PriceTier>(self.db_conn)
            .optional()
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => price_id)
            })
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> CheckScope<Scope, LotAccess>
    for PriceTiersRepoImpl<'a, T>
{
    fn is_in_scope(&self, user_id: UserId, scope: &Scope, obj: Option<&LotAccess>) -> bool {
        match *scope {
            Scope::All => true,
            Scope::Owned => obj.map(|access| user_supervises_lot(self.db_conn, user_id, access.lot_id)).unwrap_or(false),
        }
    }
}
