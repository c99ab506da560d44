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
use models::{Lot, LotId, LotsSearch, NewLot, UpdateLot, UserId};
use repos::legacy_acl::*;
use schema::lots::dsl as Lots;

use super::acl;
use super::error::*;
use super::lot_staff::user_supervises_lot;
use super::types::{contains_pattern, RepoResult};

type LotsRepoAcl = Box<Acl<Resource, Action, Scope, FailureError, LotAccess>>;

pub trait LotsRepo {
    fn get(&self, lot_id: LotId) -> RepoResult<Option<Lot>>;
    fn get_by_slug(&self, slug: String) -> RepoResult<Option<Lot>>;
    fn slug_exists(&self, slug: String) -> RepoResult<bool>;
    fn list(&self, search: LotsSearch, skip: i64, count: i64) -> RepoResult<Vec<Lot>>;
    fn list_by_ids(&self, lot_ids: Vec<LotId>) -> RepoResult<Vec<Lot>>;
    fn create(&self, payload: NewLot) -> RepoResult<Lot>;
    fn update(&self, lot_id: LotId, payload: UpdateLot) -> RepoResult<Lot>;
    fn delete(&self, lot_id: LotId) -> RepoResult<Option<Lot>>;
}

pub struct LotsRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
    pub acl: LotsRepoAcl,
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> LotsRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T, acl: LotsRepoAcl) -> Self {
        Self { db_conn, acl }
    }

    fn check_read(&self, lots: &[Lot]) -> RepoResult<()> {
        for lot in lots {
            let access = LotAccess::from(lot);
            acl::check(&*self.acl, Resource::Lot, Action::Read, self, Some(&access)).map_err(ectx!(try ErrorKind::Forbidden => access))?;
        }
        Ok(())
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> LotsRepo for LotsRepoImpl<'a, T> {
    fn get(&self, lot_id: LotId) -> RepoResult<Option<Lot>> {
        debug!("Getting a lot with ID: {}", lot_id);

        let lot = Lots::lots
            .filter(Lots::lot_id.eq(lot_id))
            .get_result::<Lot>(self.db_conn)
            .optional()
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(try err e, ErrorSource::Diesel, error_kind => lot_id)
            })?;

        if let Some(ref lot) = lot {
            self.check_read(::std::slice::from_ref(lot))?;
        }
        Ok(lot)
    }

    fn get_by_slug(&self, slug: String) -> RepoResult<Option<Lot>> {
        debug!("Getting a lot with slug: {}", slug);

        let lot = Lots::lots
            .filter(Lots::slug.eq(&slug))
            .get_result::<Lot>(self.db_conn)
            .optional()
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(try err e, ErrorSource::Diesel, error_kind => slug)
            })?;

        if let Some(ref lot) = lot {
            self.check_read(::std::slice::from_ref(lot))?;
        }
        Ok(lot)
    }

    fn slug_exists(&self, slug: String) -> RepoResult<bool> {
        debug!("Checking if lot slug {} is taken", slug);

        diesel::select(exists(Lots::lots.filter(Lots::slug.eq(&slug))))
            .get_result::<bool>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => slug)
            })
    }

    fn list(&self, search: LotsSearch, skip: i64, count: i64) -> RepoResult<Vec<Lot>> {
        debug!("Searching lots, skip={}, count={}, search {:?}", skip, count, search);

        let mut query = Lots::lots.into_boxed();
        if let Some(ref term) = search.term {
            let pattern = contains_pattern(term.trim());
            query = query.filter(Lots::name.ilike(pattern.clone()).or(Lots::location.ilike(pattern)));
        }
        if let Some(status) = search.status {
            query = query.filter(Lots::status.eq(status));
        }

        let lots = query
            .order_by(Lots::name.asc())
            .offset(skip)
            .limit(count)
            .get_results::<Lot>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(try err e, ErrorSource::Diesel, error_kind => search, skip, count)
            })?;

        self.check_read(&lots)?;
        Ok(lots)
    }

    fn list_by_ids(&self, lot_ids: Vec<LotId>) -> RepoResult<Vec<Lot>> {
        debug!("Getting lots with IDs: {:?}", lot_ids);

        let lots = Lots::lots
            .filter(Lots::lot_id.eq_any(&lot_ids))
            .order_by(Lots::name.asc())
            .get_results::<Lot>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(try err e, ErrorSource::Diesel, error_kind => lot_ids)
            })?;

        self.check_read(&lots)?;
        Ok(lots)
    }

    fn create(&self, payload: NewLot) -> RepoResult<Lot> {
        debug!("Creating a lot using payload: {:?}", payload);

        acl::check(&*self.acl, Resource::Lot, Action::Create, self, None).map_err(ectx!(try ErrorKind::Forbidden))?;

        diesel::insert_into(Lots::lots)
            .values(&payload)
            .get_result::<Lot>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => payload)
            })
    }

    fn update(&self, lot_id: LotId, payload: UpdateLot) -> RepoResult<Lot> {
        debug!("Updating lot {} with payload: {:?}", lot_id, payload);

        let access = LotAccess::new(lot_id);
        acl::check(&*self.acl, Resource::Lot, Action::Write, self, Some(&access)).map_err(ectx!(try ErrorKind::Forbidden => access))?;

        diesel::update(Lots::lots.filter(Lots::lot_id.eq(lot_id)))
            .set((&payload, Lots::updated_at.eq(diesel::dsl::now)))
            .get_result::<Lot>(self.db_conn)
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => lot_id, payload)
            })
    }

    fn delete(&self, lot_id: LotId) -> RepoResult<Option<Lot>> {
        debug!("Deleting a lot with ID: {}", lot_id);

        let access = LotAccess::new(lot_id);
        acl::check(&*self.acl, Resource::Lot, Action::Write, self, Some(&access)).map_err(ectx!(try ErrorKind::Forbidden => access))?;

        diesel::delete(Lots::lots.filter(Lots::lot_id.eq(lot_id)))
            .get_result::<Lot>(self.db_conn)
            .optional()
            .map_err(|e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, ErrorSource::Diesel, error_kind => lot_id)
            })
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> CheckScope<Scope, LotAccess>
    for LotsRepoImpl<'a, T>
{
    fn is_in_scope(&self, user_id: UserId, scope: &Scope, obj: Option<&LotAccess>) -> bool {
        match *scope {
            Scope::All => true,
            Scope::Owned => obj.map(|access| user_supervises_lot(self.db_conn, user_id, access.lot_id)).unwrap_or(false),
        }
    }
}
