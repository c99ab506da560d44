//! Lots of the operators and the public lot listing

use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::Fail;
use r2d2::ManageConnection;
use validator::Validate;

use super::types::ServiceFuture;
use super::{has_orders, not_found, ready, unique_slug, ErrorContext, ErrorKind, Service};
use models::*;
use repos::repo_factory::ReposFactory;
use services::error::validation_error;

/// Upper bound of the admin dashboard
const DASHBOARD_LIMIT: i64 = 1000;

pub trait LotService {
    /// Creates a lot and makes the caller its supervisor
    fn create_lot(&self, payload: NewLotPayload) -> ServiceFuture<Lot>;
    fn update_lot(&self, lot_id: LotId, payload: UpdateLot) -> ServiceFuture<Lot>;
    fn delete_lot(&self, lot_id: LotId) -> ServiceFuture<Lot>;
    fn get_lot(&self, lot_id: LotId) -> ServiceFuture<Lot>;
    fn get_lot_by_slug(&self, slug: String) -> ServiceFuture<Lot>;
    /// Public listing, open lots only
    fn search_lots(&self, term: Option<String>, skip: i64, count: i64) -> ServiceFuture<Vec<Lot>>;
    /// Lots on the dashboard of the caller: every lot for admins, otherwise the lots they work at
    fn lots_for_staff(&self) -> ServiceFuture<Vec<Lot>>;
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > LotService for Service<T, M, F>
{
    fn create_lot(&self, payload: NewLotPayload) -> ServiceFuture<Lot> {
        let user_id = match self.current_user_id() {
            Ok(user_id) => user_id,
            Err(e) => return ready(Err(e)),
        };
        if let Err(errors) = payload.validate() {
            return ready(Err(validation_error(errors)));
        }
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let lots_repo = repo_factory.create_lots_repo(&conn, Some(user_id));
            let lot_staff_repo = repo_factory.create_lot_staff_repo_with_sys_acl(&conn);

            conn.transaction(move || {
                let slug = unique_slug(&payload.name, "lot", |slug| {
                    lots_repo.slug_exists(slug.to_string()).map_err(ectx!(convert => slug))
                })?;
                let new_lot = NewLot::new(LotId::generate(), slug, payload);
                let lot = lots_repo.create(new_lot.clone()).map_err(ectx!(try convert => new_lot))?;

                let supervisor = NewLotStaff {
                    lot_id: lot.lot_id,
                    user_id,
                    position: StaffPosition::Supervisor,
                };
                lot_staff_repo.add(supervisor.clone()).map_err(ectx!(try convert => supervisor))?;

                info!("Lot {} ({}) created by user {}", lot.lot_id, lot.slug, user_id);
                Ok(lot)
            })
        })
    }

    fn update_lot(&self, lot_id: LotId, payload: UpdateLot) -> ServiceFuture<Lot> {
        let user_id = self.dynamic_context.user_id;
        if let Err(errors) = payload.validate() {
            return ready(Err(validation_error(errors)));
        }
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let lots_repo = repo_factory.create_lots_repo(&conn, user_id);
            lots_repo
                .get(lot_id)
                .map_err(ectx!(try convert => lot_id))?
                .ok_or_else(|| not_found(ErrorContext::LotNotFound, format!("Lot {}", lot_id)))?;
            lots_repo.update(lot_id, payload.clone()).map_err(ectx!(convert => lot_id, payload))
        })
    }

    fn delete_lot(&self, lot_id: LotId) -> ServiceFuture<Lot> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let lots_repo = repo_factory.create_lots_repo(&conn, user_id);
            let orders_repo = repo_factory.create_orders_repo_with_sys_acl(&conn);

            conn.transaction(move || {
                let lot = lots_repo
                    .get(lot_id)
                    .map_err(ectx!(try convert => lot_id))?
                    .ok_or_else(|| not_found(ErrorContext::LotNotFound, format!("Lot {}", lot_id)))?;
                if orders_repo.exists_for_lot(lot_id).map_err(ectx!(try convert => lot_id))? {
                    return Err(has_orders("lot_id", lot.name));
                }

                let lot = lots_repo
                    .delete(lot_id)
                    .map_err(ectx!(try convert => lot_id))?
                    .ok_or_else(|| not_found(ErrorContext::LotNotFound, format!("Lot {}", lot_id)))?;
                info!("Lot {} deleted", lot_id);
                Ok(lot)
            })
        })
    }

    fn get_lot(&self, lot_id: LotId) -> ServiceFuture<Lot> {
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let lots_repo = repo_factory.create_lots_repo_with_sys_acl(&conn);
            lots_repo
                .get(lot_id)
                .map_err(ectx!(try convert => lot_id))?
                .ok_or_else(|| not_found(ErrorContext::LotNotFound, format!("Lot {}", lot_id)))
        })
    }

    fn get_lot_by_slug(&self, slug: String) -> ServiceFuture<Lot> {
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let lots_repo = repo_factory.create_lots_repo_with_sys_acl(&conn);
            let slug = &slug;
            lots_repo
                .get_by_slug(slug.clone())
                .map_err(ectx!(try convert => slug))?
                .ok_or_else(|| not_found(ErrorContext::LotNotFound, format!("Lot {}", slug)))
        })
    }

    fn search_lots(&self, term: Option<String>, skip: i64, count: i64) -> ServiceFuture<Vec<Lot>> {
        let repo_factory = self.static_context.repo_factory.clone();
        let search = LotsSearch {
            term: term.filter(|term| !term.trim().is_empty()),
            status: Some(LotStatus::Open),
        };

        self.spawn_on_pool(move |conn| {
            let lots_repo = repo_factory.create_lots_repo_with_sys_acl(&conn);
            lots_repo.list(search.clone(), skip, count).map_err(ectx!(convert => search, skip, count))
        })
    }

    fn lots_for_staff(&self) -> ServiceFuture<Vec<Lot>> {
        let user_id = match self.current_user_id() {
            Ok(user_id) => user_id,
            Err(e) => return ready(Err(e)),
        };
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let users_repo = repo_factory.create_users_repo_with_sys_acl(&conn);
            let lots_repo = repo_factory.create_lots_repo_with_sys_acl(&conn);
            let lot_staff_repo = repo_factory.create_lot_staff_repo_with_sys_acl(&conn);

            let user = users_repo
                .get(user_id)
                .map_err(ectx!(try convert => user_id))?
                .ok_or_else(|| not_found(ErrorContext::UserNotFound, format!("User {}", user_id)))?;

            if user.role == Role::Admin {
                return lots_repo
                    .list(LotsSearch::default(), 0, DASHBOARD_LIMIT)
                    .map_err(ectx!(convert => user_id));
            }

            let lot_ids: Vec<LotId> = lot_staff_repo
                .list_by_user(user_id)
                .map_err(ectx!(try convert => user_id))?
                .into_iter()
                .map(|staff| staff.lot_id)
                .collect();
            lots_repo.list_by_ids(lot_ids.clone()).map_err(ectx!(convert => lot_ids))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use futures::Future;

    use super::*;
    use repos::repo_factory::tests::*;
    use services::ErrorKind;

    fn payload(name: &str) -> NewLotPayload {
        NewLotPayload {
            name: name.to_string(),
            description: None,
            description_tag: None,
            location: "1 Arena Way".to_string(),
            latitude: Some(40.7),
            longitude: Some(-74.0),
            phone: "+15551234567".to_string(),
            space_count: 120,
            open_time: None,
            close_time: None,
            is_24_hours: true,
            amenities: vec!["EV charging".to_string()],
            images: vec![],
            status: None,
        }
    }

    #[test]
    fn test_create_lot_adds_supervisor() {
        let store = SharedStore::default();
        let owner = store.lock().unwrap().add_user(Role::Owner);
        let service = create_service(Some(owner.user_id), store.clone());

        let lot = service.create_lot(payload("Stadium North")).wait().unwrap();
        assert_eq!(lot.slug, "stadium-north");
        assert_eq!(lot.status, LotStatus::Open);

        let store = store.lock().unwrap();
        assert_eq!(store.lot_staff.len(), 1);
        assert_eq!(store.lot_staff[0].user_id, owner.user_id);
        assert_eq!(store.lot_staff[0].position, StaffPosition::Supervisor);
    }

    #[test]
    fn test_create_lot_suffixes_taken_slug() {
        let store = SharedStore::default();
        let owner = store.lock().unwrap().add_user(Role::Owner);
        store.lock().unwrap().add_lot("Stadium North", LotStatus::Open);
        let service = create_service(Some(owner.user_id), store);

        let lot = service.create_lot(payload("Stadium  North!")).wait().unwrap();
        assert_eq!(lot.slug, "stadium-north-2");
    }

    #[test]
    fn test_create_lot_rejects_bad_payload() {
        let store = SharedStore::default();
        let owner = store.lock().unwrap().add_user(Role::Owner);
        let service = create_service(Some(owner.user_id), store.clone());

        let mut invalid = payload("Stadium North");
        invalid.space_count = 0;
        let err = service.create_lot(invalid).wait().unwrap_err();
        match err.kind() {
            ErrorKind::Validation(errors) => assert!(errors.get("space_count").is_some()),
            other => panic!("unexpected kind {:?}", other),
        }
        assert!(store.lock().unwrap().lots.is_empty());
    }

    #[test]
    fn test_create_lot_needs_user() {
        let service = create_service(None, SharedStore::default());
        let err = service.create_lot(payload("Stadium North")).wait().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn test_search_lists_open_lots_only() {
        let store = SharedStore::default();
        {
            let mut store = store.lock().unwrap();
            store.add_lot("Airport Long Term", LotStatus::Open);
            store.add_lot("Airport Valet", LotStatus::Closed);
            store.add_lot("Downtown Garage", LotStatus::Open);
        }
        let service = create_service(None, store);

        let lots = service.search_lots(Some("airport".to_string()), 0, 10).wait().unwrap();
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].name, "Airport Long Term");

        let lots = service.search_lots(Some("  ".to_string()), 0, 10).wait().unwrap();
        assert_eq!(lots.len(), 2);
    }

    #[test]
    fn test_get_missing_lot() {
        let service = create_service(None, Arc::new(Mutex::new(MockStore::default())));
        let err = service.get_lot_by_slug("nowhere".to_string()).wait().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_dashboard_lots() {
        let store = SharedStore::default();
        let (admin, employee, north) = {
            let mut store = store.lock().unwrap();
            let admin = store.add_user(Role::Admin);
            let employee = store.add_user(Role::Supervisor);
            let north = store.add_lot("North", LotStatus::Open);
            store.add_lot("South", LotStatus::Closed);
            store.add_staff(north.lot_id, employee.user_id, StaffPosition::Employee);
            (admin, employee, north)
        };

        let lots = create_service(Some(admin.user_id), store.clone()).lots_for_staff().wait().unwrap();
        assert_eq!(lots.len(), 2);

        let lots = create_service(Some(employee.user_id), store).lots_for_staff().wait().unwrap();
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].lot_id, north.lot_id);
    }

    #[test]
    fn test_update_and_delete_lot() {
        let store = SharedStore::default();
        let (owner, lot) = {
            let mut store = store.lock().unwrap();
            (store.add_user(Role::Owner), store.add_lot("North", LotStatus::Open))
        };
        let service = create_service(Some(owner.user_id), store.clone());

        let update = UpdateLot {
            status: Some(LotStatus::Closed),
            ..Default::default()
        };
        let updated = service.update_lot(lot.lot_id, update).wait().unwrap();
        assert_eq!(updated.status, LotStatus::Closed);
        assert_eq!(updated.slug, lot.slug);

        service.delete_lot(lot.lot_id).wait().unwrap();
        let err = service.delete_lot(lot.lot_id).wait().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_delete_lot_removes_its_schedules() {
        let store = SharedStore::default();
        let (owner, lot) = {
            let mut store = store.lock().unwrap();
            let lot = store.add_lot("North", LotStatus::Open);
            let schedule = store.add_open_event(lot.lot_id);
            store.add_price_tier(schedule.schedule_id, 2, Amount::from_dollars(5));
            (store.add_user(Role::Owner), lot)
        };
        let service = create_service(Some(owner.user_id), store.clone());

        service.delete_lot(lot.lot_id).wait().unwrap();
        let store = store.lock().unwrap();
        assert!(store.schedules.is_empty());
        assert!(store.price_tiers.is_empty());
    }

    #[test]
    fn test_delete_lot_with_bookings() {
        let store = SharedStore::default();
        let (owner, lot) = {
            let mut store = store.lock().unwrap();
            let lot = store.add_lot("North", LotStatus::Open);
            store.add_order(lot.lot_id, "ABC123", PaymentStatus::Paid);
            (store.add_user(Role::Owner), lot)
        };
        let service = create_service(Some(owner.user_id), store.clone());

        let err = service.delete_lot(lot.lot_id).wait().unwrap_err();
        match err.kind() {
            ErrorKind::Validation(value) => assert_eq!(value["lot_id"][0]["code"], "has_orders"),
            kind => panic!("unexpected error kind {:?}", kind),
        }
        assert_eq!(store.lock().unwrap().lots.len(), 1);
    }
}
