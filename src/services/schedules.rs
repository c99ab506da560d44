//! Schedules of a lot and the lookup of what can be booked at a given moment

use chrono::NaiveDateTime;
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

/// Lots are addressed by id in the dashboard and by slug on public pages
#[derive(Clone, Debug, PartialEq)]
pub enum LotRef {
    Id(LotId),
    Slug(String),
}

pub trait ScheduleService {
    fn create_schedule(&self, payload: NewSchedulePayload) -> ServiceFuture<Schedule>;
    fn update_schedule(&self, schedule_id: ScheduleId, payload: UpdateSchedule) -> ServiceFuture<Schedule>;
    /// Removes the schedule together with its price tiers
    fn delete_schedule(&self, schedule_id: ScheduleId) -> ServiceFuture<Schedule>;
    /// Every schedule of a lot with its price tiers
    fn lot_schedules(&self, lot_id: LotId) -> ServiceFuture<Vec<ScheduleWithTiers>>;
    /// Schedules bookable at `at`, the current lot time by default
    fn available_schedules(&self, lot: LotRef, at: Option<NaiveDateTime>) -> ServiceFuture<Availability>;
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > ScheduleService for Service<T, M, F>
{
    fn create_schedule(&self, payload: NewSchedulePayload) -> ServiceFuture<Schedule> {
        let user_id = self.dynamic_context.user_id;
        if let Err(errors) = payload.validate() {
            return ready(Err(validation_error(errors)));
        }
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let lots_repo = repo_factory.create_lots_repo_with_sys_acl(&conn);
            let schedules_repo = repo_factory.create_schedules_repo(&conn, user_id);

            let lot_id = payload.lot_id;
            lots_repo
                .get(lot_id)
                .map_err(ectx!(try convert => lot_id))?
                .ok_or_else(|| not_found(ErrorContext::LotNotFound, format!("Lot {}", lot_id)))?;

            let slug = unique_slug(&payload.name, "schedule", |slug| {
                schedules_repo.slug_exists(lot_id, slug.to_string()).map_err(ectx!(convert => lot_id, slug))
            })?;
            let new_schedule = NewSchedule::new(ScheduleId::generate(), slug, payload);
            let schedule = schedules_repo
                .create(new_schedule.clone())
                .map_err(ectx!(try convert => new_schedule))?;

            info!("Schedule {} created for lot {}", schedule.schedule_id, lot_id);
            Ok(schedule)
        })
    }

    fn update_schedule(&self, schedule_id: ScheduleId, payload: UpdateSchedule) -> ServiceFuture<Schedule> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let schedules_repo = repo_factory.create_schedules_repo(&conn, user_id);

            let current = schedules_repo
                .get(schedule_id)
                .map_err(ectx!(try convert => schedule_id))?
                .ok_or_else(|| not_found(ErrorContext::ScheduleNotFound, format!("Schedule {}", schedule_id)))?;

            let changeset = current.apply(payload);
            changeset.validate().map_err(validation_error)?;

            schedules_repo
                .update(schedule_id, changeset.clone())
                .map_err(ectx!(convert => schedule_id, changeset))
        })
    }

    fn delete_schedule(&self, schedule_id: ScheduleId) -> ServiceFuture<Schedule> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let schedules_repo = repo_factory.create_schedules_repo(&conn, user_id);
            let orders_repo = repo_factory.create_orders_repo_with_sys_acl(&conn);

            conn.transaction(move || {
                let schedule = schedules_repo
                    .get(schedule_id)
                    .map_err(ectx!(try convert => schedule_id))?
                    .ok_or_else(|| not_found(ErrorContext::ScheduleNotFound, format!("Schedule {}", schedule_id)))?;
                if orders_repo.exists_for_schedule(schedule_id).map_err(ectx!(try convert => schedule_id))? {
                    return Err(has_orders("schedule_id", schedule.name));
                }

                let schedule = schedules_repo
                    .delete(schedule_id)
                    .map_err(ectx!(try convert => schedule_id))?
                    .ok_or_else(|| not_found(ErrorContext::ScheduleNotFound, format!("Schedule {}", schedule_id)))?;
                info!("Schedule {} of lot {} deleted", schedule_id, schedule.lot_id);
                Ok(schedule)
            })
        })
    }

    fn lot_schedules(&self, lot_id: LotId) -> ServiceFuture<Vec<ScheduleWithTiers>> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let schedules_repo = repo_factory.create_schedules_repo(&conn, user_id);
            let price_tiers_repo = repo_factory.create_price_tiers_repo(&conn, user_id);

            let schedules = schedules_repo.list_by_lot(lot_id).map_err(ectx!(try convert => lot_id))?;
            let schedule_ids: Vec<ScheduleId> = schedules.iter().map(|schedule| schedule.schedule_id).collect();
            let tiers = price_tiers_repo
                .list_by_schedules(schedule_ids.clone())
                .map_err(ectx!(try convert => schedule_ids))?;

            Ok(with_tiers(schedules, tiers))
        })
    }

    fn available_schedules(&self, lot: LotRef, at: Option<NaiveDateTime>) -> ServiceFuture<Availability> {
        let repo_factory = self.static_context.repo_factory.clone();
        let at = at.unwrap_or_else(|| self.lot_now());

        self.spawn_on_pool(move |conn| {
            let lots_repo = repo_factory.create_lots_repo_with_sys_acl(&conn);
            let schedules_repo = repo_factory.create_schedules_repo_with_sys_acl(&conn);
            let price_tiers_repo = repo_factory.create_price_tiers_repo_with_sys_acl(&conn);

            let lot = match lot {
                LotRef::Id(lot_id) => lots_repo.get(lot_id).map_err(ectx!(try convert => lot_id))?,
                LotRef::Slug(ref slug) => lots_repo.get_by_slug(slug.clone()).map_err(ectx!(try convert => slug))?,
            }
            .ok_or_else(|| not_found(ErrorContext::LotNotFound, format!("Lot {:?}", lot)))?;

            if !lot.is_open() {
                debug!("Lot {} is closed, nothing is available", lot.lot_id);
                return Ok(Availability { at, schedules: vec![] });
            }

            let lot_id = lot.lot_id;
            let schedules = schedules_repo.list_by_lot(lot_id).map_err(ectx!(try convert => lot_id))?;
            let active_ids: Vec<ScheduleId> = schedules
                .iter()
                .filter(|schedule| schedule.is_active_at(at))
                .map(|schedule| schedule.schedule_id)
                .collect();
            let tiers = price_tiers_repo
                .list_by_schedules(active_ids.clone())
                .map_err(ectx!(try convert => active_ids))?;

            Ok(Availability {
                at,
                schedules: resolve_available(schedules, tiers, at),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveTime, Utc};
    use futures::Future;

    use super::*;
    use models::schedule::tests::{at, event, recurring};
    use repos::repo_factory::tests::*;
    use services::ErrorKind;

    fn new_schedule(lot_id: LotId, name: &str) -> NewSchedulePayload {
        NewSchedulePayload {
            lot_id,
            name: name.to_string(),
            description: None,
            is_event: false,
            days: vec![1, 2, 3, 4, 5],
            start_time: Some(NaiveTime::from_hms(7, 0, 0)),
            end_time: Some(NaiveTime::from_hms(19, 0, 0)),
            event_start: None,
            event_end: None,
        }
    }

    #[test]
    fn test_create_schedule_slug_is_per_lot() {
        let store = SharedStore::default();
        let (supervisor, lot) = {
            let mut store = store.lock().unwrap();
            (store.add_user(Role::Supervisor), store.add_lot("North", LotStatus::Open))
        };
        let service = create_service(Some(supervisor.user_id), store);

        let first = service.create_schedule(new_schedule(lot.lot_id, "Weekdays")).wait().unwrap();
        let second = service.create_schedule(new_schedule(lot.lot_id, "Weekdays")).wait().unwrap();
        assert_eq!(first.slug, "weekdays");
        assert_eq!(second.slug, "weekdays-2");
        assert_eq!(first.days, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_create_schedule_for_missing_lot() {
        let service = create_service(None, SharedStore::default());
        let err = service.create_schedule(new_schedule(LotId::generate(), "Weekdays")).wait().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_update_schedule_validates_merged_state() {
        let store = SharedStore::default();
        let schedule = {
            let mut store = store.lock().unwrap();
            let lot = store.add_lot("North", LotStatus::Open);
            store.add_schedule(lot.lot_id, recurring(vec![1], (8, 0), (12, 0)))
        };
        let service = create_service(None, store);

        let err = service
            .update_schedule(
                schedule.schedule_id,
                UpdateSchedule {
                    start_time: Some(NaiveTime::from_hms(13, 0, 0)),
                    ..Default::default()
                },
            )
            .wait()
            .unwrap_err();
        match err.kind() {
            ErrorKind::Validation(errors) => assert_eq!(errors["__all__"][0]["params"]["field"], "end_time"),
            other => panic!("unexpected kind {:?}", other),
        }

        let updated = service
            .update_schedule(
                schedule.schedule_id,
                UpdateSchedule {
                    days: Some(vec![6, 7]),
                    ..Default::default()
                },
            )
            .wait()
            .unwrap();
        assert_eq!(updated.days, vec![6, 7]);
        assert_eq!(updated.start_time, schedule.start_time);
    }

    #[test]
    fn test_delete_schedule_drops_tiers() {
        let store = SharedStore::default();
        let schedule = {
            let mut store = store.lock().unwrap();
            let lot = store.add_lot("North", LotStatus::Open);
            let schedule = store.add_open_event(lot.lot_id);
            store.add_price_tier(schedule.schedule_id, 2, Amount::from_dollars(5));
            schedule
        };
        let service = create_service(None, store.clone());

        service.delete_schedule(schedule.schedule_id).wait().unwrap();
        assert!(store.lock().unwrap().price_tiers.is_empty());
        let err = service.delete_schedule(schedule.schedule_id).wait().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_delete_schedule_with_bookings() {
        let store = SharedStore::default();
        let schedule = {
            let mut store = store.lock().unwrap();
            let lot = store.add_lot("North", LotStatus::Open);
            let schedule = store.add_open_event(lot.lot_id);
            store.add_price_tier(schedule.schedule_id, 2, Amount::from_dollars(5));
            let mut order = store.add_order(lot.lot_id, "ABC123", PaymentStatus::Paid);
            order.schedule_id = schedule.schedule_id;
            store.orders = vec![order];
            schedule
        };
        let service = create_service(None, store.clone());

        let err = service.delete_schedule(schedule.schedule_id).wait().unwrap_err();
        match err.kind() {
            ErrorKind::Validation(value) => assert_eq!(value["schedule_id"][0]["code"], "has_orders"),
            kind => panic!("unexpected error kind {:?}", kind),
        }
        let store = store.lock().unwrap();
        assert_eq!(store.schedules.len(), 1);
        assert_eq!(store.price_tiers.len(), 1);
    }

    #[test]
    fn test_available_at_given_moment() {
        let store = SharedStore::default();
        let (lot, weekdays, concert) = {
            let mut store = store.lock().unwrap();
            let lot = store.add_lot("Stadium", LotStatus::Open);
            let weekdays = store.add_schedule(lot.lot_id, recurring(vec![1, 2, 3, 4, 5], (6, 0), (22, 0)));
            let concert = store.add_schedule(lot.lot_id, event(at(2024, 6, 3, 18, 0), at(2024, 6, 3, 23, 0)));
            let weekend = store.add_schedule(lot.lot_id, recurring(vec![6, 7], (6, 0), (22, 0)));
            store.add_schedule(lot.lot_id, recurring(vec![1], (0, 0), (23, 59)));
            store.add_price_tier(weekdays.schedule_id, 8, Amount::from_dollars(20));
            store.add_price_tier(weekdays.schedule_id, 2, Amount::from_dollars(8));
            store.add_price_tier(concert.schedule_id, 5, Amount::from_dollars(40));
            store.add_price_tier(weekend.schedule_id, 5, Amount::from_dollars(10));
            (lot, weekdays, concert)
        };
        let service = create_service(None, store);

        // Monday evening: the concert and the weekday schedule
        let availability = service
            .available_schedules(LotRef::Slug(lot.slug.clone()), Some(at(2024, 6, 3, 19, 0)))
            .wait()
            .unwrap();
        let ids: Vec<ScheduleId> = availability.schedules.iter().map(|a| a.schedule.schedule_id).collect();
        assert_eq!(ids, vec![concert.schedule_id, weekdays.schedule_id]);
        let hours: Vec<i32> = availability.schedules[1].price_tiers.iter().map(|tier| tier.max_hours).collect();
        assert_eq!(hours, vec![2, 8]);

        // Monday night, only the untiered schedule is active
        let availability = service
            .available_schedules(LotRef::Id(lot.lot_id), Some(at(2024, 6, 3, 23, 30)))
            .wait()
            .unwrap();
        assert!(availability.schedules.is_empty());
    }

    #[test]
    fn test_available_defaults_to_now() {
        let store = SharedStore::default();
        let lot = {
            let mut store = store.lock().unwrap();
            let lot = store.add_lot("Stadium", LotStatus::Open);
            let schedule = store.add_open_event(lot.lot_id);
            store.add_price_tier(schedule.schedule_id, 3, Amount::from_dollars(12));
            lot
        };
        let service = create_service(None, store);

        let availability = service.available_schedules(LotRef::Id(lot.lot_id), None).wait().unwrap();
        assert_eq!(availability.schedules.len(), 1);
        let drift = availability.at - Utc::now().naive_utc();
        assert!(drift < Duration::days(1) && drift > Duration::days(-1));
    }

    #[test]
    fn test_closed_lot_has_nothing_available() {
        let store = SharedStore::default();
        let lot = {
            let mut store = store.lock().unwrap();
            let lot = store.add_lot("Stadium", LotStatus::Closed);
            let schedule = store.add_open_event(lot.lot_id);
            store.add_price_tier(schedule.schedule_id, 3, Amount::from_dollars(12));
            lot
        };
        let service = create_service(None, store);

        let availability = service.available_schedules(LotRef::Id(lot.lot_id), None).wait().unwrap();
        assert!(availability.schedules.is_empty());

        let err = service
            .available_schedules(LotRef::Slug("missing".to_string()), None)
            .wait()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_lot_schedules_include_untiered() {
        let store = SharedStore::default();
        let lot = {
            let mut store = store.lock().unwrap();
            let lot = store.add_lot("Stadium", LotStatus::Open);
            let event = store.add_open_event(lot.lot_id);
            store.add_price_tier(event.schedule_id, 3, Amount::from_dollars(12));
            store.add_schedule(lot.lot_id, recurring(vec![1], (8, 0), (9, 0)));
            lot
        };
        let service = create_service(None, store);

        let schedules = service.lot_schedules(lot.lot_id).wait().unwrap();
        assert_eq!(schedules.len(), 2);
        assert!(schedules[0].schedule.is_event);
        assert_eq!(schedules[0].price_tiers.len(), 1);
        assert!(schedules[1].price_tiers.is_empty());
    }
}
