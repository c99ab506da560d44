//! Price tiers of a schedule

use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::Fail;
use r2d2::ManageConnection;
use validator::Validate;

use super::types::ServiceFuture;
use super::{not_found, ready, ErrorContext, ErrorKind, Service};
use models::*;
use repos::repo_factory::ReposFactory;
use services::error::validation_error;

pub trait PriceTierService {
    fn create_price_tier(&self, payload: NewPriceTierPayload) -> ServiceFuture<PriceTier>;
    fn update_price_tier(&self, price_id: PriceTierId, payload: UpdatePriceTier) -> ServiceFuture<PriceTier>;
    fn delete_price_tier(&self, price_id: PriceTierId) -> ServiceFuture<PriceTier>;
    /// Tiers of a schedule, shortest stay first
    fn schedule_price_tiers(&self, schedule_id: ScheduleId) -> ServiceFuture<Vec<PriceTier>>;
    fn get_price_tier(&self, price_id: PriceTierId) -> ServiceFuture<PriceTier>;
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > PriceTierService for Service<T, M, F>
{
    fn create_price_tier(&self, payload: NewPriceTierPayload) -> ServiceFuture<PriceTier> {
        let user_id = self.dynamic_context.user_id;
        if let Err(errors) = payload.validate() {
            return ready(Err(validation_error(errors)));
        }
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let schedules_repo = repo_factory.create_schedules_repo_with_sys_acl(&conn);
            let price_tiers_repo = repo_factory.create_price_tiers_repo(&conn, user_id);

            let schedule_id = payload.schedule_id;
            schedules_repo
                .get(schedule_id)
                .map_err(ectx!(try convert => schedule_id))?
                .ok_or_else(|| not_found(ErrorContext::ScheduleNotFound, format!("Schedule {}", schedule_id)))?;

            let new_tier = NewPriceTier::from(payload);
            let tier = price_tiers_repo.create(new_tier.clone()).map_err(ectx!(try convert => new_tier))?;
            info!("Price tier {} of {} hours for {} added to schedule {}", tier.price_id, tier.max_hours, tier.price, schedule_id);
            Ok(tier)
        })
    }

    fn update_price_tier(&self, price_id: PriceTierId, payload: UpdatePriceTier) -> ServiceFuture<PriceTier> {
        let user_id = self.dynamic_context.user_id;
        if let Err(errors) = payload.validate() {
            return ready(Err(validation_error(errors)));
        }
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let price_tiers_repo = repo_factory.create_price_tiers_repo(&conn, user_id);

            let current = price_tiers_repo
                .get(price_id)
                .map_err(ectx!(try convert => price_id))?
                .ok_or_else(|| not_found(ErrorContext::PriceTierNotFound, format!("Price tier {}", price_id)))?;
            if payload.is_empty() {
                return Ok(current);
            }

            price_tiers_repo
                .update(price_id, payload.clone())
                .map_err(ectx!(convert => price_id, payload))
        })
    }

    fn delete_price_tier(&self, price_id: PriceTierId) -> ServiceFuture<PriceTier> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let price_tiers_repo = repo_factory.create_price_tiers_repo(&conn, user_id);
            price_tiers_repo
                .delete(price_id)
                .map_err(ectx!(try convert => price_id))?
                .ok_or_else(|| not_found(ErrorContext::PriceTierNotFound, format!("Price tier {}", price_id)))
        })
    }

    fn schedule_price_tiers(&self, schedule_id: ScheduleId) -> ServiceFuture<Vec<PriceTier>> {
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let schedules_repo = repo_factory.create_schedules_repo_with_sys_acl(&conn);
            let price_tiers_repo = repo_factory.create_price_tiers_repo_with_sys_acl(&conn);

            schedules_repo
                .get(schedule_id)
                .map_err(ectx!(try convert => schedule_id))?
                .ok_or_else(|| not_found(ErrorContext::ScheduleNotFound, format!("Schedule {}", schedule_id)))?;
            price_tiers_repo
                .list_by_schedule(schedule_id)
                .map_err(ectx!(convert => schedule_id))
        })
    }

    fn get_price_tier(&self, price_id: PriceTierId) -> ServiceFuture<PriceTier> {
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let price_tiers_repo = repo_factory.create_price_tiers_repo_with_sys_acl(&conn);
            price_tiers_repo
                .get(price_id)
                .map_err(ectx!(try convert => price_id))?
                .ok_or_else(|| not_found(ErrorContext::PriceTierNotFound, format!("Price tier {}", price_id)))
        })
    }
}
