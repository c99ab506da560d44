//! Resolution of the schedules and price tiers a customer can book at a given moment

use std::collections::HashMap;

use chrono::NaiveDateTime;

use models::{PriceTier, Schedule, ScheduleId};

/// A schedule active at the requested moment, with its current window and tiers
#[derive(Clone, Debug, Serialize)]
pub struct AvailableSchedule {
    pub schedule: Schedule,
    pub window_start: NaiveDateTime,
    pub window_end: NaiveDateTime,
    pub price_tiers: Vec<PriceTier>,
}

/// Operator view of a schedule
#[derive(Clone, Debug, Serialize)]
pub struct ScheduleWithTiers {
    pub schedule: Schedule,
    pub price_tiers: Vec<PriceTier>,
}

/// Result of an availability lookup for a lot
#[derive(Clone, Debug, Serialize)]
pub struct Availability {
    pub at: NaiveDateTime,
    pub schedules: Vec<AvailableSchedule>,
}

/// Groups tiers by schedule, each group sorted from the shortest to the longest stay
pub fn group_tiers(tiers: Vec<PriceTier>) -> HashMap<ScheduleId, Vec<PriceTier>> {
    let mut groups: HashMap<ScheduleId, Vec<PriceTier>> = HashMap::new();
    for tier in tiers {
        groups.entry(tier.schedule_id).or_insert_with(Vec::new).push(tier);
    }
    for group in groups.values_mut() {
        group.sort_by_key(|tier| (tier.max_hours, tier.price));
    }
    groups
}

/// Keeps the schedules active at `at` that have at least one price tier.
///
/// Events come before recurring schedules, then earlier windows first.
pub fn resolve_available(schedules: Vec<Schedule>, tiers: Vec<PriceTier>, at: NaiveDateTime) -> Vec<AvailableSchedule> {
    let mut tiers = group_tiers(tiers);
    let mut available: Vec<AvailableSchedule> = schedules
        .into_iter()
        .filter_map(|schedule| {
            let (window_start, window_end) = schedule.window_at(at)?;
            let price_tiers = tiers.remove(&schedule.schedule_id)?;
            Some(AvailableSchedule {
                schedule,
                window_start,
                window_end,
                price_tiers,
            })
        })
        .collect();
    available.sort_by(|a, b| {
        b.schedule
            .is_event
            .cmp(&a.schedule.is_event)
            .then(a.window_start.cmp(&b.window_start))
            .then(a.schedule.name.cmp(&b.schedule.name))
    });
    available
}

/// Attaches tiers to every schedule regardless of time, keeping the schedule order
pub fn with_tiers(schedules: Vec<Schedule>, tiers: Vec<PriceTier>) -> Vec<ScheduleWithTiers> {
    let mut tiers = group_tiers(tiers);
    schedules
        .into_iter()
        .map(|schedule| {
            let price_tiers = tiers.remove(&schedule.schedule_id).unwrap_or_default();
            ScheduleWithTiers { schedule, price_tiers }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::schedule::tests::{at, event, recurring};
    use models::{Amount, PriceTierId};

    fn tier(schedule: &Schedule, max_hours: i32, dollars: u32) -> PriceTier {
        PriceTier {
            price_id: PriceTierId::generate(),
            schedule_id: schedule.schedule_id,
            max_hours,
            price: Amount::from_dollars(dollars),
            created_at: at(2024, 1, 1, 0, 0),
        }
    }

    #[test]
    fn test_only_active_schedules_with_tiers() {
        let mornings = recurring(vec![1, 2, 3, 4, 5], (6, 0), (12, 0));
        let weekend = recurring(vec![6, 7], (0, 0), (23, 59));
        let no_tiers = recurring(vec![1], (0, 0), (23, 59));
        let tiers = vec![tier(&mornings, 4, 10), tier(&weekend, 2, 5)];

        let available = resolve_available(vec![mornings.clone(), weekend, no_tiers], tiers, at(2024, 6, 3, 9, 0));
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].schedule.schedule_id, mornings.schedule_id);
        assert_eq!(available[0].window_start, at(2024, 6, 3, 6, 0));
        assert_eq!(available[0].window_end, at(2024, 6, 3, 12, 0));
    }

    #[test]
    fn test_tiers_sorted_by_duration() {
        let schedule = recurring(vec![1], (0, 0), (23, 0));
        let tiers = vec![tier(&schedule, 24, 30), tier(&schedule, 2, 5), tier(&schedule, 8, 15)];

        let available = resolve_available(vec![schedule], tiers, at(2024, 6, 3, 9, 0));
        let hours: Vec<i32> = available[0].price_tiers.iter().map(|tier| tier.max_hours).collect();
        assert_eq!(hours, vec![2, 8, 24]);
    }

    #[test]
    fn test_events_first_then_window_start() {
        let daily = recurring(vec![6], (8, 0), (23, 0));
        let late = recurring(vec![6], (18, 0), (23, 0));
        let concert = event(at(2024, 6, 8, 19, 0), at(2024, 6, 8, 23, 30));
        let tiers = vec![tier(&daily, 2, 5), tier(&late, 2, 6), tier(&concert, 5, 25)];

        let available = resolve_available(vec![late.clone(), daily.clone(), concert.clone()], tiers, at(2024, 6, 8, 20, 0));
        let ids: Vec<ScheduleId> = available.iter().map(|a| a.schedule.schedule_id).collect();
        assert_eq!(ids, vec![concert.schedule_id, daily.schedule_id, late.schedule_id]);
    }

    #[test]
    fn test_nothing_available() {
        let schedule = recurring(vec![1], (8, 0), (9, 0));
        let tiers = vec![tier(&schedule, 1, 2)];
        assert!(resolve_available(vec![schedule], tiers, at(2024, 6, 3, 9, 0)).is_empty());
    }

    #[test]
    fn test_with_tiers_keeps_empty_schedules() {
        let first = recurring(vec![1], (8, 0), (9, 0));
        let second = recurring(vec![2], (8, 0), (9, 0));
        let tiers = vec![tier(&second, 1, 2)];
        let listed = with_tiers(vec![first, second], tiers);
        assert!(listed[0].price_tiers.is_empty());
        assert_eq!(listed[1].price_tiers.len(), 1);
    }
}
