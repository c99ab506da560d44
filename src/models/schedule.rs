//! Booking windows of a lot.
//!
//! A schedule is either recurring (a set of ISO weekdays, Monday = 1 and
//! Sunday = 7, plus a daily time range) or a one-off event with fixed start
//! and end timestamps. All times are in the lot's local time. Windows are
//! half-open: a schedule is active at its start and inactive at its end.

use chrono::{Datelike, NaiveDateTime, NaiveTime};
use diesel::sql_types::Uuid as SqlUuid;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use models::validation::not_blank;
use models::LotId;
use schema::schedules;

pub const MONDAY: i16 = 1;
pub const SUNDAY: i16 = 7;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, From, FromStr, Serialize, Deserialize, FromSqlRow, AsExpression)]
#[sql_type = "SqlUuid"]
pub struct ScheduleId(Uuid);
derive_newtype_sql!(schedule_id_sql, SqlUuid, ScheduleId, ScheduleId);

impl ScheduleId {
    pub fn new(id: Uuid) -> Self {
        ScheduleId(id)
    }

    pub fn inner(&self) -> &Uuid {
        &self.0
    }

    pub fn generate() -> Self {
        ScheduleId(Uuid::new_v4())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Queryable)]
pub struct Schedule {
    pub schedule_id: ScheduleId,
    pub lot_id: LotId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_event: bool,
    pub days: Vec<i16>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub event_start: Option<NaiveDateTime>,
    pub event_end: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl Schedule {
    /// The concrete window containing `at`, if the schedule is active then.
    /// For recurring schedules that is the day's time range.
    pub fn window_at(&self, at: NaiveDateTime) -> Option<(NaiveDateTime, NaiveDateTime)> {
        if self.is_event {
            match (self.event_start, self.event_end) {
                (Some(start), Some(end)) if start <= at && at < end => Some((start, end)),
                _ => None,
            }
        } else {
            let weekday = at.weekday().number_from_monday() as i16;
            if !self.days.contains(&weekday) {
                return None;
            }
            match (self.start_time, self.end_time) {
                (Some(start), Some(end)) if start <= at.time() && at.time() < end => {
                    let date = at.date();
                    Some((date.and_time(start), date.and_time(end)))
                }
                _ => None,
            }
        }
    }

    pub fn is_active_at(&self, at: NaiveDateTime) -> bool {
        self.window_at(at).is_some()
    }

    /// Merges an update into the current state. The result still has to be validated.
    pub fn apply(&self, update: UpdateSchedule) -> ScheduleChangeset {
        let timing = Timing {
            is_event: update.is_event.unwrap_or(self.is_event),
            days: update.days.unwrap_or_else(|| self.days.clone()),
            start_time: update.start_time.or(self.start_time),
            end_time: update.end_time.or(self.end_time),
            event_start: update.event_start.or(self.event_start),
            event_end: update.event_end.or(self.event_end),
        }
        .normalized();

        ScheduleChangeset {
            name: update.name.map(|name| name.trim().to_string()).unwrap_or_else(|| self.name.clone()),
            description: update.description.or_else(|| self.description.clone()),
            is_event: timing.is_event,
            days: timing.days,
            start_time: timing.start_time,
            end_time: timing.end_time,
            event_start: timing.event_start,
            event_end: timing.event_end,
        }
    }
}

/// Timing columns of a schedule, shared by creation and update
#[derive(Clone, Debug, PartialEq)]
struct Timing {
    is_event: bool,
    days: Vec<i16>,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    event_start: Option<NaiveDateTime>,
    event_end: Option<NaiveDateTime>,
}

impl Timing {
    /// Drops the fields that do not belong to the schedule kind and sorts the days
    fn normalized(self) -> Self {
        if self.is_event {
            Timing {
                days: vec![],
                start_time: None,
                end_time: None,
                ..self
            }
        } else {
            let mut days = self.days;
            days.sort();
            days.dedup();
            Timing {
                days,
                event_start: None,
                event_end: None,
                ..self
            }
        }
    }

    fn check(&self) -> Result<(), ValidationError> {
        if self.is_event {
            match (self.event_start, self.event_end) {
                (Some(start), Some(end)) if start < end => Ok(()),
                (Some(_), Some(_)) => Err(timing_error("event_end", "range", "event_end must be after event_start")),
                _ => Err(timing_error(
                    "event_start",
                    "required",
                    "events need both event_start and event_end",
                )),
            }
        } else if self.days.is_empty() {
            Err(timing_error("days", "required", "recurring schedules need at least one day"))
        } else if self.days.iter().any(|day| *day < MONDAY || *day > SUNDAY) {
            Err(timing_error("days", "range", "days must be between 1 (Monday) and 7 (Sunday)"))
        } else {
            match (self.start_time, self.end_time) {
                (Some(start), Some(end)) if start < end => Ok(()),
                (Some(_), Some(_)) => Err(timing_error("end_time", "range", "end_time must be after start_time")),
                _ => Err(timing_error(
                    "start_time",
                    "required",
                    "recurring schedules need both start_time and end_time",
                )),
            }
        }
    }
}

/// Schedule shape errors are reported for the whole payload, `field` names the offending input
fn timing_error(field: &'static str, code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error.add_param("field".into(), &field);
    error
}

fn validate_new_timing(payload: &NewSchedulePayload) -> Result<(), ValidationError> {
    payload.timing().check()
}

fn validate_changed_timing(changeset: &ScheduleChangeset) -> Result<(), ValidationError> {
    Timing {
        is_event: changeset.is_event,
        days: changeset.days.clone(),
        start_time: changeset.start_time,
        end_time: changeset.end_time,
        event_start: changeset.event_start,
        event_end: changeset.event_end,
    }
    .check()
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_new_timing"))]
pub struct NewSchedulePayload {
    pub lot_id: LotId,
    #[validate(length(min = "1", max = "100"), custom = "not_blank")]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_event: bool,
    #[serde(default)]
    pub days: Vec<i16>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub event_start: Option<NaiveDateTime>,
    pub event_end: Option<NaiveDateTime>,
}

impl NewSchedulePayload {
    fn timing(&self) -> Timing {
        Timing {
            is_event: self.is_event,
            days: self.days.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            event_start: self.event_start,
            event_end: self.event_end,
        }
        .normalized()
    }
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "schedules"]
pub struct NewSchedule {
    pub schedule_id: ScheduleId,
    pub lot_id: LotId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_event: bool,
    pub days: Vec<i16>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub event_start: Option<NaiveDateTime>,
    pub event_end: Option<NaiveDateTime>,
}

impl NewSchedule {
    pub fn new(schedule_id: ScheduleId, slug: String, payload: NewSchedulePayload) -> Self {
        let timing = payload.timing();
        NewSchedule {
            schedule_id,
            lot_id: payload.lot_id,
            name: payload.name.trim().to_string(),
            slug,
            description: payload.description,
            is_event: timing.is_event,
            days: timing.days,
            start_time: timing.start_time,
            end_time: timing.end_time,
            event_start: timing.event_start,
            event_end: timing.event_end,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdateSchedule {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_event: Option<bool>,
    pub days: Option<Vec<i16>>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub event_start: Option<NaiveDateTime>,
    pub event_end: Option<NaiveDateTime>,
}

/// Full replacement of the editable columns, produced by `Schedule::apply`
#[derive(Clone, Debug, PartialEq, AsChangeset, Validate)]
#[table_name = "schedules"]
#[changeset_options(treat_none_as_null = "true")]
#[validate(schema(function = "validate_changed_timing"))]
pub struct ScheduleChangeset {
    #[validate(length(min = "1", max = "100"), custom = "not_blank")]
    pub name: String,
    pub description: Option<String>,
    pub is_event: bool,
    pub days: Vec<i16>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub event_start: Option<NaiveDateTime>,
    pub event_end: Option<NaiveDateTime>,
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json;

    pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd(y, m, d).and_hms(h, min, 0)
    }

    pub fn recurring(days: Vec<i16>, start: (u32, u32), end: (u32, u32)) -> Schedule {
        Schedule {
            schedule_id: ScheduleId::generate(),
            lot_id: LotId::generate(),
            name: "Weekday mornings".to_string(),
            slug: "weekday-mornings".to_string(),
            description: None,
            is_event: false,
            days,
            start_time: Some(NaiveTime::from_hms(start.0, start.1, 0)),
            end_time: Some(NaiveTime::from_hms(end.0, end.1, 0)),
            event_start: None,
            event_end: None,
            created_at: at(2024, 1, 1, 0, 0),
        }
    }

    pub fn event(start: NaiveDateTime, end: NaiveDateTime) -> Schedule {
        Schedule {
            schedule_id: ScheduleId::generate(),
            lot_id: LotId::generate(),
            name: "Stadium concert".to_string(),
            slug: "stadium-concert".to_string(),
            description: None,
            is_event: true,
            days: vec![],
            start_time: None,
            end_time: None,
            event_start: Some(start),
            event_end: Some(end),
            created_at: at(2024, 1, 1, 0, 0),
        }
    }

    // 2024-06-03 is a Monday, 2024-06-09 a Sunday
    #[test]
    fn test_recurring_matches_day_and_time() {
        let schedule = recurring(vec![1, 2, 3, 4, 5], (8, 0), (12, 0));
        assert!(schedule.is_active_at(at(2024, 6, 3, 8, 0)));
        assert!(schedule.is_active_at(at(2024, 6, 7, 11, 59)));
        assert!(!schedule.is_active_at(at(2024, 6, 3, 12, 0)));
        assert!(!schedule.is_active_at(at(2024, 6, 3, 7, 59)));
        assert!(!schedule.is_active_at(at(2024, 6, 8, 9, 0)));
    }

    #[test]
    fn test_sunday_is_seven() {
        let schedule = recurring(vec![SUNDAY], (0, 0), (23, 59));
        assert!(schedule.is_active_at(at(2024, 6, 9, 10, 0)));
        assert!(!schedule.is_active_at(at(2024, 6, 3, 10, 0)));
    }

    #[test]
    fn test_recurring_window() {
        let schedule = recurring(vec![1], (8, 0), (12, 0));
        assert_eq!(
            schedule.window_at(at(2024, 6, 3, 9, 30)),
            Some((at(2024, 6, 3, 8, 0), at(2024, 6, 3, 12, 0)))
        );
    }

    #[test]
    fn test_event_window_is_half_open() {
        let schedule = event(at(2024, 6, 8, 18, 0), at(2024, 6, 9, 1, 0));
        assert!(schedule.is_active_at(at(2024, 6, 8, 18, 0)));
        assert!(schedule.is_active_at(at(2024, 6, 9, 0, 30)));
        assert!(!schedule.is_active_at(at(2024, 6, 9, 1, 0)));
        assert!(!schedule.is_active_at(at(2024, 6, 8, 17, 59)));
        assert_eq!(
            schedule.window_at(at(2024, 6, 8, 20, 0)),
            Some((at(2024, 6, 8, 18, 0), at(2024, 6, 9, 1, 0)))
        );
    }

    #[test]
    fn test_event_ignores_days() {
        let mut schedule = event(at(2024, 6, 8, 18, 0), at(2024, 6, 8, 23, 0));
        schedule.days = vec![1];
        assert!(schedule.is_active_at(at(2024, 6, 8, 19, 0)));
    }

    fn payload() -> NewSchedulePayload {
        NewSchedulePayload {
            lot_id: LotId::generate(),
            name: "Evenings".to_string(),
            description: None,
            is_event: false,
            days: vec![5, 1, 5, 3],
            start_time: Some(NaiveTime::from_hms(17, 0, 0)),
            end_time: Some(NaiveTime::from_hms(23, 0, 0)),
            event_start: Some(at(2024, 6, 8, 18, 0)),
            event_end: None,
        }
    }

    #[test]
    fn test_new_recurring_is_normalized() {
        let payload = payload();
        assert!(payload.validate().is_ok());
        let schedule = NewSchedule::new(ScheduleId::generate(), "evenings".to_string(), payload);
        assert_eq!(schedule.days, vec![1, 3, 5]);
        assert_eq!(schedule.event_start, None);
    }

    #[test]
    fn test_new_event_is_normalized() {
        let mut payload = payload();
        payload.is_event = true;
        payload.event_end = Some(at(2024, 6, 8, 23, 0));
        assert!(payload.validate().is_ok());
        let schedule = NewSchedule::new(ScheduleId::generate(), "evenings".to_string(), payload);
        assert!(schedule.days.is_empty());
        assert_eq!(schedule.start_time, None);
        assert_eq!(schedule.end_time, None);
    }

    fn timing_failure(payload: &NewSchedulePayload) -> (String, String) {
        let errors = serde_json::to_value(payload.validate().unwrap_err()).unwrap();
        let error = &errors["__all__"][0];
        (
            error["params"]["field"].as_str().unwrap().to_string(),
            error["code"].as_str().unwrap().to_string(),
        )
    }

    #[test]
    fn test_invalid_timing() {
        let mut payload = payload();
        payload.days = vec![0, 8];
        assert_eq!(timing_failure(&payload), ("days".to_string(), "range".to_string()));

        let mut payload = self::payload();
        payload.end_time = Some(NaiveTime::from_hms(16, 0, 0));
        assert_eq!(timing_failure(&payload), ("end_time".to_string(), "range".to_string()));

        let mut payload = self::payload();
        payload.days = vec![];
        assert_eq!(timing_failure(&payload), ("days".to_string(), "required".to_string()));

        let mut payload = self::payload();
        payload.is_event = true;
        assert_eq!(timing_failure(&payload), ("event_start".to_string(), "required".to_string()));

        let mut payload = self::payload();
        payload.is_event = true;
        payload.event_end = Some(at(2024, 6, 8, 18, 0));
        assert_eq!(timing_failure(&payload), ("event_end".to_string(), "range".to_string()));
    }

    #[test]
    fn test_blank_name_skips_timing() {
        let mut payload = payload();
        payload.name = "   ".to_string();
        payload.days = vec![];
        let errors = serde_json::to_value(payload.validate().unwrap_err()).unwrap();
        assert_eq!(errors["name"][0]["code"], "blank");
        assert!(errors.get("__all__").is_none());
    }

    #[test]
    fn test_apply_switches_to_event() {
        let schedule = recurring(vec![1, 2], (8, 0), (12, 0));
        let changeset = schedule.apply(UpdateSchedule {
            is_event: Some(true),
            event_start: Some(at(2024, 7, 4, 18, 0)),
            event_end: Some(at(2024, 7, 4, 23, 0)),
            ..Default::default()
        });
        assert!(changeset.validate().is_ok());
        assert!(changeset.is_event);
        assert!(changeset.days.is_empty());
        assert_eq!(changeset.start_time, None);
        assert_eq!(changeset.name, schedule.name);
    }

    #[test]
    fn test_apply_keeps_invalid_range_detectable() {
        let schedule = recurring(vec![1], (8, 0), (12, 0));
        let changeset = schedule.apply(UpdateSchedule {
            end_time: Some(NaiveTime::from_hms(7, 0, 0)),
            ..Default::default()
        });
        assert!(changeset.validate().is_err());
    }
}
