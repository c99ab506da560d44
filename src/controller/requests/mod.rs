//! Query strings of the GET endpoints

use chrono::NaiveDateTime;

const DEFAULT_COUNT: i64 = 20;
const MAX_COUNT: i64 = 100;

/// `offset` and `count` of a listing, clamped to sane bounds
fn paging(offset: Option<i64>, count: Option<i64>) -> (i64, i64) {
    let offset = offset.unwrap_or(0).max(0);
    let count = count.unwrap_or(DEFAULT_COUNT).max(1).min(MAX_COUNT);
    (offset, count)
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LotsQuery {
    pub search: Option<String>,
    pub offset: Option<i64>,
    pub count: Option<i64>,
}

impl LotsQuery {
    pub fn paging(&self) -> (i64, i64) {
        paging(self.offset, self.count)
    }
}

/// Lot local time to resolve the bookable schedules at, now when missing
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AvailabilityQuery {
    pub at: Option<NaiveDateTime>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OrdersQuery {
    pub plate: Option<String>,
    pub offset: Option<i64>,
    pub count: Option<i64>,
}

impl OrdersQuery {
    pub fn paging(&self) -> (i64, i64) {
        paging(self.offset, self.count)
    }
}

#[cfg(test)]
mod tests {
    use http::request_util::parse_query;

    use super::*;

    #[test]
    fn test_paging_bounds() {
        assert_eq!(LotsQuery::default().paging(), (0, DEFAULT_COUNT));

        let query: OrdersQuery = parse_query(Some("plate=abc&offset=-5&count=1000")).unwrap();
        assert_eq!(query.plate, Some("abc".to_string()));
        assert_eq!(query.paging(), (0, MAX_COUNT));
    }

    #[test]
    fn test_availability_moment() {
        let query: AvailabilityQuery = parse_query(Some("at=2024-06-03T19:00:00")).unwrap();
        assert_eq!(query.at.map(|at| at.to_string()), Some("2024-06-03 19:00:00".to_string()));

        let query: AvailabilityQuery = parse_query(None).unwrap();
        assert!(query.at.is_none());
    }
}
