use crate::domain::{DayType, Observation, Query, Season, Weather};
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

/// Monday 2024-03-04 09:00 UTC.
pub const NOW: OffsetDateTime = datetime!(2024-03-04 09:00 UTC);

pub fn query(hour: u8) -> Query {
    Query::new("High Level Road", hour, DayType::Weekday, Weather::Clear, Season::Regular)
        .expect("valid query")
}

/// Weekday/clear/regular observation `days_ago` days before [`NOW`] at `hour`.
pub fn observation(days_ago: i64, hour: u8, minutes: f64) -> Observation {
    let day = NOW - Duration::days(days_ago);
    let timestamp = day
        .replace_hour(hour)
        .expect("valid hour")
        .replace_minute(0)
        .expect("valid minute");
    Observation::new(
        "High Level Road",
        timestamp,
        minutes,
        12.5,
        DayType::Weekday,
        Weather::Clear,
        Season::Regular,
    )
}

/// `count` observations of `minutes` each, one per day, all at `hour`.
pub fn constant_series(count: usize, hour: u8, minutes: f64) -> Vec<Observation> {
    (0..count)
        .map(|index| observation(index as i64 + 1, hour, minutes))
        .collect()
}
