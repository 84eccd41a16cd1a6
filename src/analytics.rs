//! Per-route statistics and hourly traffic patterns.

use crate::domain::{DayType, Observation, RouteId};
use crate::estimation::adjustment::HourWindow;
use crate::estimation::model::mean;
use serde::Serialize;
use std::collections::BTreeMap;

const RUSH_WINDOWS: [HourWindow; 2] = [HourWindow(7, 9), HourWindow(17, 19)];
const DEFAULT_PEAK_HOURS: [u8; 2] = [8, 18];
const DEFAULT_OFF_PEAK_HOURS: [u8; 3] = [10, 14, 22];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
    High,
    Medium,
    Low,
}

/// Summary statistics over one route's recent records.
///
/// Conditional averages are `None` when no record falls into the group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteAnalytics {
    pub route_id: RouteId,
    pub average_minutes: f64,
    pub min_minutes: f64,
    pub max_minutes: f64,
    pub peak_average: Option<f64>,
    pub off_peak_average: Option<f64>,
    pub weekend_average: Option<f64>,
    pub rainy_average: Option<f64>,
    pub total_records: usize,
}

impl RouteAnalytics {
    /// `None` when there is no usable record.
    pub fn from_observations(route_id: impl Into<RouteId>, observations: &[Observation]) -> Option<Self> {
        let usable: Vec<&Observation> = observations.iter().filter(|o| o.is_usable()).collect();
        let average_minutes = mean(usable.iter().map(|o| o.travel_time_minutes)).ok()?;

        let group_mean = |keep: &dyn Fn(&Observation) -> bool| {
            mean(
                usable
                    .iter()
                    .filter(|o| keep(o))
                    .map(|o| o.travel_time_minutes),
            )
            .ok()
        };
        let is_rush = |o: &Observation| RUSH_WINDOWS.iter().any(|w| w.contains(o.hour));

        Some(Self {
            route_id: route_id.into(),
            average_minutes,
            min_minutes: usable.iter().map(|o| o.travel_time_minutes).fold(f64::INFINITY, f64::min),
            max_minutes: usable
                .iter()
                .map(|o| o.travel_time_minutes)
                .fold(f64::NEG_INFINITY, f64::max),
            peak_average: group_mean(&is_rush),
            off_peak_average: group_mean(&|o| !is_rush(o)),
            weekend_average: group_mean(&|o| o.day_type == DayType::Weekend),
            rainy_average: group_mean(&|o| o.weather.is_wet()),
            total_records: usable.len(),
        })
    }

    /// Spread between fastest and slowest trip as a percentage of the average.
    pub fn variability(&self) -> Option<f64> {
        (self.average_minutes > 0.0)
            .then(|| (self.max_minutes - self.min_minutes) / self.average_minutes * 100.0)
    }

    pub fn reliability(&self) -> Option<Reliability> {
        self.variability().map(|variability| {
            if variability < 20.0 {
                Reliability::High
            } else if variability < 40.0 {
                Reliability::Medium
            } else {
                Reliability::Low
            }
        })
    }
}

/// Mean travel time per hour of day, for hours that have records.
pub fn hourly_profile(observations: &[Observation]) -> BTreeMap<u8, f64> {
    let mut buckets: BTreeMap<u8, Vec<f64>> = BTreeMap::new();
    for observation in observations.iter().filter(|o| o.is_usable()) {
        buckets
            .entry(observation.hour)
            .or_default()
            .push(observation.travel_time_minutes);
    }
    buckets
        .into_iter()
        .filter_map(|(hour, times)| mean(times).ok().map(|m| (hour, m)))
        .collect()
}

fn profile_mean(profile: &BTreeMap<u8, f64>) -> Option<f64> {
    mean(profile.values().copied()).ok()
}

/// Hours noticeably slower than the profile average.
pub fn peak_hours(profile: &BTreeMap<u8, f64>) -> Vec<u8> {
    match profile_mean(profile) {
        Some(average) => profile
            .iter()
            .filter(|(_, minutes)| **minutes > average * 1.2)
            .map(|(hour, _)| *hour)
            .collect(),
        None => DEFAULT_PEAK_HOURS.to_vec(),
    }
}

/// Hours noticeably faster than the profile average.
pub fn off_peak_hours(profile: &BTreeMap<u8, f64>) -> Vec<u8> {
    match profile_mean(profile) {
        Some(average) => profile
            .iter()
            .filter(|(_, minutes)| **minutes < average * 0.8)
            .map(|(hour, _)| *hour)
            .collect(),
        None => DEFAULT_OFF_PEAK_HOURS.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Weather;
    use crate::estimation::fixtures::observation;

    #[test]
    fn analytics_split_by_condition() {
        let mut weekend = observation(2, 12, 20.0);
        weekend.day_type = DayType::Weekend;
        let mut rainy = observation(3, 18, 50.0);
        rainy.weather = Weather::Rainy;
        let observations = vec![observation(1, 8, 40.0), weekend, rainy, observation(4, 22, 10.0)];

        let analytics = RouteAnalytics::from_observations("High Level Road", &observations).expect("analytics");

        assert_eq!(analytics.total_records, 4);
        assert!((analytics.average_minutes - 30.0).abs() < 1e-12);
        assert_eq!(analytics.min_minutes, 10.0);
        assert_eq!(analytics.max_minutes, 50.0);
        assert_eq!(analytics.peak_average, Some(45.0));
        assert_eq!(analytics.off_peak_average, Some(15.0));
        assert_eq!(analytics.weekend_average, Some(20.0));
        assert_eq!(analytics.rainy_average, Some(50.0));
        let variability = analytics.variability().expect("variability");
        assert!((variability - 40.0 / 30.0 * 100.0).abs() < 1e-9);
        assert_eq!(analytics.reliability(), Some(Reliability::Low));
    }

    #[test]
    fn no_records_means_no_analytics() {
        assert_eq!(RouteAnalytics::from_observations("High Level Road", &[]), None);
    }

    #[test]
    fn peak_and_off_peak_hours_from_profile() {
        let observations = vec![
            observation(1, 8, 60.0),
            observation(1, 12, 30.0),
            observation(1, 15, 30.0),
            observation(1, 22, 20.0),
        ];

        let profile = hourly_profile(&observations);

        // average of hourly means is 35.
        assert_eq!(peak_hours(&profile), vec![8]);
        assert_eq!(off_peak_hours(&profile), vec![22]);
    }

    #[test]
    fn empty_profile_uses_default_hours() {
        let profile = BTreeMap::new();

        assert_eq!(peak_hours(&profile), vec![8, 18]);
        assert_eq!(off_peak_hours(&profile), vec![10, 14, 22]);
    }
}
