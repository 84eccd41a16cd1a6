//! Condition-adjustment multiplier chain and route base times.
//!
//! Every raw minute value leaving the fallback paths goes through
//! [`ConditionSettings::apply`], which multiplies in time-of-day, day-type,
//! weather and season factors and records a human-readable reason for each.

use crate::domain::{DayType, Query, RouteMeta, Season, Weather};
use serde::Deserialize;
use std::collections::HashMap;

/// Base time used when a route has neither metadata nor a default entry.
pub const FALLBACK_BASE_MINUTES: f64 = 30.0;

/// Inclusive hour range, written as `[start, end]` in config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HourWindow(pub u8, pub u8);

impl HourWindow {
    pub fn contains(&self, hour: u8) -> bool {
        self.0 <= hour && hour <= self.1
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WeatherMultipliers {
    pub clear: f64,
    pub cloudy: f64,
    pub rainy: f64,
    pub heavy_rain: f64,
}

impl Default for WeatherMultipliers {
    fn default() -> Self {
        Self {
            clear: 1.0,
            cloudy: 1.1,
            rainy: 1.3,
            heavy_rain: 1.5,
        }
    }
}

impl WeatherMultipliers {
    pub fn for_weather(&self, weather: Weather) -> f64 {
        match weather {
            Weather::Clear => self.clear,
            Weather::Cloudy => self.cloudy,
            Weather::Rainy => self.rainy,
            Weather::HeavyRain => self.heavy_rain,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConditionSettings {
    pub peak_windows: Vec<HourWindow>,
    pub daytime_window: HourWindow,
    pub peak_multiplier: f64,
    pub daytime_multiplier: f64,
    pub off_peak_multiplier: f64,
    pub weekend_multiplier: f64,
    pub rainy_day_multiplier: f64,
    pub weather_multipliers: WeatherMultipliers,
    pub school_holiday_multiplier: f64,
    pub public_holiday_multiplier: f64,
}

impl Default for ConditionSettings {
    fn default() -> Self {
        Self {
            peak_windows: vec![HourWindow(7, 9), HourWindow(17, 19)],
            daytime_window: HourWindow(10, 16),
            peak_multiplier: 1.6,
            daytime_multiplier: 1.1,
            off_peak_multiplier: 0.9,
            weekend_multiplier: 0.8,
            rainy_day_multiplier: 1.4,
            weather_multipliers: WeatherMultipliers::default(),
            school_holiday_multiplier: 0.9,
            public_holiday_multiplier: 0.7,
        }
    }
}

impl ConditionSettings {
    pub fn is_peak(&self, hour: u8) -> bool {
        self.peak_windows.iter().any(|window| window.contains(hour))
    }

    /// Combined multiplier for `query`, appending one factor per applied step.
    pub fn multiplier(&self, query: &Query, factors: &mut Vec<String>) -> f64 {
        let mut multiplier = 1.0;

        let hour = query.hour();
        if self.is_peak(hour) {
            multiplier *= self.peak_multiplier;
            factors.push("Rush hour adjustment".to_string());
        } else if self.daytime_window.contains(hour) {
            multiplier *= self.daytime_multiplier;
            factors.push("Daytime traffic adjustment".to_string());
        } else {
            multiplier *= self.off_peak_multiplier;
            factors.push("Off-peak hours adjustment".to_string());
        }

        match query.day_type() {
            DayType::Weekend => {
                multiplier *= self.weekend_multiplier;
                factors.push("Weekend traffic reduction".to_string());
            }
            DayType::Rainy => {
                multiplier *= self.rainy_day_multiplier;
                factors.push("Rainy day delay factor".to_string());
            }
            DayType::Weekday => {}
        }

        let weather = self.weather_multipliers.for_weather(query.weather());
        multiplier *= weather;
        if weather > 1.0 {
            factors.push(format!("Weather impact ({})", query.weather().label()));
        }

        match query.season() {
            Season::SchoolHoliday => {
                multiplier *= self.school_holiday_multiplier;
                factors.push("School holiday reduction".to_string());
            }
            Season::PublicHoliday => {
                multiplier *= self.public_holiday_multiplier;
                factors.push("Public holiday reduction".to_string());
            }
            Season::Regular => {}
        }

        multiplier
    }

    /// Applies the chain to `minutes`. Rounding and the 15-minute floor happen
    /// when the value is turned into an [`crate::domain::Estimate`].
    pub fn apply(&self, minutes: f64, query: &Query, factors: &mut Vec<String>) -> f64 {
        minutes * self.multiplier(query, factors)
    }
}

pub fn default_base_minutes() -> HashMap<String, f64> {
    [
        ("High Level Road", 25.0),
        ("Low Level Road", 28.0),
        ("Baseline Road", 27.0),
        ("Galle Road", 32.0),
        ("Marine Drive", 35.0),
        ("Other Roads", 22.0),
    ]
    .into_iter()
    .map(|(route, minutes)| (route.to_string(), minutes))
    .collect()
}

/// Unadjusted travel time for a route: distance over typical speed when the
/// metadata is usable, otherwise the per-route default table.
pub fn base_minutes(route_id: &str, meta: Option<&RouteMeta>, defaults: &HashMap<String, f64>) -> f64 {
    meta.and_then(RouteMeta::free_flow_minutes)
        .or_else(|| defaults.get(route_id).copied())
        .unwrap_or(FALLBACK_BASE_MINUTES)
}
