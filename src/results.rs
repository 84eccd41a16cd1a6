//! Result records returned by route comparison and the optimizer.

use crate::domain::{DayType, Estimate, Query, RouteId, Weather};
use crate::error::AppError;
use serde::Serialize;
use time::Time;
use time::macros::format_description;

/// Second-best routes within this many minutes are called out as a good option.
const CLOSE_ALTERNATIVE_MINUTES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    High,
    Medium,
    Low,
}

impl Rating {
    pub fn from_score(score: f64) -> Self {
        if score > 0.8 {
            Self::High
        } else if score > 0.6 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Per-operation secondary metrics attached to a ranked result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SecondaryMetrics {
    Objectives {
        /// Runner-up minutes minus recommended minutes; negative when the
        /// runner-up is faster.
        time_savings_minutes: i32,
        reliability: f64,
        comfort: f64,
        composite_score: f64,
    },
    Fuel {
        vehicle: String,
        fuel_score: f64,
        estimated_fuel_savings_percent: f64,
        distance_km: f64,
        rating: Rating,
    },
    Comfort {
        comfort_score: f64,
        rating: Rating,
        stress_reduction_percent: f64,
        route_type: String,
    },
    Weather {
        weather_score: f64,
        rating: Rating,
        weather: Weather,
        safety_features: Vec<String>,
    },
    /// Plain time ranking, used directly or after an optimizer error.
    TimeOnly { time_savings_minutes: u32 },
    Emergency,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alternative {
    pub route_id: RouteId,
    pub minutes: u32,
}

impl From<&Estimate> for Alternative {
    fn from(estimate: &Estimate) -> Self {
        Self {
            route_id: estimate.route_id.clone(),
            minutes: estimate.minutes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    pub recommended_route: RouteId,
    pub estimate: Estimate,
    pub alternatives: Vec<Alternative>,
    pub factors: Vec<String>,
    pub metrics: SecondaryMetrics,
}

/// Every route's prediction under one set of conditions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteComparison {
    pub query: Query,
    /// Ascending by minutes.
    pub predictions: Vec<Estimate>,
    pub best_route: RouteId,
    pub recommendations: Vec<String>,
}

impl RouteComparison {
    /// Sorts `predictions` (stable, by minutes) and derives the advice lines.
    pub fn new(query: Query, mut predictions: Vec<Estimate>) -> Result<Self, AppError> {
        predictions.sort_by_key(|estimate| estimate.minutes);
        let best_route = predictions
            .first()
            .map(|best| best.route_id.clone())
            .ok_or(AppError::NoRoutes)?;
        let recommendations = recommendations(&query, &predictions);
        Ok(Self {
            query,
            predictions,
            best_route,
            recommendations,
        })
    }

    /// Minutes saved by the best route over the runner-up.
    pub fn time_savings(&self) -> u32 {
        match self.predictions.as_slice() {
            [best, second, ..] => second.minutes.saturating_sub(best.minutes),
            _ => 0,
        }
    }

    pub fn into_ranked(self) -> RankedResult {
        let time_savings_minutes = self.time_savings();
        let mut predictions = self.predictions.into_iter();
        // `new` guarantees at least one prediction.
        let estimate = predictions
            .next()
            .unwrap_or_else(|| Estimate::new(self.best_route.clone(), 0.0, 0.0, Vec::new()));
        let alternatives = predictions.map(|e| Alternative::from(&e)).collect();
        RankedResult {
            recommended_route: self.best_route,
            estimate,
            alternatives,
            factors: self.recommendations,
            metrics: SecondaryMetrics::TimeOnly { time_savings_minutes },
        }
    }
}

impl From<RouteComparison> for RankedResult {
    fn from(comparison: RouteComparison) -> Self {
        comparison.into_ranked()
    }
}

fn recommendations(query: &Query, predictions: &[Estimate]) -> Vec<String> {
    let Some(best) = predictions.first() else {
        return vec!["No route data available".to_string()];
    };

    let mut lines = vec![format!("Best route: {} ({} minutes)", best.route_id, best.minutes)];

    if let Some(second) = predictions.get(1) {
        let diff = second.minutes.saturating_sub(best.minutes);
        if diff <= CLOSE_ALTERNATIVE_MINUTES {
            lines.push(format!(
                "Alternative: {} (+{diff} min), also a good option",
                second.route_id
            ));
        } else {
            lines.push(format!("Alternative: {} (+{diff} min)", second.route_id));
        }
    }

    match query.hour() {
        7 | 8 => lines.push("Morning rush hour: consider leaving 15 minutes earlier or later".to_string()),
        17 | 18 => lines.push("Evening rush hour: expect heavy traffic on all routes".to_string()),
        hour if hour < 7 => lines.push("Early morning: minimal traffic expected".to_string()),
        hour if hour > 21 => lines.push("Late evening: very light traffic expected".to_string()),
        _ => {}
    }

    if query.weather().is_wet() {
        lines.push("Poor weather: drive carefully and allow extra time".to_string());
        lines.push("Check for flood warnings before leaving".to_string());
    }

    if query.day_type() == DayType::Weekend {
        lines.push("Weekend travel: lighter traffic, busier near recreational areas".to_string());
    }

    if let Some(advice) = route_advice(&best.route_id) {
        lines.push(advice.to_string());
    }

    lines
}

/// Local knowledge about the catalogue's well-known roads.
fn route_advice(route_id: &str) -> Option<&'static str> {
    match route_id {
        "High Level Road" => Some("High Level Road often flows better during peak hours"),
        "Galle Road" => Some("Galle Road may be slower near commercial areas"),
        "Marine Drive" => Some("Marine Drive is scenic but may be slower"),
        _ => None,
    }
}

/// Advice lines for a comparison that excludes a blocked route.
pub fn incident_recommendations(blocked_route: &str, best_route: &str) -> Vec<String> {
    vec![
        format!("Avoid {blocked_route} due to incident"),
        format!("Best alternative: {best_route}"),
        "Expect slight delays on all routes due to traffic spillover".to_string(),
        "Check real-time traffic updates before departing".to_string(),
    ]
}

/// `HH:MM` for a minute-of-day value (wrapped into one day).
pub fn clock_label(minute_of_day: u32) -> String {
    let minute_of_day = minute_of_day % (24 * 60);
    let format = format_description!("[hour]:[minute]");
    Time::from_hms((minute_of_day / 60) as u8, (minute_of_day % 60) as u8, 0)
        .ok()
        .and_then(|time| time.format(&format).ok())
        .unwrap_or_else(|| format!("{:02}:{:02}", minute_of_day / 60, minute_of_day % 60))
}

/// One candidate departure time for a target arrival hour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartureOption {
    /// Minutes after midnight of the target day.
    pub departure_minute: u32,
    pub departure: String,
    pub travel_minutes: u32,
    pub expected_arrival: String,
    /// Minutes between expected arrival and the target; negative means late.
    pub buffer_minutes: i32,
    pub confidence: f64,
    pub score: f64,
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartureOptimization {
    pub route_id: RouteId,
    pub target_arrival: String,
    pub optimal: DepartureOption,
    /// Descending by score.
    pub alternatives: Vec<DepartureOption>,
    /// Set when no candidate could be evaluated and `optimal` is a default.
    pub degraded: bool,
}
