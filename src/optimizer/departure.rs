//! Departure-time search for a fixed route and arrival target.

use crate::domain::{Query, RouteId};
use crate::error::AppError;
use crate::optimizer::RouteOptimizer;
use crate::provider::TrafficDataProvider;
use crate::results::{DepartureOption, DepartureOptimization, clock_label};
use tracing::{info, warn};

const FIRST_OFFSET_MINUTES: u32 = 30;
const OFFSET_STEP_MINUTES: usize = 15;
const MAX_DEPARTURE_ALTERNATIVES: usize = 4;
const DEFAULT_TRAVEL_MINUTES: u32 = 60;

/// Preference for arriving with some slack: 10 to 15 minutes early is ideal.
pub fn buffer_score(buffer_minutes: f64) -> f64 {
    if (10.0..=15.0).contains(&buffer_minutes) {
        1.0
    } else if (5.0..10.0).contains(&buffer_minutes) {
        0.8
    } else if buffer_minutes > 15.0 && buffer_minutes <= 20.0 {
        0.9
    } else if buffer_minutes < 5.0 {
        (buffer_minutes / 5.0).max(0.0)
    } else {
        (1.0 - (buffer_minutes - 20.0) / 30.0).max(0.0)
    }
}

/// `minuend - subtrahend`, clamped into `i32`.
pub(crate) fn signed_difference(minuend: u32, subtrahend: u32) -> i32 {
    let difference = i64::from(minuend) - i64::from(subtrahend);
    i32::try_from(difference).unwrap_or(if difference < 0 { i32::MIN } else { i32::MAX })
}

pub fn departure_score(buffer_minutes: f64, confidence: f64, travel_minutes: u32) -> f64 {
    let time_score = (1.0 - f64::from(travel_minutes) / 120.0).max(0.1);
    0.5 * buffer_score(buffer_minutes) + 0.3 * confidence + 0.2 * time_score
}

impl<P: TrafficDataProvider> RouteOptimizer<'_, P> {
    /// Best departure on `route_id` to arrive by `target_arrival_hour`:00,
    /// trying departures from 30 minutes before the target back across
    /// `window_minutes` in 15-minute steps.
    pub fn optimize_departure_window(
        &self,
        route_id: &str,
        target_arrival_hour: u8,
        conditions: &Query,
        window_minutes: u32,
    ) -> DepartureOptimization {
        match self.try_departure_window(route_id, target_arrival_hour, conditions, window_minutes) {
            Ok(optimization) => {
                info!(
                    route = route_id,
                    departure = %optimization.optimal.departure,
                    "Departure optimization complete"
                );
                optimization
            }
            Err(err) => {
                warn!(route = route_id, error = %err, "Departure optimization failed, using default");
                default_departure(route_id.to_string(), target_arrival_hour)
            }
        }
    }

    fn try_departure_window(
        &self,
        route_id: &str,
        target_arrival_hour: u8,
        conditions: &Query,
        window_minutes: u32,
    ) -> Result<DepartureOptimization, AppError> {
        let route_query = conditions.for_route(route_id).with_hour(target_arrival_hour)?;
        let target_minute = u32::from(target_arrival_hour) * 60;

        let mut options = Vec::new();
        for offset in (FIRST_OFFSET_MINUTES..window_minutes.saturating_add(FIRST_OFFSET_MINUTES))
            .step_by(OFFSET_STEP_MINUTES)
        {
            // Departures on the previous day are out of range.
            let Some(departure_minute) = target_minute.checked_sub(offset) else {
                continue;
            };
            let departure_hour = u8::try_from(departure_minute / 60)
                .map_err(|_| AppError::InvalidQuery(format!("departure minute {departure_minute}")))?;
            let estimate = self.engine().estimate(&route_query.with_hour(departure_hour)?);

            let arrival_minute = departure_minute.saturating_add(estimate.minutes);
            let buffer_minutes = signed_difference(target_minute, arrival_minute);
            options.push(DepartureOption {
                departure_minute,
                departure: clock_label(departure_minute),
                travel_minutes: estimate.minutes,
                expected_arrival: clock_label(arrival_minute),
                buffer_minutes,
                confidence: estimate.confidence,
                score: departure_score(f64::from(buffer_minutes), estimate.confidence, estimate.minutes),
                factors: estimate.factors,
            });
        }

        if options.is_empty() {
            return Err(AppError::InvalidQuery(format!(
                "no departure candidates before {target_arrival_hour:02}:00"
            )));
        }
        options.sort_by(|a, b| b.score.total_cmp(&a.score));
        let optimal_index = options
            .iter()
            .position(|option| option.buffer_minutes >= 0)
            .unwrap_or(0);
        let optimal = options.remove(optimal_index);
        options.truncate(MAX_DEPARTURE_ALTERNATIVES);

        Ok(DepartureOptimization {
            route_id: route_id.to_string(),
            target_arrival: clock_label(target_minute),
            optimal,
            alternatives: options,
            degraded: false,
        })
    }
}

/// Leave an hour early and hope for the best.
fn default_departure(route_id: RouteId, target_arrival_hour: u8) -> DepartureOptimization {
    let target_minute = u32::from(target_arrival_hour) * 60;
    let departure_minute = u32::from(target_arrival_hour.saturating_sub(1)) * 60;
    DepartureOptimization {
        route_id,
        target_arrival: clock_label(target_minute),
        optimal: DepartureOption {
            departure_minute,
            departure: clock_label(departure_minute),
            travel_minutes: DEFAULT_TRAVEL_MINUTES,
            expected_arrival: clock_label(target_minute),
            buffer_minutes: 0,
            confidence: 0.0,
            score: 0.0,
            factors: vec!["Default departure recommendation".to_string()],
        },
        alternatives: Vec::new(),
        degraded: true,
    }
}
