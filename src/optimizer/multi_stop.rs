//! Brute-force ordering of routes across a multi-stop trip.
//!
//! Each stop is served by one catalogue route; every ordering of the first
//! `stops` routes is predicted leg by leg, with the clock moving forward by
//! the running total. A trip with more stops than the catalogue has routes is
//! rejected.

use crate::domain::{Query, RouteId};
use crate::optimizer::RouteOptimizer;
use crate::provider::TrafficDataProvider;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

const MULTI_STOP_ALTERNATIVES: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MultiStopError {
    #[error("at least 2 stops required, got {given}")]
    InsufficientStops { given: usize },
    #[error("{given} stops exceed the limit of {max}")]
    TooManyStops { given: usize, max: usize },
    #[error("{stops} stops need as many routes, only {routes} configured")]
    NotEnoughRoutes { stops: usize, routes: usize },
    #[error("route data unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripLeg {
    pub stop: String,
    pub route_id: RouteId,
    pub departure_hour: u8,
    pub minutes: u32,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiStopResult {
    pub sequence: Vec<RouteId>,
    pub total_minutes: u32,
    pub average_confidence: f64,
    pub score: f64,
    pub legs: Vec<TripLeg>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiStopPlan {
    pub stops_count: usize,
    pub best: MultiStopResult,
    /// At most two runners-up, best first.
    pub alternatives: Vec<MultiStopResult>,
}

pub fn multi_stop_score(total_minutes: u32, average_confidence: f64) -> f64 {
    let time_score = (1.0 - f64::from(total_minutes) / 180.0).max(0.1);
    0.7 * time_score + 0.3 * average_confidence
}

/// Hour of day after `elapsed_minutes` from `start_hour`, wrapping at midnight.
pub fn leg_hour(start_hour: u8, elapsed_minutes: u32) -> u8 {
    ((u32::from(start_hour) + elapsed_minutes / 60) % 24) as u8
}

/// Rearranges `items` into the next lexicographic permutation; `false` once
/// the last one has been reached.
fn next_permutation(items: &mut [usize]) -> bool {
    let Some(pivot) = items.windows(2).rposition(|pair| pair[0] < pair[1]) else {
        return false;
    };
    let Some(successor) = items.iter().rposition(|&item| item > items[pivot]) else {
        return false;
    };
    items.swap(pivot, successor);
    items[pivot + 1..].reverse();
    true
}

impl<P: TrafficDataProvider> RouteOptimizer<'_, P> {
    pub fn optimize_multi_stop(&self, stops: &[String], conditions: &Query) -> Result<MultiStopPlan, MultiStopError> {
        if stops.len() < 2 {
            return Err(MultiStopError::InsufficientStops { given: stops.len() });
        }
        let max = self.settings().max_stops;
        if stops.len() > max {
            return Err(MultiStopError::TooManyStops {
                given: stops.len(),
                max,
            });
        }

        let routes = self.engine().provider().list_routes().map_err(|err| {
            warn!(error = %err, "Multi-stop planning could not list routes");
            MultiStopError::Unavailable(err.to_string())
        })?;
        if routes.len() < stops.len() {
            return Err(MultiStopError::NotEnoughRoutes {
                stops: stops.len(),
                routes: routes.len(),
            });
        }
        let route_ids: Vec<RouteId> = routes
            .into_iter()
            .take(stops.len())
            .map(|route| route.id)
            .collect();

        let mut order: Vec<usize> = (0..route_ids.len()).collect();
        let mut combinations = Vec::new();
        loop {
            combinations.push(self.evaluate_sequence(&order, &route_ids, stops, conditions));
            if !next_permutation(&mut order) {
                break;
            }
        }

        combinations.sort_by(|a, b| b.score.total_cmp(&a.score));
        let mut ranked = combinations.into_iter();
        let best = ranked
            .next()
            .ok_or_else(|| MultiStopError::Unavailable("no route combinations".to_string()))?;
        let alternatives = ranked.take(MULTI_STOP_ALTERNATIVES).collect();

        info!(
            stops = stops.len(),
            total_minutes = best.total_minutes,
            "Multi-stop optimization complete"
        );
        Ok(MultiStopPlan {
            stops_count: stops.len(),
            best,
            alternatives,
        })
    }

    fn evaluate_sequence(
        &self,
        order: &[usize],
        route_ids: &[RouteId],
        stops: &[String],
        conditions: &Query,
    ) -> MultiStopResult {
        let mut total_minutes: u32 = 0;
        let mut confidence_sum = 0.0;
        let mut legs = Vec::with_capacity(order.len());

        for (&index, stop) in order.iter().zip(stops) {
            let route_id = &route_ids[index];
            let departure_hour = leg_hour(conditions.hour(), total_minutes);
            let query = conditions
                .for_route(route_id.clone())
                .with_hour(departure_hour)
                .unwrap_or_else(|_| conditions.for_route(route_id.clone()));
            let estimate = self.engine().estimate(&query);

            total_minutes = total_minutes.saturating_add(estimate.minutes);
            confidence_sum += estimate.confidence;
            legs.push(TripLeg {
                stop: stop.clone(),
                route_id: route_id.clone(),
                departure_hour,
                minutes: estimate.minutes,
                confidence: estimate.confidence,
            });
        }

        let average_confidence = confidence_sum / order.len() as f64;
        MultiStopResult {
            sequence: order.iter().map(|&index| route_ids[index].clone()).collect(),
            total_minutes,
            average_confidence,
            score: multi_stop_score(total_minutes, average_confidence),
            legs,
        }
    }
}
