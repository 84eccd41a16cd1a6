use crate::domain::{Query, RouteCategory, RouteMeta};
use crate::error::AppError;
use crate::optimizer::{RouteEvaluation, RouteOptimizer};
use crate::provider::TrafficDataProvider;
use crate::results::{RankedResult, Rating, SecondaryMetrics};
use serde::{Deserialize, Serialize};

/// Predicted time above free-flow × this counts as stop-and-go traffic.
const STOP_GO_RATIO: f64 = 1.3;
const HEAVY_TRAFFIC_RATIO: f64 = 1.2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vehicle {
    #[default]
    Car,
    Motorcycle,
    Truck,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleProfile {
    pub stop_go_penalty: f64,
    pub highway_bonus: f64,
    pub distance_weight: f64,
}

impl Vehicle {
    pub fn label(self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Motorcycle => "motorcycle",
            Self::Truck => "truck",
        }
    }

    pub fn profile(self) -> VehicleProfile {
        match self {
            Self::Car => VehicleProfile {
                stop_go_penalty: 1.3,
                highway_bonus: 0.9,
                distance_weight: 0.4,
            },
            Self::Motorcycle => VehicleProfile {
                stop_go_penalty: 1.2,
                highway_bonus: 0.95,
                distance_weight: 0.3,
            },
            Self::Truck => VehicleProfile {
                stop_go_penalty: 1.5,
                highway_bonus: 0.85,
                distance_weight: 0.6,
            },
        }
    }
}

/// Fuel efficiency in `[0.1, 1]`: short distance, free-flowing traffic and
/// arterial roads score higher.
pub fn fuel_score(route: &RouteMeta, minutes: u32, vehicle: Vehicle) -> f64 {
    let profile = vehicle.profile();
    let distance_penalty = route.distance_km * profile.distance_weight * 0.05;
    let stop_go = route
        .free_flow_minutes()
        .is_some_and(|free_flow| f64::from(minutes) > free_flow * STOP_GO_RATIO);
    let traffic_penalty = if stop_go { profile.stop_go_penalty * 0.2 } else { 0.0 };
    let arterial_bonus = if route.is_arterial() { profile.highway_bonus * 0.3 } else { 0.0 };

    (0.5 - distance_penalty - traffic_penalty + arterial_bonus).clamp(0.1, 1.0)
}

fn fuel_factors(route: &RouteMeta, minutes: u32) -> Vec<String> {
    let mut factors = vec![format!("Route distance: {:.1} km", route.distance_km)];
    let heavy = route
        .free_flow_minutes()
        .is_some_and(|free_flow| f64::from(minutes) > free_flow * HEAVY_TRAFFIC_RATIO);
    factors.push(if heavy {
        "Heavy traffic may increase fuel consumption".to_string()
    } else {
        "Moderate traffic conditions".to_string()
    });
    if route.has(RouteCategory::Highway) {
        factors.push("Highway route, better fuel efficiency".to_string());
    }
    factors
}

impl<P: TrafficDataProvider> RouteOptimizer<'_, P> {
    /// Route that burns the least fuel for `vehicle` under `query`'s conditions.
    pub fn optimize_fuel_efficiency(&self, query: &Query, vehicle: Vehicle) -> RankedResult {
        let outcome = self.try_fuel_efficiency(query, vehicle);
        self.recover("fuel_efficiency", query, outcome)
    }

    fn try_fuel_efficiency(&self, query: &Query, vehicle: Vehicle) -> Result<RankedResult, AppError> {
        let evaluations: Vec<RouteEvaluation> = self
            .evaluate_routes(query)?
            .into_iter()
            .map(|mut evaluation| {
                evaluation.score = fuel_score(&evaluation.route, evaluation.estimate.minutes, vehicle);
                evaluation
            })
            .collect();

        self.ranked(
            evaluations,
            None,
            |best| {
                let mut factors = vec![
                    format!("Optimized for {} fuel efficiency", vehicle.label()),
                    format!("Fuel efficiency score: {:.2}", best.score),
                ];
                factors.extend(fuel_factors(&best.route, best.estimate.minutes));
                factors
            },
            |best, _| SecondaryMetrics::Fuel {
                vehicle: vehicle.label().to_string(),
                fuel_score: best.score,
                estimated_fuel_savings_percent: (1.0 - best.score) * 100.0,
                distance_km: best.route.distance_km,
                rating: Rating::from_score(best.score),
            },
        )
    }
}
