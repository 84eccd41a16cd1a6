//! Weighted multi-objective route ranking.

use crate::domain::{Estimate, Query, RouteCategory, RouteMeta};
use crate::error::AppError;
use crate::optimizer::departure::signed_difference;
use crate::optimizer::fuel::{Vehicle, fuel_score};
use crate::optimizer::weather::weather_suitability;
use crate::optimizer::{RouteEvaluation, RouteOptimizer};
use crate::provider::TrafficDataProvider;
use crate::results::{RankedResult, SecondaryMetrics};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Travel times at or above this score zero on the time objective.
const MAX_REASONABLE_MINUTES: f64 = 60.0;
const MAX_REASONABLE_KM: f64 = 20.0;
const MAX_OBJECTIVE_ALTERNATIVES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    Time,
    Reliability,
    Comfort,
    Distance,
    Fuel,
    WeatherSafety,
}

impl Objective {
    pub fn label(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Reliability => "reliability",
            Self::Comfort => "comfort",
            Self::Distance => "distance",
            Self::Fuel => "fuel",
            Self::WeatherSafety => "weather_safety",
        }
    }
}

pub type ObjectiveScores = BTreeMap<Objective, f64>;

/// Scores in `[0, 1]` for every objective. `variability` is the route's
/// percentage spread, if known.
pub fn objective_scores(
    route: &RouteMeta,
    estimate: &Estimate,
    variability: Option<f64>,
    query: &Query,
) -> ObjectiveScores {
    let minutes = f64::from(estimate.minutes);
    let mut comfort: f64 = 0.5;
    if route.is_arterial() {
        comfort += 0.3;
    }
    if route.has(RouteCategory::Scenic) {
        comfort += 0.2;
    }

    BTreeMap::from([
        (Objective::Time, ((MAX_REASONABLE_MINUTES - minutes) / MAX_REASONABLE_MINUTES).max(0.0)),
        (
            Objective::Reliability,
            variability.map_or(estimate.confidence, |v| ((100.0 - v) / 100.0).clamp(0.0, 1.0)),
        ),
        (Objective::Comfort, comfort.min(1.0)),
        (
            Objective::Distance,
            ((MAX_REASONABLE_KM - route.distance_km) / MAX_REASONABLE_KM).max(0.0),
        ),
        (Objective::Fuel, fuel_score(route, estimate.minutes, Vehicle::Car)),
        (Objective::WeatherSafety, weather_suitability(route, query.weather())),
    ])
}

/// Σ weight × score over the supplied objectives only.
pub fn composite_score(scores: &ObjectiveScores, weights: &BTreeMap<Objective, f64>) -> f64 {
    weights
        .iter()
        .map(|(objective, weight)| weight * scores.get(objective).copied().unwrap_or(0.0))
        .sum()
}

/// Heaviest objective; the earliest one wins a tie.
fn primary_objective(weights: &BTreeMap<Objective, f64>) -> Option<(Objective, f64)> {
    weights
        .iter()
        .map(|(objective, weight)| (*objective, *weight))
        .reduce(|best, candidate| if candidate.1 > best.1 { candidate } else { best })
}

impl<P: TrafficDataProvider> RouteOptimizer<'_, P> {
    /// Ranks routes by a weighted sum of objective scores.
    pub fn rank_by_objectives(&self, query: &Query, weights: &BTreeMap<Objective, f64>) -> RankedResult {
        let outcome = self.try_rank_by_objectives(query, weights);
        self.recover("multi_objective", query, outcome)
    }

    fn try_rank_by_objectives(
        &self,
        query: &Query,
        weights: &BTreeMap<Objective, f64>,
    ) -> Result<RankedResult, AppError> {
        let mut scores: HashMap<String, ObjectiveScores> = HashMap::new();
        let mut evaluations: Vec<RouteEvaluation> = Vec::new();
        for mut evaluation in self.evaluate_routes(query)? {
            let variability = self.engine().provider().route_variability(&evaluation.route.id)?;
            let route_scores = objective_scores(&evaluation.route, &evaluation.estimate, variability, query);
            evaluation.score = composite_score(&route_scores, weights);
            scores.insert(evaluation.route.id.clone(), route_scores);
            evaluations.push(evaluation);
        }

        let score_of = |evaluation: &RouteEvaluation, objective: Objective| {
            scores
                .get(&evaluation.route.id)
                .and_then(|route_scores| route_scores.get(&objective))
                .copied()
                .unwrap_or(0.0)
        };

        self.ranked(
            evaluations,
            Some(MAX_OBJECTIVE_ALTERNATIVES),
            |best| {
                let mut factors = Vec::new();
                if let Some((objective, weight)) = primary_objective(weights) {
                    factors.push(format!("Primary objective: {} (weight: {weight})", objective.label()));
                }
                factors.push(format!("Route distance: {:.1} km", best.route.distance_km));
                factors.push(format!("Route type: {}", best.route.route_type));
                factors.push(format!("Prediction confidence: {:.1}%", best.estimate.confidence * 100.0));
                factors
            },
            |best, rest| SecondaryMetrics::Objectives {
                time_savings_minutes: rest.first().map_or(0, |second| {
                    signed_difference(second.estimate.minutes, best.estimate.minutes)
                }),
                reliability: score_of(best, Objective::Reliability),
                comfort: score_of(best, Objective::Comfort),
                composite_score: best.score,
            },
        )
    }
}
