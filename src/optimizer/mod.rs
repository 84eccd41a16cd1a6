//! Route and departure optimization on top of the prediction engine.
//!
//! Every public operation is infallible from the caller's point of view: an
//! error inside an operation degrades to a plain time ranking, and if even
//! that fails, to a fixed emergency recommendation. Multi-stop planning is
//! the exception and reports invalid input through [`MultiStopError`].

use crate::domain::{Estimate, Query, RouteMeta};
use crate::error::AppError;
use crate::estimation::PredictionEngine;
use crate::provider::TrafficDataProvider;
use crate::results::{Alternative, RankedResult, SecondaryMetrics};
use serde::Deserialize;
use std::cmp::Ordering;
use tracing::{error, info, warn};

pub mod comfort;
pub mod departure;
pub mod fuel;
pub mod incident;
pub mod multi_stop;
pub mod objectives;
pub mod weather;

pub use comfort::ComfortPreferences;
pub use fuel::Vehicle;
pub use multi_stop::{MultiStopError, MultiStopPlan};
pub use objectives::Objective;

const EMERGENCY_FACTOR: &str = "Emergency fallback recommendation";
const SIMPLE_RANKING_FACTOR: &str = "Simple time-based optimization";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    /// Multi-stop enumeration is factorial in this.
    pub max_stops: usize,
    pub spillover_multiplier: f64,
    pub emergency_route: String,
    pub emergency_minutes: u32,
    pub emergency_confidence: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_stops: 6,
            spillover_multiplier: 1.1,
            emergency_route: "High Level Road".to_string(),
            emergency_minutes: 30,
            emergency_confidence: 0.3,
        }
    }
}

/// One route with its prediction, as seen by the scoring functions.
#[derive(Debug, Clone)]
pub(crate) struct RouteEvaluation {
    pub route: RouteMeta,
    pub estimate: Estimate,
    pub score: f64,
}

impl RouteEvaluation {
    /// Highest score first; equal scores go to the faster route.
    fn rank(a: &Self, b: &Self) -> Ordering {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.estimate.minutes.cmp(&b.estimate.minutes))
    }
}

#[derive(Debug)]
pub struct RouteOptimizer<'a, P> {
    engine: &'a PredictionEngine<P>,
    settings: OptimizerSettings,
}

impl<'a, P: TrafficDataProvider> RouteOptimizer<'a, P> {
    pub fn new(engine: &'a PredictionEngine<P>, settings: OptimizerSettings) -> Self {
        Self { engine, settings }
    }

    pub fn engine(&self) -> &PredictionEngine<P> {
        self.engine
    }

    pub fn settings(&self) -> &OptimizerSettings {
        &self.settings
    }

    /// Predicts every catalogue route under `query`'s conditions, unscored.
    pub(crate) fn evaluate_routes(&self, query: &Query) -> Result<Vec<RouteEvaluation>, AppError> {
        let routes = self.engine.provider().list_routes()?;
        if routes.is_empty() {
            return Err(AppError::NoRoutes);
        }
        Ok(routes
            .into_iter()
            .map(|route| {
                let estimate = self.engine.estimate(&query.for_route(route.id.clone()));
                RouteEvaluation {
                    route,
                    estimate,
                    score: 0.0,
                }
            })
            .collect())
    }

    /// Sorts scored evaluations and assembles the result. `limit` caps the
    /// number of alternatives.
    pub(crate) fn ranked(
        &self,
        mut evaluations: Vec<RouteEvaluation>,
        limit: Option<usize>,
        factors: impl FnOnce(&RouteEvaluation) -> Vec<String>,
        metrics: impl FnOnce(&RouteEvaluation, &[RouteEvaluation]) -> SecondaryMetrics,
    ) -> Result<RankedResult, AppError> {
        evaluations.sort_by(RouteEvaluation::rank);
        let (best, rest) = evaluations.split_first().ok_or(AppError::NoRoutes)?;
        let alternatives = rest
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|evaluation| Alternative::from(&evaluation.estimate))
            .collect();
        Ok(RankedResult {
            recommended_route: best.route.id.clone(),
            estimate: best.estimate.clone(),
            alternatives,
            factors: factors(best),
            metrics: metrics(best, rest),
        })
    }

    /// Applies the failure policy to an operation's outcome.
    pub(crate) fn recover(
        &self,
        operation: &'static str,
        query: &Query,
        outcome: Result<RankedResult, AppError>,
    ) -> RankedResult {
        match outcome {
            Ok(result) => {
                info!(operation, route = %result.recommended_route, "Optimization complete");
                result
            }
            Err(err) => {
                warn!(operation, error = %err, "Optimization failed, falling back to time ranking");
                self.simple_ranking(query)
            }
        }
    }

    /// Fastest route first, or the emergency default if even that fails.
    pub fn simple_ranking(&self, query: &Query) -> RankedResult {
        match self.engine.compare_all_routes(query) {
            Ok(comparison) => {
                let mut ranked = comparison.into_ranked();
                ranked.factors.insert(0, SIMPLE_RANKING_FACTOR.to_string());
                ranked
            }
            Err(err) => {
                error!(error = %err, "Time ranking failed, using emergency recommendation");
                self.emergency()
            }
        }
    }

    pub fn emergency(&self) -> RankedResult {
        let settings = &self.settings;
        RankedResult {
            recommended_route: settings.emergency_route.clone(),
            estimate: Estimate::new(
                settings.emergency_route.clone(),
                f64::from(settings.emergency_minutes),
                settings.emergency_confidence,
                vec![EMERGENCY_FACTOR.to_string()],
            ),
            alternatives: Vec::new(),
            factors: vec![EMERGENCY_FACTOR.to_string()],
            metrics: SecondaryMetrics::Emergency,
        }
    }
}
