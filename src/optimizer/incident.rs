use crate::domain::{Estimate, Query};
use crate::error::AppError;
use crate::optimizer::RouteOptimizer;
use crate::provider::TrafficDataProvider;
use crate::results::{RouteComparison, incident_recommendations};
use tracing::{error, info, warn};

impl<P: TrafficDataProvider> RouteOptimizer<'_, P> {
    /// Ranks every route except `blocked_route`, inflating each prediction by
    /// the configured spillover multiplier for traffic diverted off the
    /// blocked road.
    pub fn find_alternatives_on_incident(&self, blocked_route: &str, conditions: &Query) -> RouteComparison {
        match self.try_incident_alternatives(blocked_route, conditions) {
            Ok(comparison) => {
                info!(
                    blocked = blocked_route,
                    best = %comparison.best_route,
                    "Incident alternatives ready"
                );
                comparison
            }
            Err(err) => {
                warn!(blocked = blocked_route, error = %err, "Incident rerouting failed, falling back to time ranking");
                self.unblocked_comparison(blocked_route, conditions)
            }
        }
    }

    fn try_incident_alternatives(&self, blocked_route: &str, conditions: &Query) -> Result<RouteComparison, AppError> {
        let multiplier = self.settings().spillover_multiplier;
        let predictions = self
            .evaluate_routes(conditions)?
            .into_iter()
            .filter(|evaluation| evaluation.route.id != blocked_route)
            .map(|evaluation| {
                let estimate = evaluation.estimate;
                let mut factors = estimate.factors;
                factors.push(format!("Incident spillover from {blocked_route} (x{multiplier})"));
                Estimate::new(
                    estimate.route_id,
                    f64::from(estimate.minutes) * multiplier,
                    estimate.confidence,
                    factors,
                )
            })
            .collect();

        let mut comparison = RouteComparison::new(conditions.clone(), predictions)?;
        comparison.recommendations = incident_recommendations(blocked_route, &comparison.best_route);
        Ok(comparison)
    }

    /// Plain comparison without the blocked route, or the emergency route.
    fn unblocked_comparison(&self, blocked_route: &str, conditions: &Query) -> RouteComparison {
        let comparison = self.engine().compare_all_routes(conditions).and_then(|comparison| {
            let predictions = comparison
                .predictions
                .into_iter()
                .filter(|estimate| estimate.route_id != blocked_route)
                .collect();
            RouteComparison::new(conditions.clone(), predictions)
        });

        match comparison {
            Ok(mut comparison) => {
                comparison.recommendations = incident_recommendations(blocked_route, &comparison.best_route);
                comparison
            }
            Err(err) => {
                error!(error = %err, "Time ranking failed, using emergency recommendation");
                let emergency = self.emergency();
                RouteComparison {
                    query: conditions.clone(),
                    predictions: vec![emergency.estimate],
                    best_route: emergency.recommended_route,
                    recommendations: emergency.factors,
                }
            }
        }
    }
}
