use crate::domain::{Query, RouteCategory, RouteMeta};
use crate::error::AppError;
use crate::optimizer::{RouteEvaluation, RouteOptimizer};
use crate::provider::TrafficDataProvider;
use crate::results::{RankedResult, Rating, SecondaryMetrics};
use serde::Deserialize;

/// Predicted time within free-flow × this counts as avoiding traffic.
const UNCONGESTED_RATIO: f64 = 1.1;
const CONSISTENT_VARIABILITY: f64 = 20.0;

/// Preference strengths in `[0, 1]`; zero or negative ignores the preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ComfortPreferences {
    pub avoid_traffic: f64,
    pub prefer_highways: f64,
    pub scenic_route: f64,
}

pub fn comfort_score(route: &RouteMeta, minutes: u32, preferences: &ComfortPreferences) -> f64 {
    let mut score = 0.5;

    if preferences.avoid_traffic > 0.0
        && route
            .free_flow_minutes()
            .is_some_and(|free_flow| f64::from(minutes) <= free_flow * UNCONGESTED_RATIO)
    {
        score += preferences.avoid_traffic * 0.3;
    }
    if preferences.prefer_highways > 0.0 && route.is_arterial() {
        score += preferences.prefer_highways * 0.2;
    }
    if preferences.scenic_route > 0.0
        && (route.has(RouteCategory::Scenic) || route.has(RouteCategory::Coastal))
    {
        score += preferences.scenic_route * 0.25;
    }

    score.clamp(0.1, 1.0)
}

fn comfort_factors(route: &RouteMeta, variability: Option<f64>) -> Vec<String> {
    let mut factors = Vec::new();
    if route.has(RouteCategory::Highway) {
        factors.push("Highway route, smoother traffic flow".to_string());
    }
    if route.has(RouteCategory::Scenic) || route.has(RouteCategory::Coastal) {
        factors.push("Scenic route, pleasant driving experience".to_string());
    }
    match variability {
        Some(v) if v < CONSISTENT_VARIABILITY => {
            factors.push("Consistent travel times, predictable journey".to_string())
        }
        Some(_) => factors.push("Variable travel times, less predictable".to_string()),
        None => {}
    }
    factors
}

impl<P: TrafficDataProvider> RouteOptimizer<'_, P> {
    pub fn optimize_comfort(&self, query: &Query, preferences: &ComfortPreferences) -> RankedResult {
        let outcome = self.try_comfort(query, preferences);
        self.recover("comfort", query, outcome)
    }

    fn try_comfort(&self, query: &Query, preferences: &ComfortPreferences) -> Result<RankedResult, AppError> {
        let evaluations: Vec<RouteEvaluation> = self
            .evaluate_routes(query)?
            .into_iter()
            .map(|mut evaluation| {
                evaluation.score = comfort_score(&evaluation.route, evaluation.estimate.minutes, preferences);
                evaluation
            })
            .collect();

        let ranked = self.ranked(
            evaluations,
            None,
            |best| vec![format!("Comfort score: {:.2}", best.score)],
            |best, _| SecondaryMetrics::Comfort {
                comfort_score: best.score,
                rating: Rating::from_score(best.score),
                stress_reduction_percent: best.score * 100.0,
                route_type: best.route.route_type.clone(),
            },
        )?;

        let route = self
            .engine()
            .provider()
            .route_metadata(&ranked.recommended_route)?
            .ok_or_else(|| AppError::UnknownRoute(ranked.recommended_route.clone()))?;
        let variability = self.engine().provider().route_variability(&route.id)?;

        let mut factors = vec!["Optimized for travel comfort".to_string()];
        factors.extend(ranked.factors);
        factors.extend(comfort_factors(&route, variability));
        Ok(RankedResult { factors, ..ranked })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Weather;
    use crate::optimizer::OptimizerSettings;
    use crate::optimizer::test_support::{conditions, engine_with};

    #[test]
    fn preferences_add_up_and_clamp() {
        let marine = RouteMeta::new("Marine Drive", 16.3, 25.0, "main");
        let all_in = ComfortPreferences {
            avoid_traffic: 1.0,
            prefer_highways: 1.0,
            scenic_route: 1.0,
        };

        // Free flow is 39.1 minutes; 40 is within 10%.
        assert_eq!(comfort_score(&marine, 40, &all_in), 1.0);
        let scenic_only = ComfortPreferences {
            scenic_route: 0.4,
            ..ComfortPreferences::default()
        };
        assert!((comfort_score(&marine, 60, &scenic_only) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn negative_preferences_are_ignored() {
        let route = RouteMeta::new("Baseline Road", 13.8, 32.0, "main");
        let averse = ComfortPreferences {
            avoid_traffic: -1.0,
            prefer_highways: -1.0,
            scenic_route: -1.0,
        };

        assert_eq!(comfort_score(&route, 20, &averse), 0.5);
    }

    #[test]
    fn scenic_preference_picks_coastal_route() {
        let engine = engine_with(vec![
            RouteMeta::new("High Level Road", 12.5, 35.0, "main"),
            RouteMeta::new("Marine Drive", 16.3, 25.0, "main"),
        ]);
        let optimizer = RouteOptimizer::new(&engine, OptimizerSettings::default());
        let preferences = ComfortPreferences {
            scenic_route: 1.0,
            ..ComfortPreferences::default()
        };

        let ranked = optimizer.optimize_comfort(&conditions(22, Weather::Clear), &preferences);

        assert_eq!(ranked.recommended_route, "Marine Drive");
        assert_eq!(ranked.factors[0], "Optimized for travel comfort");
        assert!(ranked.factors.contains(&"Scenic route, pleasant driving experience".to_string()));
        assert_eq!(ranked.alternatives.len(), 1);
        match ranked.metrics {
            SecondaryMetrics::Comfort { rating, route_type, .. } => {
                assert_eq!(rating, Rating::Medium);
                assert_eq!(route_type, "main");
            }
            other => panic!("unexpected metrics {other:?}"),
        }
    }
}
