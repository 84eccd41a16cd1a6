use crate::domain::{Query, RouteCategory, RouteMeta, Weather};
use crate::error::AppError;
use crate::optimizer::{RouteEvaluation, RouteOptimizer};
use crate::provider::TrafficDataProvider;
use crate::results::{RankedResult, Rating, SecondaryMetrics};

const SHORT_ROUTE_KM: f64 = 15.0;

/// How well a route copes with `weather`, in `[0.1, 1]`.
pub fn weather_suitability(route: &RouteMeta, weather: Weather) -> f64 {
    let mut score: f64 = 0.7;
    if weather.is_wet() {
        if route.has(RouteCategory::Highway) {
            score += 0.2;
        }
        if route.has(RouteCategory::Coastal) {
            score -= 0.3;
        }
        if route.has(RouteCategory::Main) {
            score += 0.1;
        }
    } else if weather == Weather::Clear && route.has(RouteCategory::Scenic) {
        score += 0.2;
    }
    score.clamp(0.1, 1.0)
}

pub fn safety_features(route: &RouteMeta) -> Vec<String> {
    let mut features = Vec::new();
    if route.has(RouteCategory::Highway) {
        features.push("Divided highway".to_string());
    }
    if route.has(RouteCategory::Main) {
        features.push("Well-maintained main road".to_string());
    }
    if route.distance_km < SHORT_ROUTE_KM {
        features.push("Shorter distance reduces exposure".to_string());
    }
    features
}

fn weather_factors(route: &RouteMeta, weather: Weather) -> Vec<String> {
    let mut factors = Vec::new();
    if weather.is_wet() {
        factors.push("Rainy conditions, checking route suitability".to_string());
        if route.has(RouteCategory::Highway) {
            factors.push("Highway route, generally better drainage".to_string());
        }
        if route.has(RouteCategory::Coastal) {
            factors.push("Coastal route, monitor for flooding".to_string());
        }
        if route.has(RouteCategory::Main) {
            factors.push("Main road, priority for maintenance".to_string());
        }
    }
    factors
}

impl<P: TrafficDataProvider> RouteOptimizer<'_, P> {
    /// Balances speed against how the road holds up in the query's weather.
    pub fn optimize_weather_suitability(&self, query: &Query) -> RankedResult {
        let outcome = self.try_weather_suitability(query);
        self.recover("weather_suitability", query, outcome)
    }

    fn try_weather_suitability(&self, query: &Query) -> Result<RankedResult, AppError> {
        let weather = query.weather();
        let mut suitability = Vec::new();
        let evaluations: Vec<RouteEvaluation> = self
            .evaluate_routes(query)?
            .into_iter()
            .map(|mut evaluation| {
                let score = weather_suitability(&evaluation.route, weather);
                suitability.push((evaluation.route.id.clone(), score));
                evaluation.score = 0.6 / f64::from(evaluation.estimate.minutes.max(1)) + 0.4 * score;
                evaluation
            })
            .collect();

        let suitability_of = |best: &RouteEvaluation| {
            suitability
                .iter()
                .find(|(id, _)| *id == best.route.id)
                .map_or(0.0, |(_, score)| *score)
        };

        self.ranked(
            evaluations,
            None,
            |best| {
                let mut factors = vec![
                    format!("Optimized for {} conditions", weather.label()),
                    format!("Weather suitability: {:.2}", suitability_of(best)),
                ];
                factors.extend(weather_factors(&best.route, weather));
                factors
            },
            |best, _| {
                let weather_score = suitability_of(best);
                SecondaryMetrics::Weather {
                    weather_score,
                    rating: Rating::from_score(weather_score),
                    weather,
                    safety_features: safety_features(&best.route),
                }
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::OptimizerSettings;
    use crate::optimizer::test_support::{conditions, engine_with};

    #[test]
    fn rain_favours_highways_and_penalises_coast() {
        let expressway = RouteMeta::new("Expressway", 15.0, 60.0, "highway");
        let marine = RouteMeta::new("Marine Drive", 16.3, 25.0, "main");
        let lane = RouteMeta::new("Other Roads", 11.8, 20.0, "local");

        assert!((weather_suitability(&expressway, Weather::HeavyRain) - 0.9).abs() < 1e-12);
        assert!((weather_suitability(&marine, Weather::Rainy) - 0.5).abs() < 1e-12);
        assert!((weather_suitability(&lane, Weather::Rainy) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn clear_weather_rewards_scenic_routes_only() {
        let scenic = RouteMeta::new("Hill Road", 9.0, 30.0, "scenic");

        assert!((weather_suitability(&scenic, Weather::Clear) - 0.9).abs() < 1e-12);
        assert!((weather_suitability(&scenic, Weather::Cloudy) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn safety_features_follow_categories() {
        let route = RouteMeta::new("High Level Road", 12.5, 35.0, "main");

        assert_eq!(
            safety_features(&route),
            vec![
                "Well-maintained main road".to_string(),
                "Shorter distance reduces exposure".to_string()
            ]
        );
    }

    #[test]
    fn rainy_ranking_avoids_coastal_route() {
        let engine = engine_with(vec![
            RouteMeta::new("Marine Drive", 16.3, 25.0, "main"),
            RouteMeta::new("Expressway", 15.0, 60.0, "highway"),
        ]);
        let optimizer = RouteOptimizer::new(&engine, OptimizerSettings::default());

        let ranked = optimizer.optimize_weather_suitability(&conditions(12, Weather::Rainy));

        assert_eq!(ranked.recommended_route, "Expressway");
        assert_eq!(ranked.factors[0], "Optimized for rainy conditions");
        assert!(ranked.factors.contains(&"Highway route, generally better drainage".to_string()));
        match ranked.metrics {
            SecondaryMetrics::Weather { weather_score, rating, .. } => {
                assert!((weather_score - 0.9).abs() < 1e-12);
                assert_eq!(rating, Rating::High);
            }
            other => panic!("unexpected metrics {other:?}"),
        }
    }
}
