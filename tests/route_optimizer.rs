use commute_forecast::clock::{Clock, ManualClock};
use commute_forecast::domain::{DayType, Observation, Query, RouteMeta, Season, Weather};
use commute_forecast::error::AppError;
use commute_forecast::estimation::{EngineSettings, PredictionEngine};
use commute_forecast::optimizer::{
    ComfortPreferences, MultiStopError, Objective, OptimizerSettings, RouteOptimizer, Vehicle,
};
use commute_forecast::provider::TrafficDataProvider;
use commute_forecast::provider::memory::InMemoryProvider;
use commute_forecast::results::SecondaryMetrics;
use std::collections::BTreeMap;
use std::sync::Arc;
use time::macros::datetime;

fn engine() -> PredictionEngine<InMemoryProvider> {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(datetime!(2024-03-04 09:00 UTC)));
    let provider = InMemoryProvider::with_default_routes().with_clock(Arc::clone(&clock));
    PredictionEngine::with_clock(provider, EngineSettings::default(), clock)
}

fn conditions(hour: u8, weather: Weather) -> Query {
    Query::conditions(hour, DayType::Weekday, weather, Season::Regular).expect("valid query")
}

/// Provider for a data store that is down.
#[derive(Debug)]
struct OfflineProvider;

impl TrafficDataProvider for OfflineProvider {
    fn similar_observations(&self, _: &Query, _: u32) -> Result<Vec<Observation>, AppError> {
        Err(AppError::Provider("store offline".to_string()))
    }

    fn route_metadata(&self, _: &str) -> Result<Option<RouteMeta>, AppError> {
        Err(AppError::Provider("store offline".to_string()))
    }

    fn list_routes(&self) -> Result<Vec<RouteMeta>, AppError> {
        Err(AppError::Provider("store offline".to_string()))
    }

    fn route_observations(&self, _: &str, _: u32) -> Result<Vec<Observation>, AppError> {
        Err(AppError::Provider("store offline".to_string()))
    }
}

#[test]
fn offline_store_degrades_every_ranking_to_emergency() {
    let engine = PredictionEngine::new(OfflineProvider, EngineSettings::default());
    let optimizer = RouteOptimizer::new(&engine, OptimizerSettings::default());
    let query = conditions(8, Weather::Clear);
    let weights = BTreeMap::from([(Objective::Time, 1.0)]);

    let results = [
        optimizer.rank_by_objectives(&query, &weights),
        optimizer.optimize_fuel_efficiency(&query, Vehicle::Car),
        optimizer.optimize_comfort(&query, &ComfortPreferences::default()),
        optimizer.optimize_weather_suitability(&query),
    ];

    for ranked in results {
        assert_eq!(ranked.recommended_route, "High Level Road");
        assert_eq!(ranked.estimate.minutes, 30);
        assert_eq!(ranked.estimate.confidence, 0.3);
        assert_eq!(ranked.metrics, SecondaryMetrics::Emergency);
    }
}

#[test]
fn offline_store_still_yields_a_departure() {
    let engine = PredictionEngine::new(OfflineProvider, EngineSettings::default());
    let optimizer = RouteOptimizer::new(&engine, OptimizerSettings::default());

    let result = optimizer.optimize_departure_window("Galle Road", 9, &conditions(9, Weather::Clear), 60);

    // Estimates fall back to the default table (32 minutes) rather than failing.
    assert!(!result.degraded);
    assert_eq!(result.optimal.travel_minutes, 32);
    assert!(result.optimal.buffer_minutes >= 0);
}

#[test]
fn incident_excludes_blocked_route() {
    let engine = engine();
    let optimizer = RouteOptimizer::new(&engine, OptimizerSettings::default());
    let query = conditions(17, Weather::Rainy);

    let comparison = optimizer.find_alternatives_on_incident("Galle Road", &query);

    assert!(comparison.predictions.iter().all(|e| e.route_id != "Galle Road"));
    for estimate in &comparison.predictions {
        let unblocked = engine.estimate(&query.for_route(estimate.route_id.clone()));
        assert_eq!(estimate.minutes, (f64::from(unblocked.minutes) * 1.1).round() as u32);
    }
}

#[test]
fn multi_stop_rejects_a_single_stop() {
    let engine = engine();
    let optimizer = RouteOptimizer::new(&engine, OptimizerSettings::default());

    let result = optimizer.optimize_multi_stop(&["Home".to_string()], &conditions(8, Weather::Clear));

    assert!(matches!(result, Err(MultiStopError::InsufficientStops { given: 1 })));
}

#[test]
fn multi_stop_legs_add_up() {
    let engine = engine();
    let optimizer = RouteOptimizer::new(&engine, OptimizerSettings::default());
    let stops: Vec<String> = ["Home", "Market", "Office", "Gym"].map(String::from).to_vec();

    let plan = optimizer
        .optimize_multi_stop(&stops, &conditions(16, Weather::Clear))
        .expect("plan");

    assert_eq!(plan.best.legs.len(), 4);
    assert_eq!(
        plan.best.total_minutes,
        plan.best.legs.iter().map(|leg| leg.minutes).sum::<u32>()
    );
    assert_eq!(plan.alternatives.len(), 2);
    assert!(plan.alternatives.iter().all(|alt| alt.score <= plan.best.score));
}

#[test]
fn departure_candidates_are_ranked() {
    let engine = engine();
    let optimizer = RouteOptimizer::new(&engine, OptimizerSettings::default());

    let result = optimizer.optimize_departure_window("Marine Drive", 18, &conditions(18, Weather::Clear), 90);

    assert!(!result.degraded);
    assert!(result.alternatives.len() <= 4);
    assert!(result.optimal.buffer_minutes >= 0);
    assert!(result.alternatives.windows(2).all(|pair| pair[0].score >= pair[1].score));
}
