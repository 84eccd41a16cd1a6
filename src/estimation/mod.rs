use crate::clock::{Clock, SystemClock};
use crate::domain::{Estimate, Observation, Query};
use crate::error::AppError;
use crate::provider::TrafficDataProvider;
use crate::results::RouteComparison;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

pub mod accuracy;
pub mod adjustment;
pub mod cache;
pub mod ensemble;
pub mod model;
pub mod moving_average;
pub mod recency_weighted;
pub mod regression;
pub mod seasonal;
pub mod simple;

#[cfg(test)]
pub(crate) mod fixtures;

use adjustment::{ConditionSettings, base_minutes, default_base_minutes};
use cache::PredictionCache;
use ensemble::Ensemble;
use model::EstimationContext;
use simple::simple_estimate;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);
const EMERGENCY_CONFIDENCE: f64 = 0.1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationMode {
    #[default]
    Ensemble,
    Simple,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub mode: EstimationMode,
    /// Below this many usable records the ensemble is skipped for the base path.
    pub min_samples: usize,
    pub lookback_days: u32,
    pub cache_ttl_secs: u64,
    pub default_base_minutes: HashMap<String, f64>,
    /// Filled from the `[conditions]` config section.
    #[serde(skip)]
    pub conditions: ConditionSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            mode: EstimationMode::default(),
            min_samples: 3,
            lookback_days: 90,
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            default_base_minutes: default_base_minutes(),
            conditions: ConditionSettings::default(),
        }
    }
}

impl EngineSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Travel-time prediction over a historical-data provider.
///
/// Each engine owns its cache; two engines never share predictions.
#[derive(Debug)]
pub struct PredictionEngine<P> {
    provider: P,
    settings: EngineSettings,
    ensemble: Ensemble,
    cache: PredictionCache,
    clock: Arc<dyn Clock>,
}

impl<P: TrafficDataProvider> PredictionEngine<P> {
    pub fn new(provider: P, settings: EngineSettings) -> Self {
        Self::with_clock(provider, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(provider: P, settings: EngineSettings, clock: Arc<dyn Clock>) -> Self {
        let ttl = time::Duration::try_from(settings.cache_ttl()).unwrap_or(time::Duration::ZERO);
        Self {
            provider,
            settings,
            ensemble: Ensemble::default(),
            cache: PredictionCache::new(ttl),
            clock,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    pub fn clear_cache(&self) {
        match self.cache.clear() {
            Ok(()) => info!("Prediction cache cleared"),
            Err(err) => warn!(error = %err, "Failed to clear prediction cache"),
        }
    }

    /// Estimate for a single-route query, failing only when the provider does.
    pub fn try_estimate(&self, query: &Query) -> Result<Estimate, AppError> {
        if query.is_all_routes() {
            return Err(AppError::InvalidQuery("estimate needs a route".to_string()));
        }

        let key = query.cache_key();
        let now = self.clock.now();
        match self.cache.get(&key, now) {
            Ok(Some(hit)) => {
                debug!(%query, "Prediction cache hit");
                return Ok(hit);
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "Prediction cache unavailable, recomputing"),
        }

        let observations = self
            .provider
            .similar_observations(query, self.settings.lookback_days)?;
        let estimate = self.predict(query, &observations, now);

        if let Err(err) = self.cache.insert(key, estimate.clone(), now) {
            warn!(error = %err, "Prediction not cached");
        }
        Ok(estimate)
    }

    /// Estimate for `query`. Provider failures degrade to the route's default
    /// time with minimal confidence.
    pub fn estimate(&self, query: &Query) -> Estimate {
        match self.try_estimate(query) {
            Ok(estimate) => estimate,
            Err(err) => {
                warn!(%query, error = %err, "Prediction failed, using emergency fallback");
                self.emergency_estimate(query)
            }
        }
    }

    /// Estimate from a caller-supplied observation set. Bypasses the cache.
    pub fn estimate_with(&self, query: &Query, observations: &[Observation]) -> Estimate {
        self.predict(query, observations, self.clock.now())
    }

    /// Every catalogue route under the query's conditions, fastest first.
    pub fn compare_all_routes(&self, query: &Query) -> Result<RouteComparison, AppError> {
        let routes = self.provider.list_routes()?;
        if routes.is_empty() {
            return Err(AppError::NoRoutes);
        }

        let mut predictions: Vec<Estimate> = routes
            .iter()
            .map(|route| self.estimate(&query.for_route(route.id.clone())))
            .collect();
        predictions.sort_by_key(|estimate| estimate.minutes);

        let comparison = RouteComparison::new(query.clone(), predictions)?;
        info!(
            best = %comparison.best_route,
            routes = comparison.predictions.len(),
            "Route comparison complete"
        );
        Ok(comparison)
    }

    fn predict(&self, query: &Query, observations: &[Observation], now: OffsetDateTime) -> Estimate {
        let usable: Vec<Observation> = observations
            .iter()
            .filter(|observation| observation.is_usable())
            .cloned()
            .collect();

        match self.settings.mode {
            EstimationMode::Simple => {
                let (raw, factor) = simple_estimate(&usable, || self.base_minutes(query.route_id()));
                let mut factors = vec![factor];
                let minutes = self.settings.conditions.apply(raw.minutes, query, &mut factors);
                Estimate::new(query.route_id(), minutes, raw.confidence, factors)
            }
            EstimationMode::Ensemble if usable.len() < self.settings.min_samples => {
                self.base_estimate(query, usable.len())
            }
            EstimationMode::Ensemble => {
                let ctx = EstimationContext {
                    query,
                    observations: &usable,
                    now,
                };
                let outcome = self.ensemble.run(&ctx);
                debug!(
                    %query,
                    minutes = outcome.estimate.minutes,
                    confidence = outcome.estimate.confidence,
                    "Ensemble prediction"
                );
                Estimate::new(
                    query.route_id(),
                    outcome.estimate.minutes,
                    outcome.estimate.confidence,
                    outcome.factors,
                )
            }
        }
    }

    fn base_estimate(&self, query: &Query, available: usize) -> Estimate {
        let (confidence, factor) = if available == 0 {
            (0.3, "No historical data, using base estimate".to_string())
        } else {
            (
                0.4,
                format!("Limited historical data ({available} records), using base estimate"),
            )
        };
        debug!(%query, available, "Falling back to base estimate");

        let mut factors = vec![factor];
        let minutes = self
            .settings
            .conditions
            .apply(self.base_minutes(query.route_id()), query, &mut factors);
        Estimate::new(query.route_id(), minutes, confidence, factors)
    }

    fn base_minutes(&self, route_id: &str) -> f64 {
        let meta = self.provider.route_metadata(route_id).unwrap_or_else(|err| {
            warn!(route = route_id, error = %err, "Route metadata unavailable");
            None
        });
        base_minutes(route_id, meta.as_ref(), &self.settings.default_base_minutes)
    }

    fn emergency_estimate(&self, query: &Query) -> Estimate {
        let minutes = base_minutes(query.route_id(), None, &self.settings.default_base_minutes);
        Estimate::new(
            query.route_id(),
            minutes,
            EMERGENCY_CONFIDENCE,
            vec!["Emergency fallback prediction".to_string()],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::domain::{DayType, Season, Weather};
    use crate::provider::memory::InMemoryProvider;
    use crate::estimation::fixtures::{NOW, constant_series, observation, query};

    fn engine(mode: EstimationMode) -> PredictionEngine<InMemoryProvider> {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(NOW));
        let provider = InMemoryProvider::with_default_routes().with_clock(Arc::clone(&clock));
        let settings = EngineSettings {
            mode,
            ..EngineSettings::default()
        };
        PredictionEngine::with_clock(provider, settings, clock)
    }

    #[test]
    fn empty_history_uses_metadata_base_and_rush_hour() {
        let estimate = engine(EstimationMode::Ensemble).estimate(&query(8));

        // 12.5 km at 35 km/h is 21.43 minutes; ×1.6 rounds to 34.
        assert_eq!(estimate.minutes, 34);
        assert_eq!(estimate.confidence, 0.3);
        assert_eq!(estimate.factors[0], "No historical data, using base estimate");
        assert_eq!(estimate.factors[1], "Rush hour adjustment");
    }

    #[test]
    fn sparse_history_still_uses_base_path() {
        let engine = engine(EstimationMode::Ensemble);
        let observations = vec![observation(1, 8, 90.0), observation(2, 8, 90.0)];

        let estimate = engine.estimate_with(&query(8), &observations);

        assert_eq!(estimate.minutes, 34);
        assert_eq!(estimate.confidence, 0.4);
    }

    #[test]
    fn ensemble_output_skips_condition_chain() {
        let engine = engine(EstimationMode::Ensemble);
        let observations = constant_series(20, 8, 30.0);

        let estimate = engine.estimate_with(&query(8), &observations);

        assert_eq!(estimate.minutes, 30);
        assert!((estimate.confidence - 0.66).abs() < 1e-9);
        assert!(!estimate.factors.contains(&"Rush hour adjustment".to_string()));
    }

    #[test]
    fn simple_mode_blends_thin_history_with_unadjusted_base() {
        let engine = engine(EstimationMode::Simple);
        let query = Query::new("Galle Road", 12, DayType::Weekday, Weather::Clear, Season::Regular)
            .expect("valid query");
        let mut record = observation(1, 12, 40.0);
        record.route_id = "Galle Road".to_string();

        let estimate = engine.estimate_with(&query, &[record]);

        // base 15.1 / 28 × 60 = 32.36; blended 36.18; daytime ×1.1 = 39.8.
        assert_eq!(estimate.minutes, 40);
        assert_eq!(estimate.confidence, 0.4);
    }

    #[test]
    fn unknown_route_uses_fallback_base() {
        let engine = engine(EstimationMode::Ensemble);
        let query = Query::new("Unmapped Lane", 22, DayType::Weekday, Weather::Clear, Season::Regular)
            .expect("valid query");

        let estimate = engine.estimate(&query);

        // 30 × 0.9 off-peak.
        assert_eq!(estimate.minutes, 27);
    }

    #[test]
    fn all_routes_query_is_rejected_by_try_estimate() {
        let engine = engine(EstimationMode::Ensemble);
        let query = Query::conditions(8, DayType::Weekday, Weather::Clear, Season::Regular)
            .expect("valid query");

        assert!(matches!(engine.try_estimate(&query), Err(AppError::InvalidQuery(_))));
    }

    #[test]
    fn cached_prediction_is_reused_until_cleared() {
        let engine = engine(EstimationMode::Ensemble);
        let first = engine.estimate(&query(8));

        assert_eq!(engine.cache.len().expect("len"), 1);
        assert_eq!(engine.estimate(&query(8)), first);

        engine.clear_cache();
        assert_eq!(engine.cache.len().expect("len"), 0);
    }

    #[test]
    fn comparison_is_sorted_fastest_first() -> Result<(), AppError> {
        let engine = engine(EstimationMode::Ensemble);
        let query = Query::conditions(8, DayType::Weekday, Weather::Clear, Season::Regular)?;

        let comparison = engine.compare_all_routes(&query)?;

        assert_eq!(comparison.predictions.len(), 6);
        assert!(
            comparison
                .predictions
                .windows(2)
                .all(|pair| pair[0].minutes <= pair[1].minutes)
        );
        assert_eq!(comparison.best_route, comparison.predictions[0].route_id);
        Ok(())
    }
}
