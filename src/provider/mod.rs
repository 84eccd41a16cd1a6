//! Historical-data collaborator consumed by the prediction engine and the
//! optimizer.
//!
//! Storage is someone else's problem: implementors only answer synchronous
//! read queries. [`memory::InMemoryProvider`] is the implementation shipped
//! with the crate.

use crate::analytics::RouteAnalytics;
use crate::domain::{Observation, Query, RouteMeta};
use crate::error::AppError;

pub mod memory;

/// Exact matches needed before the broader hour window is skipped.
pub const EXACT_MATCH_MIN: usize = 5;
pub const EXACT_MATCH_LIMIT: usize = 50;
pub const BROAD_MATCH_LIMIT: usize = 100;
/// Lookback used for variability when the caller gives none.
pub const VARIABILITY_LOOKBACK_DAYS: u32 = 30;

pub trait TrafficDataProvider {
    /// Records similar to `query` from the last `lookback_days`, newest first.
    fn similar_observations(&self, query: &Query, lookback_days: u32) -> Result<Vec<Observation>, AppError>;

    fn route_metadata(&self, route_id: &str) -> Result<Option<RouteMeta>, AppError>;

    fn list_routes(&self) -> Result<Vec<RouteMeta>, AppError>;

    /// Every record for one route from the last `lookback_days`, oldest first.
    fn route_observations(&self, route_id: &str, lookback_days: u32) -> Result<Vec<Observation>, AppError>;

    fn route_analytics(&self, route_id: &str, lookback_days: u32) -> Result<Option<RouteAnalytics>, AppError> {
        let observations = self.route_observations(route_id, lookback_days)?;
        Ok(RouteAnalytics::from_observations(route_id, &observations))
    }

    /// Percentage spread of recent travel times, `None` for unknown routes.
    fn route_variability(&self, route_id: &str) -> Result<Option<f64>, AppError> {
        Ok(self
            .route_analytics(route_id, VARIABILITY_LOOKBACK_DAYS)?
            .and_then(|analytics| analytics.variability()))
    }
}

impl<T: TrafficDataProvider + ?Sized> TrafficDataProvider for &T {
    fn similar_observations(&self, query: &Query, lookback_days: u32) -> Result<Vec<Observation>, AppError> {
        (**self).similar_observations(query, lookback_days)
    }

    fn route_metadata(&self, route_id: &str) -> Result<Option<RouteMeta>, AppError> {
        (**self).route_metadata(route_id)
    }

    fn list_routes(&self) -> Result<Vec<RouteMeta>, AppError> {
        (**self).list_routes()
    }

    fn route_observations(&self, route_id: &str, lookback_days: u32) -> Result<Vec<Observation>, AppError> {
        (**self).route_observations(route_id, lookback_days)
    }

    fn route_analytics(&self, route_id: &str, lookback_days: u32) -> Result<Option<RouteAnalytics>, AppError> {
        (**self).route_analytics(route_id, lookback_days)
    }

    fn route_variability(&self, route_id: &str) -> Result<Option<f64>, AppError> {
        (**self).route_variability(route_id)
    }
}

/// Picks the records matching `query` out of one route's history.
///
/// Exact matches on day type, hour, weather and season win when there are at
/// least [`EXACT_MATCH_MIN`] of them; otherwise the same day type within one
/// hour either side. Input order is preserved, so callers pass newest first.
pub fn select_similar<'a>(
    query: &Query,
    candidates: impl IntoIterator<Item = &'a Observation> + Clone,
) -> Vec<Observation> {
    let route_matches = |o: &&Observation| o.route_id == query.route_id() && o.day_type == query.day_type();

    let exact: Vec<Observation> = candidates
        .clone()
        .into_iter()
        .filter(route_matches)
        .filter(|o| o.hour == query.hour() && o.weather == query.weather() && o.season == query.season())
        .take(EXACT_MATCH_LIMIT)
        .cloned()
        .collect();
    if exact.len() >= EXACT_MATCH_MIN {
        return exact;
    }

    candidates
        .into_iter()
        .filter(route_matches)
        .filter(|o| o.hour.abs_diff(query.hour()) <= 1)
        .take(BROAD_MATCH_LIMIT)
        .cloned()
        .collect()
}
