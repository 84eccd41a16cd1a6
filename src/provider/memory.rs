use crate::clock::{Clock, SystemClock};
use crate::domain::{Observation, Query, RouteMeta};
use crate::error::AppError;
use crate::provider::{TrafficDataProvider, select_similar};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::info;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read observations: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse observations: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Reads a JSON array of observations.
pub fn load_observations_from_path(path: impl AsRef<Path>) -> Result<Vec<Observation>, DataError> {
    let contents = std::fs::read_to_string(path)?;
    let observations: Vec<Observation> = serde_json::from_str(&contents)?;
    Ok(observations)
}

/// The commute routes the system ships with.
pub fn default_routes() -> Vec<RouteMeta> {
    [
        ("High Level Road", 12.5, 35.0),
        ("Low Level Road", 14.2, 30.0),
        ("Baseline Road", 13.8, 32.0),
        ("Galle Road", 15.1, 28.0),
        ("Marine Drive", 16.3, 25.0),
        ("Other Roads", 11.8, 20.0),
    ]
    .into_iter()
    .map(|(id, distance_km, speed_kmh)| RouteMeta::new(id, distance_km, speed_kmh, "main"))
    .collect()
}

/// Provider backed by plain vectors.
#[derive(Debug, Clone)]
pub struct InMemoryProvider {
    routes: Vec<RouteMeta>,
    observations: Vec<Observation>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl InMemoryProvider {
    pub fn new(routes: Vec<RouteMeta>) -> Self {
        Self {
            routes,
            observations: Vec::new(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_default_routes() -> Self {
        Self::new(default_routes())
    }

    /// Uses `clock` as "now" for lookback windows.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn add_route(&mut self, route: RouteMeta) {
        self.routes.retain(|existing| existing.id != route.id);
        self.routes.push(route);
    }

    pub fn add_observation(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    pub fn extend_observations(&mut self, observations: impl IntoIterator<Item = Observation>) {
        let before = self.observations.len();
        self.observations.extend(observations);
        info!(added = self.observations.len() - before, total = self.observations.len(), "Observations loaded");
    }

    pub fn observation_count(&self) -> usize {
        self.observations.len()
    }

    fn cutoff(&self, lookback_days: u32) -> OffsetDateTime {
        self.clock.now() - Duration::days(i64::from(lookback_days))
    }

    /// Records for `route_id` newer than the lookback cutoff, newest first.
    fn recent_for_route(&self, route_id: &str, lookback_days: u32) -> Vec<&Observation> {
        let cutoff = self.cutoff(lookback_days);
        let mut recent: Vec<&Observation> = self
            .observations
            .iter()
            .filter(|o| o.route_id == route_id && o.timestamp >= cutoff)
            .collect();
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        recent
    }
}

impl TrafficDataProvider for InMemoryProvider {
    fn similar_observations(&self, query: &Query, lookback_days: u32) -> Result<Vec<Observation>, AppError> {
        let recent = self.recent_for_route(query.route_id(), lookback_days);
        Ok(select_similar(query, recent.iter().copied()))
    }

    fn route_metadata(&self, route_id: &str) -> Result<Option<RouteMeta>, AppError> {
        Ok(self.routes.iter().find(|route| route.id == route_id).cloned())
    }

    fn list_routes(&self) -> Result<Vec<RouteMeta>, AppError> {
        Ok(self.routes.clone())
    }

    fn route_observations(&self, route_id: &str, lookback_days: u32) -> Result<Vec<Observation>, AppError> {
        let mut recent: Vec<Observation> = self
            .recent_for_route(route_id, lookback_days)
            .into_iter()
            .cloned()
            .collect();
        recent.reverse();
        Ok(recent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::estimation::fixtures::{NOW, observation, query};
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn provider() -> InMemoryProvider {
        InMemoryProvider::with_default_routes().with_clock(Arc::new(ManualClock::new(NOW)))
    }

    fn temp_path(tag: &str) -> Result<std::path::PathBuf, Box<dyn std::error::Error>> {
        let unique = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        Ok(std::env::temp_dir().join(format!("commute-observations-{tag}-{unique}.json")))
    }

    #[test]
    fn default_catalogue_has_six_main_routes() -> Result<(), AppError> {
        let routes = provider().list_routes()?;

        assert_eq!(routes.len(), 6);
        assert!(routes.iter().all(RouteMeta::is_arterial));
        Ok(())
    }

    #[test]
    fn similar_observations_respect_lookback_and_order() -> Result<(), AppError> {
        let mut provider = provider();
        provider.extend_observations([
            observation(100, 8, 99.0),
            observation(3, 8, 33.0),
            observation(1, 8, 31.0),
            observation(2, 8, 32.0),
        ]);

        let similar = provider.similar_observations(&query(8), 90)?;

        let minutes: Vec<f64> = similar.iter().map(|o| o.travel_time_minutes).collect();
        assert_eq!(minutes, vec![31.0, 32.0, 33.0]);
        Ok(())
    }

    #[test]
    fn route_observations_are_oldest_first() -> Result<(), AppError> {
        let mut provider = provider();
        provider.extend_observations([observation(1, 8, 31.0), observation(5, 8, 35.0)]);

        let history = provider.route_observations("High Level Road", 30)?;

        assert_eq!(history[0].travel_time_minutes, 35.0);
        assert_eq!(provider.route_variability("Galle Road")?, None);
        assert!(provider.route_variability("High Level Road")?.is_some());
        Ok(())
    }

    #[test]
    fn loads_observations_from_json() -> Result<(), Box<dyn std::error::Error>> {
        let path = temp_path("valid")?;
        let records = vec![observation(1, 8, 31.0), observation(2, 17, 44.0)];
        fs::write(&path, serde_json::to_string(&records)?)?;

        let loaded = load_observations_from_path(&path);
        let _ = fs::remove_file(&path);

        let loaded = loaded?;
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].timestamp, records[1].timestamp);
        assert_eq!(loaded[1].travel_time_minutes, 44.0);
        assert_eq!(loaded[1].hour, 17);
        Ok(())
    }

    #[test]
    fn minimal_json_record_fills_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let path = temp_path("minimal")?;
        fs::write(
            &path,
            r#"[{
                "route_id": "Galle Road",
                "timestamp": "2024-03-01T08:10:00Z",
                "travel_time_minutes": 41.0,
                "distance_km": 15.1,
                "hour": 8,
                "day_of_week": 4,
                "day_type": "weekday",
                "weather": "heavy_rain",
                "season": "school_holiday"
            }]"#,
        )?;

        let loaded = load_observations_from_path(&path);
        let _ = fs::remove_file(&path);
        let loaded = loaded?;

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].traffic_density, crate::domain::TrafficDensity::Moderate);
        assert_eq!(loaded[0].average_speed_kmh, 0.0);
        Ok(())
    }

    #[test]
    fn malformed_json_is_a_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let path = temp_path("invalid")?;
        fs::write(&path, "[{ not json")?;

        let result = load_observations_from_path(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(DataError::Parse(_))));
        Ok(())
    }
}
