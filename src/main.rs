use commute_forecast::analytics::{hourly_profile, off_peak_hours, peak_hours};
use commute_forecast::config::{self, Config};
use commute_forecast::domain::{DayType, Query, Season, Weather};
use commute_forecast::estimation::PredictionEngine;
use commute_forecast::optimizer::{OptimizerSettings, RouteOptimizer};
use commute_forecast::provider::TrafficDataProvider;
use commute_forecast::provider::memory::{InMemoryProvider, load_observations_from_path};
use tracing::Level;

fn init_tracing(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_default();
    init_tracing(
        config
            .as_ref()
            .map_or(config::DEFAULT_LOG_LEVEL, |config| config.log_level()),
    );
    tracing::info!(config_path = config::DEFAULT_CONFIG_PATH, "commute-forecast starting");
    let config = match config {
        Ok(config) => Some(config),
        Err(err) => {
            tracing::warn!(error = %err, "Failed to load config, using defaults");
            None
        }
    };

    let mut provider = InMemoryProvider::with_default_routes();
    match config.as_ref().and_then(Config::observations_path) {
        Some(path) => match load_observations_from_path(path) {
            Ok(observations) => {
                tracing::info!(path = %path.display(), count = observations.len(), "Observations loaded");
                provider.extend_observations(observations);
            }
            Err(err) => tracing::warn!(error = %err, "Failed to load observations, starting without history"),
        },
        None => tracing::info!("No observations path configured, using route metadata only"),
    }

    let engine_settings = config.as_ref().map(Config::engine_settings).unwrap_or_default();
    let optimizer_settings = config
        .as_ref()
        .map(Config::optimizer_settings)
        .unwrap_or_else(OptimizerSettings::default);
    let engine = PredictionEngine::new(provider, engine_settings);

    let conditions = Query::conditions(8, DayType::Weekday, Weather::Clear, Season::Regular)?;
    let comparison = engine.compare_all_routes(&conditions)?;
    for estimate in &comparison.predictions {
        tracing::info!(
            route = %estimate.route_id,
            minutes = estimate.minutes,
            confidence = estimate.confidence,
            "Route prediction"
        );
    }
    for line in &comparison.recommendations {
        tracing::info!("{line}");
    }

    let history = engine
        .provider()
        .route_observations(&comparison.best_route, engine.settings().lookback_days)?;
    let profile = hourly_profile(&history);
    tracing::info!(
        route = %comparison.best_route,
        peak = ?peak_hours(&profile),
        off_peak = ?off_peak_hours(&profile),
        "Traffic pattern"
    );

    let optimizer = RouteOptimizer::new(&engine, optimizer_settings);
    let departure = optimizer.optimize_departure_window(&comparison.best_route, 9, &conditions, 60);
    tracing::info!(
        route = %departure.route_id,
        departure = %departure.optimal.departure,
        arrival = %departure.optimal.expected_arrival,
        "Suggested departure for a 09:00 arrival"
    );

    Ok(())
}
