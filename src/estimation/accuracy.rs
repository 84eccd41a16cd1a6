//! Hold-out accuracy check: predict each route's most recent records from
//! the older ones and compare against what actually happened.

use crate::domain::Query;
use crate::error::AppError;
use crate::estimation::PredictionEngine;
use crate::provider::{TrafficDataProvider, select_similar};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Routes with fewer recent records are skipped.
pub const MIN_EVALUATION_RECORDS: usize = 10;
const TRAINING_SHARE: f64 = 0.8;
const WITHIN_TOLERANCE: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionMetrics {
    pub mae: f64,
    pub rmse: f64,
    /// Percent.
    pub mape: f64,
    /// Percent of predictions within 20% of the actual time.
    pub accuracy_score: f64,
    pub confidence_level: f64,
    pub evaluated: usize,
}

impl PredictionMetrics {
    /// `None` when there is nothing to compare or an actual time is not positive.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Option<Self> {
        if pairs.is_empty() || pairs.iter().any(|(actual, _)| !(*actual > 0.0)) {
            return None;
        }
        let n = pairs.len() as f64;
        let mae = pairs.iter().map(|(a, p)| (a - p).abs()).sum::<f64>() / n;
        let rmse = (pairs.iter().map(|(a, p)| (a - p).powi(2)).sum::<f64>() / n).sqrt();
        let relative: Vec<f64> = pairs.iter().map(|(a, p)| ((a - p) / a).abs()).collect();
        let mape = relative.iter().sum::<f64>() / n * 100.0;
        let accuracy_score =
            relative.iter().filter(|error| **error <= WITHIN_TOLERANCE).count() as f64 / n * 100.0;

        Some(Self {
            mae,
            rmse,
            mape,
            accuracy_score,
            confidence_level: (accuracy_score / 100.0).min(0.95),
            evaluated: pairs.len(),
        })
    }
}

impl<P: TrafficDataProvider> PredictionEngine<P> {
    /// Per-route metrics over the last `lookback_days`. The newest 20% of each
    /// route's records are predicted from similar records in the older 80%.
    pub fn evaluate_accuracy(&self, lookback_days: u32) -> Result<BTreeMap<String, PredictionMetrics>, AppError> {
        let mut results = BTreeMap::new();

        for route in self.provider().list_routes()? {
            let history = self.provider().route_observations(&route.id, lookback_days)?;
            if history.len() < MIN_EVALUATION_RECORDS {
                continue;
            }

            let split = (history.len() as f64 * TRAINING_SHARE) as usize;
            let (training, held_out) = history.split_at(split);

            let mut pairs = Vec::with_capacity(held_out.len());
            for record in held_out {
                let query = match Query::new(
                    route.id.clone(),
                    record.hour,
                    record.day_type,
                    record.weather,
                    record.season,
                ) {
                    Ok(query) => query,
                    Err(err) => {
                        warn!(route = %route.id, error = %err, "Skipping malformed record");
                        continue;
                    }
                };
                let similar = select_similar(&query, training.iter().rev());
                let estimate = self.estimate_with(&query, &similar);
                pairs.push((record.travel_time_minutes, f64::from(estimate.minutes)));
            }

            if let Some(metrics) = PredictionMetrics::from_pairs(&pairs) {
                results.insert(route.id.clone(), metrics);
            }
        }

        info!(routes = results.len(), "Evaluated prediction accuracy");
        Ok(results)
    }
}
