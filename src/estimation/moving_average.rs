//! Time-series estimator: trailing simple moving averages over several windows.

use crate::domain::Observation;
use crate::estimation::model::{
    EstimationContext, EstimationFailure, Estimator, MethodEstimate, mean, plain_mean,
};

#[derive(Debug, Clone)]
pub struct MovingAverageParams {
    /// Window lengths, in observations.
    pub windows: Vec<usize>,
}

impl Default for MovingAverageParams {
    fn default() -> Self {
        Self {
            windows: vec![3, 7, 14],
        }
    }
}

#[derive(Debug, Default)]
pub struct MovingAverageModel {
    pub params: MovingAverageParams,
}

impl MovingAverageModel {
    pub fn new(params: MovingAverageParams) -> Self {
        Self { params }
    }
}

impl Estimator for MovingAverageModel {
    fn name(&self) -> &'static str {
        "Time series analysis"
    }

    fn estimate(&self, ctx: &EstimationContext<'_>) -> Result<MethodEstimate, EstimationFailure> {
        let mut series: Vec<&Observation> = ctx.observations.iter().collect();
        series.sort_by_key(|observation| observation.timestamp);
        let times: Vec<f64> = series.iter().map(|o| o.travel_time_minutes).collect();

        let window_means: Vec<f64> = self
            .params
            .windows
            .iter()
            .filter(|&&window| window > 0 && times.len() >= window)
            .filter_map(|&window| mean(times[times.len() - window..].iter().copied()).ok())
            .collect();

        if window_means.is_empty() {
            return Ok(MethodEstimate::new(plain_mean(ctx.observations)?, 0.3));
        }

        let valid = window_means.len() as f64;
        Ok(MethodEstimate::new(
            mean(window_means)?,
            (0.4 + valid * 0.1).min(0.8),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::fixtures::{NOW, constant_series, observation, query};

    #[test]
    fn all_windows_valid_for_long_series() {
        let observations = constant_series(20, 8, 30.0);
        let query = query(8);
        let ctx = EstimationContext {
            query: &query,
            observations: &observations,
            now: NOW,
        };

        let estimate = MovingAverageModel::default().estimate(&ctx).expect("estimate");

        assert!((estimate.minutes - 30.0).abs() < 1e-9);
        assert!((estimate.confidence - 0.7).abs() < 1e-12);
    }

    #[test]
    fn windows_use_most_recent_points() {
        // Oldest first in time: 10 days ago at 60 minutes, then three recent at 20.
        let observations = vec![
            observation(3, 8, 20.0),
            observation(10, 8, 60.0),
            observation(1, 8, 20.0),
            observation(2, 8, 20.0),
        ];
        let query = query(8);
        let ctx = EstimationContext {
            query: &query,
            observations: &observations,
            now: NOW,
        };

        let estimate = MovingAverageModel::default().estimate(&ctx).expect("estimate");

        assert!((estimate.minutes - 20.0).abs() < 1e-9);
        assert!((estimate.confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn short_series_falls_back_to_plain_mean() {
        let observations = vec![observation(1, 8, 20.0), observation(2, 8, 40.0)];
        let query = query(8);
        let ctx = EstimationContext {
            query: &query,
            observations: &observations,
            now: NOW,
        };

        let estimate = MovingAverageModel::default().estimate(&ctx).expect("estimate");

        assert_eq!(estimate, MethodEstimate::new(30.0, 0.3));
    }
}
