//! Confidence-weighted combination of the individual estimators.

use crate::estimation::model::{
    EstimationContext, Estimator, MethodEstimate, plain_mean,
};
use crate::estimation::moving_average::MovingAverageModel;
use crate::estimation::recency_weighted::RecencyWeightedModel;
use crate::estimation::regression::RegressionModel;
use crate::estimation::seasonal::SeasonalModel;
use tracing::debug;

/// Returned when there is nothing at all to combine.
pub const LAST_RESORT: MethodEstimate = MethodEstimate {
    minutes: 30.0,
    confidence: 0.1,
};
pub const MAX_ENSEMBLE_CONFIDENCE: f64 = 0.95;
const ENSEMBLE_BOOST: f64 = 1.1;
const MIN_AGREEMENT: f64 = 0.1;

/// Combined answer plus the factor strings describing how it was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleOutcome {
    pub estimate: MethodEstimate,
    pub components: Vec<MethodEstimate>,
    pub factors: Vec<String>,
}

#[derive(Debug)]
pub struct Ensemble {
    estimators: Vec<Box<dyn Estimator>>,
}

impl Default for Ensemble {
    fn default() -> Self {
        Self::new(vec![
            Box::new(MovingAverageModel::default()),
            Box::new(RecencyWeightedModel::default()),
            Box::new(SeasonalModel::default()),
            Box::new(RegressionModel::default()),
        ])
    }
}

impl Ensemble {
    pub fn new(estimators: Vec<Box<dyn Estimator>>) -> Self {
        Self { estimators }
    }

    /// Runs every estimator, substituting the plain mean for failures, and
    /// combines the results. Never fails.
    pub fn run(&self, ctx: &EstimationContext<'_>) -> EnsembleOutcome {
        let mut components = Vec::with_capacity(self.estimators.len());
        let mut factors = Vec::with_capacity(self.estimators.len() + 1);

        for estimator in &self.estimators {
            match estimator.estimate(ctx) {
                Ok(estimate) if estimate.minutes.is_finite() && estimate.confidence.is_finite() => {
                    components.push(estimate);
                    factors.push(estimator.name().to_string());
                }
                Ok(_) => {
                    debug!(method = estimator.name(), "Discarding non-finite estimate");
                }
                Err(failure) => {
                    debug!(method = estimator.name(), %failure, "Estimator fell back to historical mean");
                    if let Ok(minutes) = plain_mean(ctx.observations) {
                        components.push(MethodEstimate::new(minutes, failure.fallback_confidence()));
                        factors.push(format!("{} (historical mean fallback)", estimator.name()));
                    }
                }
            }
        }

        let estimate = combine(&components);
        factors.push(format!("Ensemble of {} models", components.len()));

        EnsembleOutcome {
            estimate,
            components,
            factors,
        }
    }
}

/// Confidence²-weighted mean of minutes; confidence shrinks when the
/// components disagree.
pub fn combine(components: &[MethodEstimate]) -> MethodEstimate {
    if components.is_empty() {
        return LAST_RESORT;
    }

    let n = components.len() as f64;
    let mean_minutes = components.iter().map(|c| c.minutes).sum::<f64>() / n;
    let mean_confidence = components.iter().map(|c| c.confidence).sum::<f64>() / n;

    let (weighted_sum, weight_total) = components.iter().fold((0.0, 0.0), |(sum, total), c| {
        let weight = c.confidence * c.confidence;
        (sum + c.minutes * weight, total + weight)
    });
    let minutes = if weight_total > 0.0 {
        weighted_sum / weight_total
    } else {
        mean_minutes
    };

    let agreement = if mean_minutes > 0.0 {
        let variance = components
            .iter()
            .map(|c| (c.minutes - mean_minutes).powi(2))
            .sum::<f64>()
            / n;
        (1.0 - variance.sqrt() / mean_minutes).max(MIN_AGREEMENT)
    } else {
        MIN_AGREEMENT
    };

    let confidence = (mean_confidence * agreement * ENSEMBLE_BOOST).min(MAX_ENSEMBLE_CONFIDENCE);

    MethodEstimate::new(minutes, confidence)
}
