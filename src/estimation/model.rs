//! Estimator trait for the prediction ensemble.
//!
//! Each estimator turns a bag of similar-condition observations into a
//! `(minutes, confidence)` pair. Estimators report insufficient or degenerate
//! input as an [`EstimationFailure`]; the ensemble substitutes the plain
//! historical mean for them, so a failing estimator never aborts a prediction.

use crate::domain::{Observation, Query};
use std::fmt;
use thiserror::Error;
use time::OffsetDateTime;

/// One estimator's answer before rounding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodEstimate {
    pub minutes: f64,
    pub confidence: f64,
}

impl MethodEstimate {
    pub fn new(minutes: f64, confidence: f64) -> Self {
        Self { minutes, confidence }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimationFailure {
    #[error("insufficient data: need {needed} observations, have {available}")]
    InsufficientData { needed: usize, available: usize },
    #[error("normal-equation matrix is singular")]
    SingularMatrix,
    #[error("degenerate input: {0}")]
    Degenerate(&'static str),
}

impl EstimationFailure {
    /// Confidence attached to the plain-mean substitute for this failure.
    pub fn fallback_confidence(&self) -> f64 {
        match self {
            Self::SingularMatrix | Self::Degenerate(_) => 0.3,
            Self::InsufficientData { .. } => 0.2,
        }
    }
}

/// Inputs shared by every estimator for one prediction.
#[derive(Debug, Clone, Copy)]
pub struct EstimationContext<'a> {
    pub query: &'a Query,
    pub observations: &'a [Observation],
    /// Reference time for recency decay and "today's" weekday.
    pub now: OffsetDateTime,
}

impl EstimationContext<'_> {
    pub fn weekday(&self) -> u8 {
        self.now.weekday().number_days_from_monday()
    }
}

pub trait Estimator: Send + Sync + fmt::Debug {
    /// Human-readable method name, listed in the estimate's factors.
    fn name(&self) -> &'static str;

    fn estimate(&self, ctx: &EstimationContext<'_>) -> Result<MethodEstimate, EstimationFailure>;
}

/// Mean travel time over `observations`.
pub fn plain_mean(observations: &[Observation]) -> Result<f64, EstimationFailure> {
    mean(observations.iter().map(|observation| observation.travel_time_minutes))
}

pub fn mean(values: impl IntoIterator<Item = f64>) -> Result<f64, EstimationFailure> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        return Err(EstimationFailure::InsufficientData {
            needed: 1,
            available: 0,
        });
    }
    let mean = sum / count as f64;
    if mean.is_finite() {
        Ok(mean)
    } else {
        Err(EstimationFailure::Degenerate("non-finite mean"))
    }
}
