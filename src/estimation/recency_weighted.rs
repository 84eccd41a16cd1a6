//! Recency- and similarity-weighted historical average.
//!
//! Weight per observation: `exp(-age_days / decay_days)` times a similarity
//! multiplier over hour distance, day type, weather and season.

use crate::domain::{Observation, Query};
use crate::estimation::model::{EstimationContext, EstimationFailure, Estimator, MethodEstimate};
use time::OffsetDateTime;

#[derive(Debug, Clone)]
pub struct RecencyWeightedParams {
    pub decay_days: f64,
    pub same_hour: f64,
    pub adjacent_hour: f64,
    pub near_hour: f64,
    pub day_type_match: f64,
    pub weather_match: f64,
    pub season_match: f64,
}

impl Default for RecencyWeightedParams {
    fn default() -> Self {
        Self {
            decay_days: 30.0,
            same_hour: 2.0,
            adjacent_hour: 1.5,
            near_hour: 1.2,
            day_type_match: 1.8,
            weather_match: 1.6,
            season_match: 1.3,
        }
    }
}

#[derive(Debug, Default)]
pub struct RecencyWeightedModel {
    pub params: RecencyWeightedParams,
}

impl RecencyWeightedModel {
    pub fn new(params: RecencyWeightedParams) -> Self {
        Self { params }
    }

    fn time_weight(&self, observation: &Observation, now: OffsetDateTime) -> f64 {
        // Future-dated records count as fresh.
        let age_days = (now - observation.timestamp).whole_days().max(0) as f64;
        (-age_days / self.params.decay_days).exp()
    }

    fn similarity(&self, observation: &Observation, query: &Query) -> f64 {
        let params = &self.params;
        let mut weight = match observation.hour.abs_diff(query.hour()) {
            0 => params.same_hour,
            1 => params.adjacent_hour,
            2 => params.near_hour,
            _ => 1.0,
        };
        if observation.day_type == query.day_type() {
            weight *= params.day_type_match;
        }
        if observation.weather == query.weather() {
            weight *= params.weather_match;
        }
        if observation.season == query.season() {
            weight *= params.season_match;
        }
        weight
    }
}

impl Estimator for RecencyWeightedModel {
    fn name(&self) -> &'static str {
        "Weighted historical average"
    }

    fn estimate(&self, ctx: &EstimationContext<'_>) -> Result<MethodEstimate, EstimationFailure> {
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;

        for observation in ctx.observations {
            let weight = self.time_weight(observation, ctx.now) * self.similarity(observation, ctx.query);
            weighted_sum += observation.travel_time_minutes * weight;
            weight_total += weight;
        }

        if !(weight_total > 0.0) || !weighted_sum.is_finite() {
            return Err(EstimationFailure::Degenerate("zero total weight"));
        }

        let n = ctx.observations.len() as f64;
        Ok(MethodEstimate::new(
            weighted_sum / weight_total,
            (0.5 + n / 50.0).min(0.9),
        ))
    }
}
