//! Seasonal pattern estimator.
//!
//! Starts from the overall mean and shifts it toward the mean of records at
//! the query hour and at today's weekday.

use crate::estimation::model::{
    EstimationContext, EstimationFailure, Estimator, MethodEstimate, mean, plain_mean,
};

#[derive(Debug, Clone)]
pub struct SeasonalParams {
    pub hour_weight: f64,
    pub weekday_weight: f64,
}

impl Default for SeasonalParams {
    fn default() -> Self {
        Self {
            hour_weight: 0.6,
            weekday_weight: 0.4,
        }
    }
}

#[derive(Debug, Default)]
pub struct SeasonalModel {
    pub params: SeasonalParams,
}

impl SeasonalModel {
    pub fn new(params: SeasonalParams) -> Self {
        Self { params }
    }
}

impl Estimator for SeasonalModel {
    fn name(&self) -> &'static str {
        "Seasonal pattern analysis"
    }

    fn estimate(&self, ctx: &EstimationContext<'_>) -> Result<MethodEstimate, EstimationFailure> {
        let overall = plain_mean(ctx.observations)?;

        let hour = ctx.query.hour();
        let hour_adjustment = mean(
            ctx.observations
                .iter()
                .filter(|observation| observation.hour == hour)
                .map(|observation| observation.travel_time_minutes),
        )
        .map(|hour_mean| hour_mean - overall)
        .unwrap_or(0.0);

        let weekday = ctx.weekday();
        let weekday_adjustment = mean(
            ctx.observations
                .iter()
                .filter(|observation| observation.day_of_week == weekday)
                .map(|observation| observation.travel_time_minutes),
        )
        .map(|weekday_mean| weekday_mean - overall)
        .unwrap_or(0.0);

        let n = ctx.observations.len() as f64;
        Ok(MethodEstimate::new(
            overall
                + self.params.hour_weight * hour_adjustment
                + self.params.weekday_weight * weekday_adjustment,
            (0.3 + n / 100.0).min(0.7),
        ))
    }
}
