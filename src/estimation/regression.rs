//! Ordinary least squares over calendar and condition features.
//!
//! Features: bias, hour, day of week, weekend flag, wet-weather flag and
//! school-holiday flag. Coefficients come from the normal equations
//! `(XᵀX) θ = Xᵀy`, solved by Gaussian elimination with partial pivoting.

use crate::domain::{DayType, MIN_TRAVEL_MINUTES, Observation, Season};
use crate::estimation::model::{
    EstimationContext, EstimationFailure, Estimator, MethodEstimate, plain_mean,
};

const FEATURES: usize = 6;
/// Pivots below this fraction of the largest matrix entry count as zero.
const SINGULAR_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct RegressionParams {
    pub min_samples: usize,
}

impl Default for RegressionParams {
    fn default() -> Self {
        Self { min_samples: 5 }
    }
}

#[derive(Debug, Default)]
pub struct RegressionModel {
    pub params: RegressionParams,
}

impl RegressionModel {
    pub fn new(params: RegressionParams) -> Self {
        Self { params }
    }
}

fn features(
    hour: u8,
    day_of_week: u8,
    day_type: DayType,
    wet: bool,
    season: Season,
) -> [f64; FEATURES] {
    [
        1.0,
        hour as f64,
        day_of_week as f64,
        if day_type == DayType::Weekend { 1.0 } else { 0.0 },
        if wet { 1.0 } else { 0.0 },
        if season == Season::SchoolHoliday { 1.0 } else { 0.0 },
    ]
}

fn observation_features(observation: &Observation) -> [f64; FEATURES] {
    features(
        observation.hour,
        observation.day_of_week,
        observation.day_type,
        observation.weather.is_wet(),
        observation.season,
    )
}

fn dot(a: &[f64; FEATURES], b: &[f64; FEATURES]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Solves `matrix · x = rhs` in place.
fn solve(
    mut matrix: [[f64; FEATURES]; FEATURES],
    mut rhs: [f64; FEATURES],
) -> Result<[f64; FEATURES], EstimationFailure> {
    let scale = matrix
        .iter()
        .flatten()
        .fold(0.0_f64, |max, value| max.max(value.abs()))
        .max(1.0);

    for col in 0..FEATURES {
        let pivot_row = (col..FEATURES)
            .max_by(|&a, &b| matrix[a][col].abs().total_cmp(&matrix[b][col].abs()))
            .unwrap_or(col);
        if matrix[pivot_row][col].abs() <= SINGULAR_TOLERANCE * scale {
            return Err(EstimationFailure::SingularMatrix);
        }
        matrix.swap(col, pivot_row);
        rhs.swap(col, pivot_row);

        for row in col + 1..FEATURES {
            let factor = matrix[row][col] / matrix[col][col];
            for k in col..FEATURES {
                matrix[row][k] -= factor * matrix[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut solution = [0.0; FEATURES];
    for row in (0..FEATURES).rev() {
        let tail: f64 = (row + 1..FEATURES).map(|k| matrix[row][k] * solution[k]).sum();
        solution[row] = (rhs[row] - tail) / matrix[row][row];
    }

    if solution.iter().all(|value| value.is_finite()) {
        Ok(solution)
    } else {
        Err(EstimationFailure::SingularMatrix)
    }
}

impl Estimator for RegressionModel {
    fn name(&self) -> &'static str {
        "Statistical regression"
    }

    fn estimate(&self, ctx: &EstimationContext<'_>) -> Result<MethodEstimate, EstimationFailure> {
        let n = ctx.observations.len();
        if n < self.params.min_samples {
            return Err(EstimationFailure::InsufficientData {
                needed: self.params.min_samples,
                available: n,
            });
        }

        let rows: Vec<[f64; FEATURES]> = ctx.observations.iter().map(observation_features).collect();
        let targets: Vec<f64> = ctx.observations.iter().map(|o| o.travel_time_minutes).collect();

        let mut xtx = [[0.0; FEATURES]; FEATURES];
        let mut xty = [0.0; FEATURES];
        for (row, &target) in rows.iter().zip(&targets) {
            for i in 0..FEATURES {
                xty[i] += row[i] * target;
                for j in 0..FEATURES {
                    xtx[i][j] += row[i] * row[j];
                }
            }
        }

        let theta = solve(xtx, xty)?;

        let query = ctx.query;
        let query_features = features(
            query.hour(),
            ctx.weekday(),
            query.day_type(),
            query.weather().is_wet(),
            query.season(),
        );
        let prediction = dot(&theta, &query_features).max(MIN_TRAVEL_MINUTES as f64);

        let target_mean = plain_mean(ctx.observations)?;
        let ss_res: f64 = rows
            .iter()
            .zip(&targets)
            .map(|(row, target)| (target - dot(&theta, row)).powi(2))
            .sum();
        let ss_tot: f64 = targets.iter().map(|target| (target - target_mean).powi(2)).sum();
        let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

        Ok(MethodEstimate::new(prediction, r_squared.clamp(0.2, 0.8)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::fixtures::{NOW, constant_series, observation, query};

    #[test]
    fn too_few_samples_is_insufficient() {
        let observations = constant_series(4, 8, 30.0);
        let query = query(8);
        let ctx = EstimationContext {
            query: &query,
            observations: &observations,
            now: NOW,
        };

        let result = RegressionModel::default().estimate(&ctx);

        assert_eq!(
            result,
            Err(EstimationFailure::InsufficientData {
                needed: 5,
                available: 4
            })
        );
    }

    #[test]
    fn constant_features_are_singular() {
        // Every record shares hour and flags, so the hour column equals 8 × bias.
        let observations = constant_series(20, 8, 30.0);
        let query = query(8);
        let ctx = EstimationContext {
            query: &query,
            observations: &observations,
            now: NOW,
        };

        let result = RegressionModel::default().estimate(&ctx);

        assert_eq!(result, Err(EstimationFailure::SingularMatrix));
    }

    #[test]
    fn solve_recovers_known_coefficients() {
        let mut matrix = [[0.0; FEATURES]; FEATURES];
        for (i, row) in matrix.iter_mut().enumerate() {
            row[i] = (i + 1) as f64;
        }
        matrix[0][1] = 0.5;
        let expected = [1.0, -2.0, 0.5, 3.0, 0.0, 4.0];
        let mut rhs = [0.0; FEATURES];
        for i in 0..FEATURES {
            rhs[i] = (0..FEATURES).map(|j| matrix[i][j] * expected[j]).sum();
        }

        let solution = solve(matrix, rhs).expect("solvable");

        for (got, want) in solution.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9);
        }
    }

    #[test]
    fn fitted_model_floors_at_minimum() {
        // Travel time falls linearly with hour; the query hour lands far below 15.
        let mut observations = Vec::new();
        for days_ago in 1..=14_i64 {
            for hour in [6_u8, 8, 10, 12] {
                let mut record = observation(days_ago, hour, 60.0 - 4.0 * hour as f64);
                if days_ago % 3 == 0 {
                    record.day_type = DayType::Weekend;
                }
                if (days_ago + hour as i64 / 2) % 2 == 0 {
                    record.weather = crate::domain::Weather::Rainy;
                }
                if days_ago > 7 {
                    record.season = Season::SchoolHoliday;
                }
                observations.push(record);
            }
        }
        let query = query(23);
        let ctx = EstimationContext {
            query: &query,
            observations: &observations,
            now: NOW,
        };

        let estimate = RegressionModel::default().estimate(&ctx).expect("estimate");

        assert_eq!(estimate.minutes, MIN_TRAVEL_MINUTES as f64);
        assert!((estimate.confidence - 0.8).abs() < 1e-9);
    }
}
