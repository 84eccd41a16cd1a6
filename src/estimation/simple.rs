//! Single-path estimate: trimmed or plain mean depending on how much history
//! there is, blended with the route's base time when history is thin.

use crate::domain::Observation;
use crate::estimation::model::{MethodEstimate, mean};

const TRIMMED_MEAN_MIN: usize = 10;
const PLAIN_MEAN_MIN: usize = 3;

/// Raw `(minutes, confidence)` plus a factor describing the path taken.
///
/// `base` is only evaluated when fewer than [`PLAIN_MEAN_MIN`] usable records
/// are present. The result still has to go through the condition chain.
pub fn simple_estimate(
    observations: &[Observation],
    base: impl FnOnce() -> f64,
) -> (MethodEstimate, String) {
    let mut times: Vec<f64> = observations
        .iter()
        .filter(|observation| observation.is_usable())
        .map(|observation| observation.travel_time_minutes)
        .collect();
    let n = times.len();

    if n >= TRIMMED_MEAN_MIN {
        times.sort_by(f64::total_cmp);
        let trim = n / 10;
        if let Ok(minutes) = mean(times[trim..n - trim].iter().copied()) {
            return (
                MethodEstimate::new(minutes, (0.5 + n as f64 * 0.02).min(0.9)),
                format!("Trimmed mean of {n} historical records"),
            );
        }
    }

    if n >= PLAIN_MEAN_MIN {
        if let Ok(minutes) = mean(times.iter().copied()) {
            return (
                MethodEstimate::new(minutes, (0.3 + n as f64 * 0.05).min(0.7)),
                format!("Mean of {n} historical records"),
            );
        }
    }

    let base = base();
    match mean(times.iter().copied()) {
        Ok(historical) => (
            MethodEstimate::new((historical + base) / 2.0, 0.4),
            format!("Limited history ({n} records) blended with base estimate"),
        ),
        Err(_) => (
            MethodEstimate::new(base, 0.3),
            "No historical data, using base estimate".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::fixtures::{constant_series, observation};

    #[test]
    fn long_history_trims_outliers() {
        let mut observations = constant_series(9, 8, 30.0);
        observations.push(observation(10, 8, 300.0));

        let (estimate, factor) = simple_estimate(&observations, || unreachable!("base not needed"));

        assert!((estimate.minutes - 30.0).abs() < 1e-9);
        assert!((estimate.confidence - 0.7).abs() < 1e-12);
        assert!(factor.starts_with("Trimmed mean"));
    }

    #[test]
    fn medium_history_uses_plain_mean() {
        let observations = vec![
            observation(1, 8, 20.0),
            observation(2, 8, 30.0),
            observation(3, 8, 40.0),
        ];

        let (estimate, _) = simple_estimate(&observations, || unreachable!("base not needed"));

        assert!((estimate.minutes - 30.0).abs() < 1e-9);
        assert!((estimate.confidence - 0.45).abs() < 1e-12);
    }

    #[test]
    fn thin_history_blends_with_base() {
        let observations = vec![observation(1, 8, 40.0)];

        let (estimate, _) = simple_estimate(&observations, || 20.0);

        assert_eq!(estimate, MethodEstimate::new(30.0, 0.4));
    }

    #[test]
    fn no_history_returns_base() {
        let mut broken = observation(1, 8, 30.0);
        broken.travel_time_minutes = f64::NAN;

        let (estimate, factor) = simple_estimate(&[broken], || 25.0);

        assert_eq!(estimate, MethodEstimate::new(25.0, 0.3));
        assert_eq!(factor, "No historical data, using base estimate");
    }
}
