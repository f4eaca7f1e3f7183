//! Randomized service and arrival durations.
//!
//! Durations are drawn from a normal distribution centred on the requested
//! mean with a standard deviation of [`STD_DEV_RATIO`] × mean, then floored at
//! [`MIN_DURATION`]. Only the mean and the floor are load-bearing.

use std::f64::consts::PI;
use std::time::Duration;

use rand::Rng;

/// Standard deviation as a fraction of the mean.
pub const STD_DEV_RATIO: f64 = 0.2;

/// No sampled duration is ever shorter than this.
pub const MIN_DURATION: Duration = Duration::from_millis(100);

/// Draw one duration around `mean`.
///
/// Each call takes a fresh draw from the calling thread's generator, so
/// concurrent callers never share mutable random state. A zero mean yields
/// [`MIN_DURATION`].
pub fn sample(mean: Duration) -> Duration {
    // Saturates for means near `Duration::MAX`.
    Duration::try_from_secs_f64(sample_secs(mean.as_secs_f64())).unwrap_or(Duration::MAX)
}

fn sample_secs(mean: f64) -> f64 {
    let mut rng = rand::thread_rng();
    // Box-Muller; u1 in (0, 1] keeps ln() finite.
    let u1: f64 = 1.0 - rng.gen_range(0.0..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).sin();

    let value = mean + STD_DEV_RATIO * mean * z;
    value.max(MIN_DURATION.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empirical_mean_tracks_requested_mean() {
        let mean = Duration::from_secs(5);
        let n = 10_000;
        let total: f64 = (0..n).map(|_| sample(mean).as_secs_f64()).sum();
        let empirical = total / n as f64;

        assert!(
            (empirical - 5.0).abs() <= 0.25,
            "empirical mean {empirical} outside 5% of 5.0"
        );
    }

    #[test]
    fn never_below_floor() {
        let min = (0..10_000)
            .map(|_| sample(Duration::from_secs(5)))
            .min()
            .unwrap();
        assert!(min >= MIN_DURATION);
    }

    #[test]
    fn tiny_mean_is_floored() {
        // Box-Muller on f64 inputs keeps |z| under 9, so 10ms never clears the floor.
        for _ in 0..1_000 {
            assert_eq!(sample(Duration::from_millis(10)), MIN_DURATION);
        }
    }

    #[test]
    fn huge_mean_saturates() {
        let samples: Vec<Duration> = (0..1_000).map(|_| sample(Duration::MAX)).collect();
        assert!(samples.iter().all(|d| *d >= MIN_DURATION));
        // Any draw above the mean overflows, so roughly half saturate.
        assert!(samples.contains(&Duration::MAX));
    }

    #[test]
    fn zero_mean_yields_floor() {
        assert_eq!(sample(Duration::ZERO), MIN_DURATION);
    }

    #[test]
    fn spread_is_roughly_twenty_percent() {
        let n = 10_000;
        let samples: Vec<f64> = (0..n)
            .map(|_| sample(Duration::from_secs(10)).as_secs_f64())
            .collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;
        let sd = var.sqrt();
        assert!((1.6..=2.4).contains(&sd), "std dev {sd} far from 2.0");
    }

    #[test]
    fn concurrent_callers_each_get_valid_samples() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    (0..1_000)
                        .map(|_| sample(Duration::from_secs(5)))
                        .all(|d| d >= MIN_DURATION)
                })
            })
            .collect();

        for h in handles {
            assert!(h.join().unwrap());
        }
    }
}
