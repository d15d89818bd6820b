//! Risk computation over the live window.
//!
//! Every function here is pure: it reads samples and an evaluation instant
//! and returns numbers. State transitions live in [`crate::core::engine`].

use crate::core::window::Sample;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Scores strictly above this count as "high" for the frequency multiplier.
pub const HIGH_SCORE_CUTOFF: f64 = 0.5;

/// Maximum boost applied when every live sample is high.
pub const FREQUENCY_BOOST: f64 = 0.3;

/// Intermediate values of a risk computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskBreakdown {
    /// Number of live samples considered
    pub sample_count: usize,
    /// Recency-weighted mean score
    pub base_risk: f64,
    /// Share of live samples above [`HIGH_SCORE_CUTOFF`]
    pub frequency_ratio: f64,
    /// `1 + frequency_ratio * FREQUENCY_BOOST`
    pub multiplier: f64,
    /// `base_risk * multiplier`, clamped to `[0, 1]`
    pub final_risk: f64,
}

/// Summary statistics of the live window, reported with every decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    pub sample_count: usize,
    pub avg_score: f64,
    pub max_score: f64,
    pub min_score: f64,
    /// Final risk for the same window
    pub risk: f64,
}

/// Square-root recency weight for a sample of the given age.
///
/// Recency falls linearly from 1 (age zero) to 0 (age equal to the window)
/// and is clamped, so future timestamps weigh 1 and stale ones weigh 0.
pub fn recency_weight(age: Duration, window: Duration) -> f64 {
    let window_ms = window.num_milliseconds() as f64;
    if window_ms <= 0.0 {
        return 0.0;
    }
    let recency = 1.0 - age.num_milliseconds() as f64 / window_ms;
    recency.clamp(0.0, 1.0).sqrt()
}

/// Frequency multiplier for a given share of high samples.
pub fn frequency_multiplier(frequency_ratio: f64) -> f64 {
    1.0 + frequency_ratio * FREQUENCY_BOOST
}

/// Compute the risk breakdown for the given live samples at `now`.
///
/// An empty window yields the all-zero breakdown with a multiplier of 1.
pub fn compute_risk<'a, E: 'a>(
    samples: impl IntoIterator<Item = &'a Sample<E>>,
    now: DateTime<Utc>,
    window: Duration,
) -> RiskBreakdown {
    let mut sample_count = 0usize;
    let mut high_count = 0usize;
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for sample in samples {
        let weight = recency_weight(sample.age(now), window);
        weighted_sum += sample.score * weight;
        total_weight += weight;

        sample_count += 1;
        if sample.score > HIGH_SCORE_CUTOFF {
            high_count += 1;
        }
    }

    if sample_count == 0 {
        return RiskBreakdown {
            multiplier: 1.0,
            ..RiskBreakdown::default()
        };
    }

    let base_risk = if total_weight > 0.0 {
        weighted_sum / total_weight
    } else {
        0.0
    };
    let frequency_ratio = high_count as f64 / sample_count as f64;
    let multiplier = frequency_multiplier(frequency_ratio);

    RiskBreakdown {
        sample_count,
        base_risk,
        frequency_ratio,
        multiplier,
        final_risk: (base_risk * multiplier).clamp(0.0, 1.0),
    }
}

/// Compute window statistics, attaching an already computed final risk.
pub fn compute_stats<'a, E: 'a>(
    samples: impl IntoIterator<Item = &'a Sample<E>>,
    risk: f64,
) -> WindowStats {
    let scores: Vec<f64> = samples.into_iter().map(|s| s.score).collect();
    if scores.is_empty() {
        return WindowStats::default();
    }

    WindowStats {
        sample_count: scores.len(),
        avg_score: Statistics::mean(&scores),
        max_score: Statistics::max(&scores),
        min_score: Statistics::min(&scores),
        risk,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn aged(minutes: i64, score: f64) -> Sample<()> {
        Sample::new(now() - Duration::minutes(minutes), score, ()).unwrap()
    }

    fn window() -> Duration {
        Duration::minutes(15)
    }

    #[test]
    fn test_recency_weight_curve() {
        assert!((recency_weight(Duration::zero(), window()) - 1.0).abs() < 1e-12);
        assert!((recency_weight(Duration::minutes(3), window()) - 0.894).abs() < 1e-3);
        assert!((recency_weight(Duration::minutes(9), window()) - 0.632).abs() < 1e-3);
        assert_eq!(recency_weight(Duration::minutes(15), window()), 0.0);
        // Clamped on both ends
        assert_eq!(recency_weight(Duration::minutes(20), window()), 0.0);
        assert_eq!(recency_weight(Duration::minutes(-5), window()), 1.0);
    }

    #[test]
    fn test_sustained_high_scores_clamp_to_one() {
        let samples = [aged(0, 0.9), aged(3, 0.8), aged(9, 0.7)];
        let risk = compute_risk(&samples, now(), window());

        assert_eq!(risk.sample_count, 3);
        assert!((risk.base_risk - 0.815).abs() < 0.01);
        assert_eq!(risk.frequency_ratio, 1.0);
        assert!((risk.multiplier - 1.3).abs() < 1e-12);
        assert!(risk.base_risk * risk.multiplier > 1.0);
        assert_eq!(risk.final_risk, 1.0);
    }

    #[test]
    fn test_low_scores_get_no_boost() {
        let samples = [aged(0, 0.1), aged(5, 0.2), aged(10, 0.1)];
        let risk = compute_risk(&samples, now(), window());

        assert_eq!(risk.frequency_ratio, 0.0);
        assert_eq!(risk.multiplier, 1.0);
        assert!(risk.final_risk > 0.1 && risk.final_risk < 0.2);
        assert_eq!(risk.final_risk, risk.base_risk);
    }

    #[test]
    fn test_score_of_exactly_half_is_not_high() {
        let samples = [aged(0, 0.5), aged(1, 0.51)];
        let risk = compute_risk(&samples, now(), window());
        assert_eq!(risk.frequency_ratio, 0.5);
    }

    #[test]
    fn test_empty_window_is_zero() {
        let samples: [Sample<()>; 0] = [];
        let risk = compute_risk(&samples, now(), window());
        assert_eq!(risk.sample_count, 0);
        assert_eq!(risk.final_risk, 0.0);
        assert_eq!(risk.multiplier, 1.0);

        assert_eq!(compute_stats(&samples, 0.0), WindowStats::default());
    }

    #[test]
    fn test_all_weights_zero_gives_zero_base() {
        let samples = [aged(15, 0.9), aged(15, 0.8)];
        let risk = compute_risk(&samples, now(), window());
        assert_eq!(risk.base_risk, 0.0);
        assert_eq!(risk.final_risk, 0.0);
    }

    #[test]
    fn test_raising_a_score_never_lowers_risk() {
        let scores = [0.2, 0.45, 0.6, 0.3, 0.8];
        let ages = [0, 2, 5, 9, 13];

        for idx in 0..scores.len() {
            let mut previous = -1.0;
            for step in 0..=20 {
                let mut bumped = scores;
                bumped[idx] = step as f64 / 20.0;
                let samples: Vec<_> = ages
                    .iter()
                    .zip(bumped.iter())
                    .map(|(&a, &s)| aged(a, s))
                    .collect();
                let risk = compute_risk(&samples, now(), window()).final_risk;

                assert!((0.0..=1.0).contains(&risk));
                assert!(risk >= previous - 1e-12, "risk dropped at idx {idx}");
                previous = risk;
            }
        }
    }

    #[test]
    fn test_window_stats() {
        let samples = [aged(0, 0.2), aged(4, 0.6), aged(8, 0.4)];
        let stats = compute_stats(&samples, 0.42);

        assert_eq!(stats.sample_count, 3);
        assert!((stats.avg_score - 0.4).abs() < 1e-9);
        assert_eq!(stats.max_score, 0.6);
        assert_eq!(stats.min_score, 0.2);
        assert_eq!(stats.risk, 0.42);
    }
}
