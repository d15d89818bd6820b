//! Time-bounded sample storage.
//!
//! Samples are kept in arrival order. A sample is live while its age
//! (`now - timestamp`) is at most the window duration; stale samples are
//! evicted lazily whenever the store is written to or evaluated.

use crate::core::error::InvalidSample;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Upper bound on retained samples, independent of the window duration.
///
/// Capture cadence is bounded externally so this is never reached in
/// practice; it only caps memory if a producer misbehaves.
pub const MAX_SAMPLES: usize = 10_000;

/// One timestamped distress score.
///
/// `evidence` is an opaque handle (e.g. a screenshot path) that the engine
/// carries but never interprets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample<E = String> {
    /// When the scored text was captured
    pub timestamp: DateTime<Utc>,
    /// Distress score in `[0, 1]`
    pub score: f64,
    /// Opaque evidence reference
    pub evidence: E,
}

impl<E> Sample<E> {
    /// Create a sample, rejecting scores outside `[0, 1]`.
    pub fn new(timestamp: DateTime<Utc>, score: f64, evidence: E) -> Result<Self, InvalidSample> {
        if !(0.0..=1.0).contains(&score) {
            return Err(InvalidSample::ScoreOutOfRange(score));
        }
        Ok(Self {
            timestamp,
            score,
            evidence,
        })
    }

    /// Create a sample from a floating-point Unix timestamp in seconds.
    pub fn from_epoch_secs(secs: f64, score: f64, evidence: E) -> Result<Self, InvalidSample> {
        let timestamp = epoch_secs_to_datetime(secs)?;
        Self::new(timestamp, score, evidence)
    }

    /// Age of this sample relative to `now`. Negative for future timestamps.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }
}

/// Convert float epoch seconds into an instant.
pub fn epoch_secs_to_datetime(secs: f64) -> Result<DateTime<Utc>, InvalidSample> {
    if !secs.is_finite() {
        return Err(InvalidSample::NonFiniteTimestamp);
    }

    let whole = secs.floor();
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return Err(InvalidSample::NonFiniteTimestamp);
    }
    let nanos = (((secs - whole) * 1e9).round() as u32).min(999_999_999);

    DateTime::from_timestamp(whole as i64, nanos).ok_or(InvalidSample::NonFiniteTimestamp)
}

/// Arrival-ordered buffer of live samples.
#[derive(Debug, Clone)]
pub struct WindowStore<E = String> {
    /// How long a sample stays live
    window_duration: Duration,
    /// Samples in arrival order (not necessarily timestamp order)
    samples: VecDeque<Sample<E>>,
    /// Latest instant passed to `evict`; sample timestamps never move it
    clock: Option<DateTime<Utc>>,
}

impl<E> WindowStore<E> {
    /// Create an empty store with the given window duration.
    pub fn new(window_duration: Duration) -> Self {
        Self {
            window_duration,
            samples: VecDeque::new(),
            clock: None,
        }
    }

    /// Append a sample, then evict everything stale.
    ///
    /// Out-of-order and future timestamps are accepted. Eviction runs
    /// against the latest evaluation instant, so a late-arriving sample that
    /// was already older than the window at that instant is dropped right
    /// away. Before the first evaluation nothing is evicted on ingest.
    pub fn ingest(&mut self, sample: Sample<E>) {
        self.samples.push_back(sample);
        if self.samples.len() > MAX_SAMPLES {
            self.samples.pop_front();
        }

        if let Some(now) = self.clock {
            self.retain_live(now);
        }
    }

    /// Drop every sample whose age at `now` exceeds the window.
    pub fn evict(&mut self, now: DateTime<Utc>) {
        if self.clock.map_or(true, |clock| now > clock) {
            self.clock = Some(now);
        }
        self.retain_live(now);
    }

    /// Iterate the samples that are live at `now` without mutating the store.
    pub fn live(&self, now: DateTime<Utc>) -> impl Iterator<Item = &Sample<E>> {
        let window = self.window_duration;
        self.samples.iter().filter(move |s| s.age(now) <= window)
    }

    /// Number of samples held, including any that went stale since the
    /// last eviction. Use `live(now).count()` for the count at an instant.
    pub fn size(&self) -> usize {
        self.samples.len()
    }

    /// Check if the store holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The configured window duration.
    pub fn window_duration(&self) -> Duration {
        self.window_duration
    }

    fn retain_live(&mut self, now: DateTime<Utc>) {
        let window = self.window_duration;
        self.samples.retain(|s| s.age(now) <= window);
    }
}

impl<E: Clone> WindowStore<E> {
    /// Live samples as of `now`, equivalent to evicting then reading.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Vec<Sample<E>> {
        self.live(now).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn sample(at: DateTime<Utc>, score: f64) -> Sample<&'static str> {
        Sample::new(at, score, "shot.png").unwrap()
    }

    #[test]
    fn test_sample_score_validation() {
        assert!(Sample::new(base(), 0.0, ()).is_ok());
        assert!(Sample::new(base(), 1.0, ()).is_ok());
        assert_eq!(
            Sample::new(base(), 1.01, ()).unwrap_err(),
            InvalidSample::ScoreOutOfRange(1.01)
        );
        assert!(matches!(
            Sample::new(base(), f64::NAN, ()),
            Err(InvalidSample::ScoreOutOfRange(_))
        ));
    }

    #[test]
    fn test_epoch_timestamp_validation() {
        let s = Sample::from_epoch_secs(1_700_000_000.5, 0.4, ()).unwrap();
        assert_eq!(s.timestamp.timestamp(), 1_700_000_000);
        assert_eq!(s.timestamp.timestamp_subsec_millis(), 500);

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1e300] {
            assert_eq!(
                Sample::from_epoch_secs(bad, 0.4, ()).unwrap_err(),
                InvalidSample::NonFiniteTimestamp
            );
        }
    }

    #[test]
    fn test_ingest_evicts_stale_samples() {
        let mut store = WindowStore::new(Duration::minutes(15));

        store.ingest(sample(base(), 0.3));
        store.ingest(sample(base() + Duration::minutes(10), 0.4));
        store.evict(base() + Duration::minutes(10));
        assert_eq!(store.size(), 2);

        // First sample is 16 minutes old at the latest evaluation
        store.evict(base() + Duration::minutes(16));
        store.ingest(sample(base() + Duration::minutes(16), 0.5));
        assert_eq!(store.size(), 2);
        assert!(store
            .live(base() + Duration::minutes(16))
            .all(|s| s.timestamp > base()));
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let mut store = WindowStore::new(Duration::minutes(15));
        store.ingest(sample(base(), 0.3));

        store.evict(base() + Duration::minutes(15));
        assert_eq!(store.size(), 1);

        store.evict(base() + Duration::minutes(15) + Duration::milliseconds(1));
        assert!(store.is_empty());
    }

    #[test]
    fn test_out_of_order_samples_use_their_own_age() {
        let mut store = WindowStore::new(Duration::minutes(15));
        store.ingest(sample(base() + Duration::minutes(10), 0.3));
        // Arrives late but is still inside the window
        store.ingest(sample(base() + Duration::minutes(2), 0.6));
        assert_eq!(store.size(), 2);

        // The late sample ages out first even though it arrived last
        store.evict(base() + Duration::minutes(18));
        let live: Vec<_> = store.live(base() + Duration::minutes(18)).collect();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].score, 0.3);
    }

    #[test]
    fn test_late_sample_older_than_window_is_dropped() {
        let mut store = WindowStore::new(Duration::minutes(15));
        store.ingest(sample(base() + Duration::minutes(30), 0.3));
        store.evict(base() + Duration::minutes(30));
        store.ingest(sample(base(), 0.9));
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn test_future_sample_does_not_move_eviction_clock() {
        let mut store = WindowStore::new(Duration::minutes(15));
        store.ingest(sample(base() + Duration::days(1), 0.1));
        store.ingest(sample(base() - Duration::minutes(9), 0.7));
        store.ingest(sample(base() - Duration::minutes(3), 0.8));
        store.ingest(sample(base(), 0.9));
        assert_eq!(store.size(), 4);

        store.evict(base());
        store.ingest(sample(base() + Duration::minutes(1), 0.6));
        assert_eq!(store.size(), 5);
        assert_eq!(store.snapshot(base() + Duration::minutes(1)).len(), 5);
    }

    #[test]
    fn test_earlier_evaluation_does_not_rewind_clock() {
        let mut store = WindowStore::new(Duration::minutes(15));
        store.evict(base() + Duration::minutes(30));
        store.evict(base());

        // Still judged against the later instant
        store.ingest(sample(base() + Duration::minutes(10), 0.4));
        assert!(store.is_empty());
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let mut store = WindowStore::new(Duration::minutes(15));
        store.ingest(sample(base(), 0.3));
        store.ingest(sample(base() + Duration::minutes(5), 0.7));

        let snap = store.snapshot(base() + Duration::minutes(17));
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].evidence, "shot.png");
        assert_eq!(store.size(), 2);
    }
}
