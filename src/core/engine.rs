//! The risk aggregation engine.
//!
//! Owns the window store and the alert state machine behind a single lock,
//! so `ingest` and `evaluate` are atomic with respect to each other. The
//! engine never reads a wall clock: every time-dependent call takes the
//! caller's notion of "now".

use crate::core::error::{InvalidConfiguration, InvalidSample};
use crate::core::risk::{compute_risk, compute_stats, RiskBreakdown, WindowStats};
use crate::core::window::{Sample, WindowStore};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Validated engine parameters. Immutable once the engine is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    window_duration: Duration,
    alert_threshold: f64,
    min_samples: usize,
    cooldown_duration: Duration,
}

impl EngineConfig {
    /// Validate and build a configuration.
    pub fn new(
        window_duration: Duration,
        alert_threshold: f64,
        min_samples: usize,
        cooldown_duration: Duration,
    ) -> Result<Self, InvalidConfiguration> {
        if !(0.0..=1.0).contains(&alert_threshold) {
            return Err(InvalidConfiguration::ThresholdOutOfRange(alert_threshold));
        }
        if window_duration <= Duration::zero() {
            return Err(InvalidConfiguration::NonPositiveWindow);
        }
        if cooldown_duration < Duration::zero() {
            return Err(InvalidConfiguration::NegativeCooldown);
        }
        if min_samples == 0 {
            return Err(InvalidConfiguration::ZeroMinSamples);
        }

        Ok(Self {
            window_duration,
            alert_threshold,
            min_samples,
            cooldown_duration,
        })
    }

    pub fn window_duration(&self) -> Duration {
        self.window_duration
    }

    pub fn alert_threshold(&self) -> f64 {
        self.alert_threshold
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    pub fn cooldown_duration(&self) -> Duration {
        self.cooldown_duration
    }
}

/// Alert state of one monitored subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EngineState {
    /// Monitoring with no suppression
    Normal,
    /// An alert fired; further alerts are suppressed until `until`
    Cooldown { until: DateTime<Utc> },
}

/// Why an evaluation did or did not fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// Fewer live samples than `min_samples`
    InsufficientSamples,
    /// Cooldown still active
    Suppressed,
    /// Risk below the alert threshold
    BelowThreshold,
    /// Alert fired; cooldown started
    Fired,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::InsufficientSamples => "insufficient_samples",
            DecisionReason::Suppressed => "suppressed",
            DecisionReason::BelowThreshold => "below_threshold",
            DecisionReason::Fired => "fired",
        }
    }
}

impl std::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one evaluation. Not retained by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertDecision {
    pub fired: bool,
    /// Final risk in `[0, 1]`
    pub risk: f64,
    pub reason: DecisionReason,
    pub stats: WindowStats,
    /// The instant the decision was made for
    pub evaluated_at: DateTime<Utc>,
}

struct Inner<E> {
    window: WindowStore<E>,
    state: EngineState,
    alert_count: u64,
}

/// Sustained-distress aggregation engine for a single subject.
pub struct RiskEngine<E = String> {
    config: EngineConfig,
    inner: Mutex<Inner<E>>,
}

/// Thread-safe shared engine.
pub type SharedRiskEngine<E = String> = Arc<RiskEngine<E>>;

impl<E> RiskEngine<E> {
    /// Create an engine in the `Normal` state with an empty window.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                window: WindowStore::new(config.window_duration),
                state: EngineState::Normal,
                alert_count: 0,
            }),
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate and admit one score.
    pub fn ingest(
        &self,
        timestamp: DateTime<Utc>,
        score: f64,
        evidence: E,
    ) -> Result<(), InvalidSample> {
        let sample = Sample::new(timestamp, score, evidence)?;
        self.ingest_sample(sample);
        Ok(())
    }

    /// Admit an already validated sample.
    pub fn ingest_sample(&self, sample: Sample<E>) {
        self.inner.lock().window.ingest(sample);
    }

    /// Evaluate the window at `now` and advance the state machine.
    ///
    /// Rules are checked in order: too few samples, active cooldown,
    /// threshold reached, otherwise below threshold (which also ends an
    /// expired cooldown).
    pub fn evaluate(&self, now: DateTime<Utc>) -> AlertDecision {
        let mut inner = self.inner.lock();
        inner.window.evict(now);

        let risk = compute_risk(inner.window.live(now), now, self.config.window_duration);
        let stats = compute_stats(inner.window.live(now), risk.final_risk);

        let reason = if risk.sample_count < self.config.min_samples {
            DecisionReason::InsufficientSamples
        } else {
            let state = inner.state;
            match state {
                EngineState::Cooldown { until } if now < until => DecisionReason::Suppressed,
                _ if risk.final_risk >= self.config.alert_threshold => {
                    inner.state = EngineState::Cooldown {
                        until: now + self.config.cooldown_duration,
                    };
                    inner.alert_count += 1;
                    DecisionReason::Fired
                }
                _ => {
                    inner.state = EngineState::Normal;
                    DecisionReason::BelowThreshold
                }
            }
        };

        AlertDecision {
            fired: reason == DecisionReason::Fired,
            risk: risk.final_risk,
            reason,
            stats,
            evaluated_at: now,
        }
    }

    /// Risk breakdown at `now` without evicting or changing state.
    pub fn compute_risk(&self, now: DateTime<Utc>) -> RiskBreakdown {
        let inner = self.inner.lock();
        compute_risk(inner.window.live(now), now, self.config.window_duration)
    }

    /// Window statistics at `now` without evicting or changing state.
    pub fn window_stats(&self, now: DateTime<Utc>) -> WindowStats {
        let inner = self.inner.lock();
        let risk = compute_risk(inner.window.live(now), now, self.config.window_duration);
        compute_stats(inner.window.live(now), risk.final_risk)
    }

    /// Current alert state.
    pub fn state(&self) -> EngineState {
        self.inner.lock().state
    }

    /// Number of live samples at `now`, without evicting.
    pub fn size(&self, now: DateTime<Utc>) -> usize {
        self.inner.lock().window.live(now).count()
    }

    /// Number of alerts fired since construction.
    pub fn alert_count(&self) -> u64 {
        self.inner.lock().alert_count
    }
}

impl<E: Clone> RiskEngine<E> {
    /// Live samples at `now`, including their evidence references.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Vec<Sample<E>> {
        self.inner.lock().window.snapshot(now)
    }
}
