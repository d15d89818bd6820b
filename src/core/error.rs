//! Errors raised by the aggregation engine.
//!
//! Only two things can go wrong: the engine is built from a bad
//! configuration, or a caller hands it a malformed sample. Decision
//! outcomes such as suppression are not errors.

/// Rejected engine configuration. Raised at construction, never at evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidConfiguration {
    /// `alert_threshold` outside `[0, 1]` (or NaN)
    ThresholdOutOfRange(f64),
    /// `window_duration` is zero or negative
    NonPositiveWindow,
    /// `cooldown_duration` is negative
    NegativeCooldown,
    /// `min_samples` must be at least one
    ZeroMinSamples,
}

impl std::fmt::Display for InvalidConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidConfiguration::ThresholdOutOfRange(t) => {
                write!(f, "Invalid configuration: alert threshold {t} is outside [0, 1]")
            }
            InvalidConfiguration::NonPositiveWindow => {
                write!(f, "Invalid configuration: window duration must be positive")
            }
            InvalidConfiguration::NegativeCooldown => {
                write!(f, "Invalid configuration: cooldown duration must not be negative")
            }
            InvalidConfiguration::ZeroMinSamples => {
                write!(f, "Invalid configuration: min_samples must be at least 1")
            }
        }
    }
}

impl std::error::Error for InvalidConfiguration {}

/// Rejected sample. The engine state is untouched when this is returned.
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidSample {
    /// Score outside `[0, 1]` (or NaN)
    ScoreOutOfRange(f64),
    /// Timestamp is not a finite, representable instant
    NonFiniteTimestamp,
}

impl std::fmt::Display for InvalidSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidSample::ScoreOutOfRange(s) => {
                write!(f, "Invalid sample: score {s} is outside [0, 1]")
            }
            InvalidSample::NonFiniteTimestamp => {
                write!(f, "Invalid sample: timestamp is not a finite instant")
            }
        }
    }
}

impl std::error::Error for InvalidSample {}
