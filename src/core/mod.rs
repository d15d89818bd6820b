//! Core functionality for the crisis risk agent.
//!
//! This module contains:
//! - The time-bounded sample window
//! - Recency-weighted risk computation
//! - The alert/cooldown state machine
//!
//! Nothing in here performs I/O or logs.

pub mod engine;
pub mod error;
pub mod risk;
pub mod window;

// Re-export commonly used types
pub use engine::{
    AlertDecision, DecisionReason, EngineConfig, EngineState, RiskEngine, SharedRiskEngine,
};
pub use error::{InvalidConfiguration, InvalidSample};
pub use risk::{compute_risk, compute_stats, RiskBreakdown, WindowStats};
pub use window::{Sample, WindowStore};
