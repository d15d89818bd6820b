//! Alert payloads built from fired decisions.
//!
//! The engine only supplies numbers. Everything else in a record (identity,
//! machine, evidence references) is attached here on the alerting side.

use crate::core::{AlertDecision, WindowStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// The name of this producer.
pub const PRODUCER_NAME: &str = "crisis-risk-agent";

/// Alert severity derived from the final risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Map a risk value to a severity band.
    pub fn from_risk(risk: f64) -> Self {
        if risk >= 0.85 {
            Severity::Critical
        } else if risk >= 0.70 {
            Severity::High
        } else if risk >= 0.55 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review status of an alert. The agent only ever writes new alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    New,
}

/// Basic identification of the monitored machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineInfo {
    pub hostname: String,
    pub platform: String,
}

impl MachineInfo {
    /// Detect the local machine.
    pub fn detect() -> Self {
        Self {
            hostname: hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string()),
            platform: std::env::consts::OS.to_string(),
        }
    }
}

/// Persisted record of one fired alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    /// `ALERT_<YYYYmmdd_HHMMSS>_<n>`
    pub alert_id: String,
    /// Instant the alert fired for (RFC3339)
    pub timestamp: DateTime<Utc>,
    pub risk: f64,
    pub severity: Severity,
    pub stats: WindowStats,
    /// Evidence references, oldest first
    pub evidence: Vec<String>,
    pub machine: MachineInfo,
    pub status: AlertStatus,
    /// Producer name and version
    pub producer: String,
    /// Agent instance that raised the alert
    pub instance_id: Uuid,
}

/// Builds alert records with per-instance numbering.
pub struct AlertBuilder {
    instance_id: Uuid,
    machine: MachineInfo,
    max_evidence_refs: usize,
    counter: AtomicU64,
}

impl AlertBuilder {
    /// Create a builder for the local machine.
    pub fn new(max_evidence_refs: usize) -> Self {
        Self::with_machine(MachineInfo::detect(), max_evidence_refs)
    }

    /// Create a builder with explicit machine info.
    pub fn with_machine(machine: MachineInfo, max_evidence_refs: usize) -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            machine,
            max_evidence_refs,
            counter: AtomicU64::new(0),
        }
    }

    /// Get the instance ID.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Number of records built so far.
    pub fn built_count(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    /// Build a record for a fired decision. Returns `None` otherwise.
    ///
    /// Only the last `max_evidence_refs` non-empty references are kept.
    pub fn build<I>(&self, decision: &AlertDecision, evidence: I) -> Option<AlertRecord>
    where
        I: IntoIterator<Item = String>,
    {
        if !decision.fired {
            return None;
        }

        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let timestamp = decision.evaluated_at;

        let mut refs: Vec<String> = evidence.into_iter().filter(|e| !e.is_empty()).collect();
        let skip = refs.len().saturating_sub(self.max_evidence_refs);
        refs.drain(..skip);

        Some(AlertRecord {
            alert_id: format!("ALERT_{}_{n}", timestamp.format("%Y%m%d_%H%M%S")),
            timestamp,
            risk: decision.risk,
            severity: Severity::from_risk(decision.risk),
            stats: decision.stats,
            evidence: refs,
            machine: self.machine.clone(),
            status: AlertStatus::New,
            producer: format!("{PRODUCER_NAME}/{}", crate::VERSION),
            instance_id: self.instance_id,
        })
    }
}
