//! Audit counters for the monitor.
//!
//! Records how many scores were admitted or rejected and how every
//! evaluation was decided, without retaining any scored content.

use crate::core::{AlertDecision, DecisionReason};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Decision and ingestion counters for the current session.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Samples admitted to the engine
    samples_ingested: AtomicU64,
    /// Samples rejected by validation
    samples_rejected: AtomicU64,
    /// Feed lines that could not be parsed
    malformed_records: AtomicU64,
    /// Evaluations that ended with too few samples
    insufficient: AtomicU64,
    /// Evaluations suppressed by cooldown
    suppressed: AtomicU64,
    /// Evaluations below threshold
    below_threshold: AtomicU64,
    /// Evaluations that fired
    fired: AtomicU64,
    /// Alert records written
    alerts_persisted: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl TransparencyLog {
    /// Create a new transparency log.
    pub fn new() -> Self {
        Self {
            samples_ingested: AtomicU64::new(0),
            samples_rejected: AtomicU64::new(0),
            malformed_records: AtomicU64::new(0),
            insufficient: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
            below_threshold: AtomicU64::new(0),
            fired: AtomicU64::new(0),
            alerts_persisted: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a transparency log that accumulates onto stats saved at `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!(error = %e, "could not load previous transparency stats");
        }

        log
    }

    pub fn record_sample_ingested(&self) {
        self.samples_ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sample_rejected(&self) {
        self.samples_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed_record(&self) {
        self.malformed_records.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alert_persisted(&self) {
        self.alerts_persisted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one evaluation outcome.
    pub fn record_decision(&self, decision: &AlertDecision) {
        let counter = match decision.reason {
            DecisionReason::InsufficientSamples => &self.insufficient,
            DecisionReason::Suppressed => &self.suppressed,
            DecisionReason::BelowThreshold => &self.below_threshold,
            DecisionReason::Fired => &self.fired,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            samples_ingested: self.samples_ingested.load(Ordering::Relaxed),
            samples_rejected: self.samples_rejected.load(Ordering::Relaxed),
            malformed_records: self.malformed_records.load(Ordering::Relaxed),
            insufficient: self.insufficient.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            below_threshold: self.below_threshold.load(Ordering::Relaxed),
            fired: self.fired.load(Ordering::Relaxed),
            alerts_persisted: self.alerts_persisted.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Samples ingested: {}\n\
             - Samples rejected: {}\n\
             - Malformed records: {}\n\
             - Evaluations: {}\n\
             \x20 insufficient samples: {}\n\
             \x20 suppressed (cooldown): {}\n\
             \x20 below threshold: {}\n\
             \x20 fired: {}\n\
             - Alerts persisted: {}\n\
             - Session duration: {} seconds",
            stats.samples_ingested,
            stats.samples_rejected,
            stats.malformed_records,
            stats.evaluations(),
            stats.insufficient,
            stats.suppressed,
            stats.below_threshold,
            stats.fired,
            stats.alerts_persisted,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                samples_ingested: stats.samples_ingested,
                samples_rejected: stats.samples_rejected,
                malformed_records: stats.malformed_records,
                insufficient: stats.insufficient,
                suppressed: stats.suppressed,
                below_threshold: stats.below_threshold,
                fired: stats.fired,
                alerts_persisted: stats.alerts_persisted,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load stats from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let persisted = read_persisted(path)?;

                self.samples_ingested
                    .store(persisted.samples_ingested, Ordering::Relaxed);
                self.samples_rejected
                    .store(persisted.samples_rejected, Ordering::Relaxed);
                self.malformed_records
                    .store(persisted.malformed_records, Ordering::Relaxed);
                self.insufficient
                    .store(persisted.insufficient, Ordering::Relaxed);
                self.suppressed.store(persisted.suppressed, Ordering::Relaxed);
                self.below_threshold
                    .store(persisted.below_threshold, Ordering::Relaxed);
                self.fired.store(persisted.fired, Ordering::Relaxed);
                self.alerts_persisted
                    .store(persisted.alerts_persisted, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in [
            &self.samples_ingested,
            &self.samples_rejected,
            &self.malformed_records,
            &self.insufficient,
            &self.suppressed,
            &self.below_threshold,
            &self.fired,
            &self.alerts_persisted,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub samples_ingested: u64,
    pub samples_rejected: u64,
    pub malformed_records: u64,
    pub insufficient: u64,
    pub suppressed: u64,
    pub below_threshold: u64,
    pub fired: u64,
    pub alerts_persisted: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

impl TransparencyStats {
    /// Total evaluations across all outcomes.
    pub fn evaluations(&self) -> u64 {
        self.insufficient + self.suppressed + self.below_threshold + self.fired
    }
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
pub struct PersistedStats {
    pub samples_ingested: u64,
    pub samples_rejected: u64,
    #[serde(default)]
    pub malformed_records: u64,
    pub insufficient: u64,
    pub suppressed: u64,
    pub below_threshold: u64,
    pub fired: u64,
    pub alerts_persisted: u64,
    pub last_updated: DateTime<Utc>,
}

/// Read persisted stats without constructing a live log.
pub fn read_persisted(path: &std::path::Path) -> Result<PersistedStats, std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(std::io::Error::other)
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

/// Create a new shared transparency log with persistence.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedTransparencyLog {
    Arc::new(TransparencyLog::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::WindowStats;

    fn decision(reason: DecisionReason) -> AlertDecision {
        AlertDecision {
            fired: reason == DecisionReason::Fired,
            risk: 0.5,
            reason,
            stats: WindowStats::default(),
            evaluated_at: Utc::now(),
        }
    }

    #[test]
    fn test_decision_counting() {
        let log = TransparencyLog::new();

        log.record_decision(&decision(DecisionReason::Fired));
        log.record_decision(&decision(DecisionReason::Suppressed));
        log.record_decision(&decision(DecisionReason::Suppressed));
        log.record_decision(&decision(DecisionReason::InsufficientSamples));
        log.record_sample_ingested();
        log.record_sample_rejected();

        let stats = log.stats();
        assert_eq!(stats.fired, 1);
        assert_eq!(stats.suppressed, 2);
        assert_eq!(stats.insufficient, 1);
        assert_eq!(stats.below_threshold, 0);
        assert_eq!(stats.evaluations(), 4);
        assert_eq!(stats.samples_ingested, 1);
        assert_eq!(stats.samples_rejected, 1);
    }

    #[test]
    fn test_reset() {
        let log = TransparencyLog::new();
        log.record_decision(&decision(DecisionReason::BelowThreshold));
        log.record_alert_persisted();
        log.reset();

        let stats = log.stats();
        assert_eq!(stats.evaluations(), 0);
        assert_eq!(stats.alerts_persisted, 0);
    }

    #[test]
    fn test_persistence_accumulates() {
        let path = std::env::temp_dir()
            .join(format!("crisis-risk-transparency-{}", uuid::Uuid::new_v4()))
            .join("transparency.json");

        let log = TransparencyLog::with_persistence(path.clone());
        log.record_decision(&decision(DecisionReason::Fired));
        log.record_sample_ingested();
        log.save().unwrap();

        let reopened = TransparencyLog::with_persistence(path.clone());
        reopened.record_decision(&decision(DecisionReason::Fired));
        assert_eq!(reopened.stats().fired, 2);
        assert_eq!(read_persisted(&path).unwrap().samples_ingested, 1);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_summary_format() {
        let log = TransparencyLog::new();
        let summary = log.summary();

        assert!(summary.contains("Samples ingested"));
        assert!(summary.contains("suppressed (cooldown)"));
        assert!(summary.contains("Alerts persisted"));
    }
}
