//! Alert persistence and notification dispatch.

use crate::alert::record::AlertRecord;
use crate::config::{AlertConfig, NotificationMethod};
use std::io::Write;
use std::path::PathBuf;

/// File receiving a human-readable line block per alert.
pub const SUMMARY_FILE: &str = "alert_summary.txt";

/// Writes alert records to disk and fans out notifications.
pub struct AlertStore {
    alert_log_dir: PathBuf,
    methods: Vec<NotificationMethod>,
}

impl AlertStore {
    /// Create a store from the alert configuration.
    pub fn new(config: &AlertConfig) -> Self {
        Self {
            alert_log_dir: config.alert_log_dir.clone(),
            methods: config.notification_methods.clone(),
        }
    }

    /// Persist the record as `<alert_id>.json` and run every notification method.
    pub fn persist(&self, record: &AlertRecord) -> Result<PathBuf, AlertStoreError> {
        std::fs::create_dir_all(&self.alert_log_dir)
            .map_err(|e| AlertStoreError::IoError(e.to_string()))?;

        let path = self.alert_log_dir.join(format!("{}.json", record.alert_id));
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| AlertStoreError::SerializeError(e.to_string()))?;
        std::fs::write(&path, json).map_err(|e| AlertStoreError::IoError(e.to_string()))?;

        tracing::info!(path = %path.display(), "alert saved");

        for method in &self.methods {
            match method {
                NotificationMethod::Log => notify_log(record),
                NotificationMethod::File => self.notify_file(record)?,
            }
        }

        Ok(path)
    }

    /// Load every persisted alert record, oldest first.
    pub fn load_all(&self) -> Result<Vec<AlertRecord>, AlertStoreError> {
        let entries = match std::fs::read_dir(&self.alert_log_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AlertStoreError::IoError(e.to_string())),
        };

        let mut records = Vec::new();
        for path in entries.filter_map(|e| e.ok()).map(|e| e.path()) {
            if path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            let content = std::fs::read_to_string(&path)
                .map_err(|e| AlertStoreError::IoError(e.to_string()))?;
            match serde_json::from_str::<AlertRecord>(&content) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable alert"),
            }
        }

        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }

    fn notify_file(&self, record: &AlertRecord) -> Result<(), AlertStoreError> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.alert_log_dir.join(SUMMARY_FILE))
            .map_err(|e| AlertStoreError::IoError(e.to_string()))?;

        let rule = "=".repeat(60);
        writeln!(
            file,
            "\n{rule}\n\
             ALERT: {}\n\
             Time: {}\n\
             Severity: {}\n\
             Risk Score: {:.3}\n\
             Machine: {}\n\
             Evidence: {} reference(s)\n\
             {rule}",
            record.alert_id,
            record.timestamp.to_rfc3339(),
            record.severity,
            record.risk,
            record.machine.hostname,
            record.evidence.len(),
        )
        .map_err(|e| AlertStoreError::IoError(e.to_string()))
    }
}

fn notify_log(record: &AlertRecord) {
    tracing::error!(
        alert_id = %record.alert_id,
        severity = %record.severity,
        risk = record.risk,
        samples = record.stats.sample_count,
        machine = %record.machine.hostname,
        "crisis alert"
    );
}

/// Alert store errors.
#[derive(Debug)]
pub enum AlertStoreError {
    IoError(String),
    SerializeError(String),
}

impl std::fmt::Display for AlertStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStoreError::IoError(e) => write!(f, "IO error: {e}"),
            AlertStoreError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for AlertStoreError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::record::{AlertBuilder, MachineInfo};
    use crate::core::{AlertDecision, DecisionReason, WindowStats};
    use chrono::{Duration, TimeZone, Utc};

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("crisis-risk-alerts-{}", uuid::Uuid::new_v4()))
    }

    fn fired(minutes: i64) -> AlertDecision {
        AlertDecision {
            fired: true,
            risk: 0.91,
            reason: DecisionReason::Fired,
            stats: WindowStats {
                sample_count: 5,
                avg_score: 0.8,
                max_score: 0.95,
                min_score: 0.6,
                risk: 0.91,
            },
            evaluated_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    #[test]
    fn test_persist_writes_record_and_summary() {
        let dir = temp_dir();
        let config = AlertConfig::with_log_dir(dir.clone());
        let store = AlertStore::new(&config);
        let builder = AlertBuilder::with_machine(
            MachineInfo {
                hostname: "lab-01".to_string(),
                platform: "linux".to_string(),
            },
            5,
        );

        let later = builder.build(&fired(45), Vec::new()).unwrap();
        let earlier = builder.build(&fired(0), vec!["x.png".to_string()]).unwrap();
        let path = store.persist(&later).unwrap();
        store.persist(&earlier).unwrap();

        assert!(path.exists());
        let summary = std::fs::read_to_string(dir.join(SUMMARY_FILE)).unwrap();
        assert_eq!(summary.matches("ALERT: ").count(), 2);
        assert!(summary.contains("Severity: CRITICAL"));

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].alert_id, earlier.alert_id);
        assert_eq!(loaded[0].evidence, vec!["x.png"]);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_load_all_on_missing_dir_is_empty() {
        let config = AlertConfig::with_log_dir(temp_dir());
        let store = AlertStore::new(&config);
        assert!(store.load_all().unwrap().is_empty());
    }
}
