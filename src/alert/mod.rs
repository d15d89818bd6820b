//! Alerting side of the engine boundary.
//!
//! Turns fired decisions into persisted records. Evidence references are
//! supplied by the caller; nothing here looks inside them.

pub mod record;
pub mod store;

// Re-export commonly used types
pub use record::{AlertBuilder, AlertRecord, AlertStatus, MachineInfo, Severity, PRODUCER_NAME};
pub use store::{AlertStore, AlertStoreError, SUMMARY_FILE};
