//! Transparency module for the crisis risk agent.
//!
//! Monitoring people warrants an auditable record of what the monitor did:
//! how many scores it saw and how each evaluation was decided.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log_with_persistence, read_persisted, PersistedStats,
    SharedTransparencyLog, TransparencyLog, TransparencyStats,
};
