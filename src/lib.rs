//! Crisis Risk Agent - sustained-distress detection over scored screen text.
//!
//! A scorer outside this crate turns periodically captured screen text into
//! distress scores in `[0, 1]`. This crate decides, without ever reacting to
//! a single sample, whether those scores show a *sustained* pattern worth an
//! alert, and when the next alert is allowed.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Crisis Risk Agent                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │    Feed     │──▶│   Window    │──▶│    Risk     │       │
//! │  │  (JSONL)    │   │ (15m, lazy) │   │ + cooldown  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                                    │ fired        │
//! │         ▼                                    ▼              │
//! │  ┌─────────────┐                     ┌─────────────┐       │
//! │  │Transparency │                     │   Alert     │       │
//! │  │    Log      │                     │   Record    │       │
//! │  └─────────────┘                     └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use crisis_risk_agent::core::{DecisionReason, EngineConfig, RiskEngine};
//!
//! let config = EngineConfig::new(Duration::minutes(15), 0.65, 3, Duration::minutes(30))
//!     .expect("valid config");
//! let engine: RiskEngine = RiskEngine::new(config);
//!
//! let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
//! engine.ingest(now - Duration::minutes(9), 0.7, "shot-1.png".into()).unwrap();
//! engine.ingest(now - Duration::minutes(3), 0.8, "shot-2.png".into()).unwrap();
//! engine.ingest(now, 0.9, "shot-3.png".into()).unwrap();
//!
//! let decision = engine.evaluate(now);
//! assert_eq!(decision.reason, DecisionReason::Fired);
//! assert_eq!(engine.evaluate(now + Duration::minutes(10)).reason, DecisionReason::Suppressed);
//! ```

pub mod alert;
pub mod config;
pub mod core;
pub mod feed;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use alert::{AlertBuilder, AlertRecord, AlertStore, Severity};
pub use config::{AlertConfig, Config, RiskConfig};
pub use crate::core::{
    AlertDecision, DecisionReason, EngineConfig, EngineState, InvalidConfiguration,
    InvalidSample, RiskEngine, Sample, SharedRiskEngine, WindowStats,
};
pub use feed::{FeedItem, JsonlFeed, ScoreRecord};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Monitoring notice that can be displayed to the monitored user.
pub const MONITORING_NOTICE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║              CRISIS RISK AGENT - MONITORING NOTICE               ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This machine is monitored for signs of sustained distress.      ║
║                                                                  ║
║  ✓ WHAT THE AGENT USES:                                          ║
║    • A distress score (0-1) per captured screen                  ║
║    • When each score was produced                                ║
║                                                                  ║
║  ✗ WHAT THE AGENT NEVER DOES:                                    ║
║    • Alert on a single reading                                   ║
║    • Alert again during the cooldown after an alert              ║
║    • Read or store the screen text itself                        ║
║                                                                  ║
║  Scores older than the rolling window are discarded.             ║
║                                                                  ║
║  You can view what the agent has decided with:                   ║
║    crisis-risk status                                            ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
