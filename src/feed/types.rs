//! Wire format for scores produced by the external scorer.
//!
//! One JSON object per line:
//!
//! ```text
//! {"timestamp": "2025-03-01T12:00:00Z", "score": 0.82, "evidence_ref": "shots/0042.png"}
//! {"timestamp": 1740830400.5, "score": 0.10}
//! ```

use crate::core::window::epoch_secs_to_datetime;
use crate::core::{InvalidSample, Sample};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record timestamp, either RFC 3339 or Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordTime {
    Rfc3339(DateTime<Utc>),
    EpochSecs(f64),
}

impl RecordTime {
    /// Resolve to an instant, rejecting non-finite epoch values.
    pub fn resolve(&self) -> Result<DateTime<Utc>, InvalidSample> {
        match self {
            RecordTime::Rfc3339(t) => Ok(*t),
            RecordTime::EpochSecs(secs) => epoch_secs_to_datetime(*secs),
        }
    }
}

/// One scored capture as emitted by the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub timestamp: RecordTime,
    pub score: f64,
    /// Opaque evidence handle, typically a screenshot path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_ref: Option<String>,
}

impl ScoreRecord {
    /// Validate into an engine sample. Missing evidence becomes an empty reference.
    pub fn into_sample(self) -> Result<Sample<String>, InvalidSample> {
        let timestamp = self.timestamp.resolve()?;
        Sample::new(timestamp, self.score, self.evidence_ref.unwrap_or_default())
    }
}

/// Item delivered by a feed.
#[derive(Debug, Clone)]
pub enum FeedItem {
    /// A syntactically valid record (still subject to sample validation)
    Record(ScoreRecord),
    /// A line that could not be parsed
    Malformed { line: usize, error: String },
}

/// Feed errors.
#[derive(Debug)]
pub enum FeedError {
    IoError(String),
    ReaderPanicked,
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedError::IoError(e) => write!(f, "IO error: {e}"),
            FeedError::ReaderPanicked => write!(f, "Feed reader thread panicked"),
        }
    }
}

impl std::error::Error for FeedError {}
