//! Score ingestion for the crisis risk agent.
//!
//! The scorer runs out of process and emits one JSON record per scored
//! capture. This module parses that stream and hands records to the
//! engine loop over a channel.

pub mod jsonl;
pub mod types;

// Re-export commonly used types
pub use jsonl::JsonlFeed;
pub use types::{FeedError, FeedItem, RecordTime, ScoreRecord};
