//! Line-delimited JSON score feed.
//!
//! A background thread reads records from any buffered reader (a file or
//! stdin) and forwards them over a bounded channel. The channel closes when
//! the reader reaches EOF or the feed is stopped.

use crate::feed::types::{FeedError, FeedItem, ScoreRecord};
use crossbeam_channel::{bounded, Receiver};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Channel capacity between the reader thread and the consumer.
const FEED_CAPACITY: usize = 10_000;

/// Feed reading score records from a line-oriented source.
pub struct JsonlFeed {
    receiver: Receiver<FeedItem>,
    running: Arc<AtomicBool>,
    handle: JoinHandle<Result<usize, FeedError>>,
}

impl JsonlFeed {
    /// Start reading `reader` on a background thread.
    pub fn spawn<R>(reader: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (sender, receiver) = bounded(FEED_CAPACITY);
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();

        let handle = std::thread::spawn(move || {
            let mut records = 0usize;

            for (idx, line) in reader.lines().enumerate() {
                if !flag.load(Ordering::SeqCst) {
                    break;
                }

                let line = line.map_err(|e| FeedError::IoError(e.to_string()))?;
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }

                let item = match serde_json::from_str::<ScoreRecord>(trimmed) {
                    Ok(record) => {
                        records += 1;
                        FeedItem::Record(record)
                    }
                    Err(e) => {
                        tracing::debug!(line = idx + 1, error = %e, "malformed score record");
                        FeedItem::Malformed {
                            line: idx + 1,
                            error: e.to_string(),
                        }
                    }
                };

                if sender.send(item).is_err() {
                    // Consumer hung up
                    break;
                }
            }

            flag.store(false, Ordering::SeqCst);
            Ok(records)
        });

        Self {
            receiver,
            running,
            handle,
        }
    }

    /// Get the receiver for feed items.
    pub fn receiver(&self) -> &Receiver<FeedItem> {
        &self.receiver
    }

    /// Check if the reader thread is still producing.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the reader thread to stop after its current line.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Wait for the reader thread and return how many records it parsed.
    ///
    /// The caller must keep draining (or drop) the receiver, otherwise a
    /// full channel blocks the reader.
    pub fn join(self) -> Result<usize, FeedError> {
        self.handle.join().map_err(|_| FeedError::ReaderPanicked)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_records_and_flags_malformed_lines() {
        let input = "\
{\"timestamp\": 1740830400, \"score\": 0.4}\n\
\n\
# comment\n\
not json\n\
{\"timestamp\": \"2025-03-01T12:00:00Z\", \"score\": 0.9, \"evidence_ref\": \"a.png\"}\n";

        let feed = JsonlFeed::spawn(Cursor::new(input.to_string()));
        let items: Vec<FeedItem> = feed.receiver().iter().collect();

        assert_eq!(items.len(), 3);
        assert!(matches!(items[0], FeedItem::Record(_)));
        assert!(matches!(items[1], FeedItem::Malformed { line: 4, .. }));
        match &items[2] {
            FeedItem::Record(r) => assert_eq!(r.evidence_ref.as_deref(), Some("a.png")),
            other => panic!("unexpected item {other:?}"),
        }

        assert_eq!(feed.join().unwrap(), 2);
    }

    #[test]
    fn test_channel_closes_at_eof() {
        let feed = JsonlFeed::spawn(Cursor::new(String::new()));
        assert!(feed.receiver().recv().is_err());
        assert!(!feed.is_running());
        assert_eq!(feed.join().unwrap(), 0);
    }
}
