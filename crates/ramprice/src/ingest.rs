use serde::{Deserialize, Serialize};

use crate::parser::parse_listing;
use crate::store::{JsonFileStore, MergeSummary, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The text produced no records; the store was left untouched.
    Empty,
    Merged(MergeSummary),
}

/// Parses `text` and merges the result under `key`.
///
/// Every ingestion path goes through here, so the same text always yields
/// the same stored result whether it came from a crawl or an operator.
pub fn ingest_text(
    store: &JsonFileStore,
    text: &str,
    key: &str,
) -> Result<IngestOutcome, StoreError> {
    let snapshot = parse_listing(text);
    if snapshot.is_empty() {
        log::warn!("No price records recognized, nothing merged for {}", key);
        return Ok(IngestOutcome::Empty);
    }

    Ok(IngestOutcome::Merged(store.merge_snapshot(snapshot, key)?))
}

/// Status returned to an operator who submitted text by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestStatus {
    Success { key: String, count: usize },
    Error { message: String },
}

impl IngestStatus {
    pub fn error(message: impl Into<String>) -> Self {
        IngestStatus::Error {
            message: message.into(),
        }
    }
}

impl From<IngestOutcome> for IngestStatus {
    fn from(outcome: IngestOutcome) -> Self {
        match outcome {
            IngestOutcome::Empty => IngestStatus::error("No price records recognized in the text"),
            IngestOutcome::Merged(summary) => IngestStatus::Success {
                count: summary.record_count(),
                key: summary.key,
            },
        }
    }
}

/// Body of a manual submission.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRequest {
    pub date: String,
    pub time: String,
    pub text: String,
}
