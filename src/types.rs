//! Core types and events for fetch-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One remote resource to save at a local path
///
/// Destination paths must be unique within a batch. Two items sharing a
/// destination race on the same file and the surviving content is undefined.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadItem {
    /// Caller-supplied correlation key, echoed back in the outcome
    pub identifier: String,
    /// Remote location to read bytes from
    pub source_uri: String,
    /// Where the bytes end up on disk
    pub destination_path: PathBuf,
}

impl DownloadItem {
    /// Create a new item
    pub fn new(
        identifier: impl Into<String>,
        source_uri: impl Into<String>,
        destination_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            source_uri: source_uri.into(),
            destination_path: destination_path.into(),
        }
    }
}

/// Terminal status of one item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Bytes were downloaded and moved into place
    Success,
    /// The destination already existed; nothing was fetched
    Skipped,
    /// The item could not be downloaded
    Failed {
        /// Human-readable reason taken from the underlying error
        reason: String,
    },
}

impl OutcomeStatus {
    /// True for `Success` and `Skipped`, i.e. the file is present on disk
    pub fn is_available(&self) -> bool {
        matches!(self, OutcomeStatus::Success | OutcomeStatus::Skipped)
    }

    /// The failure reason, if any
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            OutcomeStatus::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Result for one item of a batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOutcome {
    /// Identifier copied from the item
    pub identifier: String,
    /// Destination copied from the item
    pub destination_path: PathBuf,
    /// What happened
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl DownloadOutcome {
    pub(crate) fn for_item(item: &DownloadItem, status: OutcomeStatus) -> Self {
        Self {
            identifier: item.identifier.clone(),
            destination_path: item.destination_path.clone(),
            status,
        }
    }
}

/// Counts of each outcome kind in a finished batch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Number of items in the batch
    pub total: usize,
    /// Items downloaded in this run
    pub succeeded: usize,
    /// Items already present on disk
    pub skipped: usize,
    /// Items that failed
    pub failed: usize,
}

impl BatchSummary {
    /// Tally a list of outcomes
    pub fn from_outcomes(outcomes: &[DownloadOutcome]) -> Self {
        outcomes
            .iter()
            .fold(Self::default(), |mut summary, outcome| {
                summary.total += 1;
                match outcome.status {
                    OutcomeStatus::Success => summary.succeeded += 1,
                    OutcomeStatus::Skipped => summary.skipped += 1,
                    OutcomeStatus::Failed { .. } => summary.failed += 1,
                }
                summary
            })
    }
}

/// Event emitted by a [`BatchDownloader`](crate::BatchDownloader)
///
/// Subscribe via [`BatchDownloader::subscribe`](crate::BatchDownloader::subscribe).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A batch has been accepted and its worker pool is starting
    BatchStarted {
        /// Number of items in the batch
        total: usize,
        /// Number of workers serving the batch
        workers: usize,
    },

    /// One item reached its terminal status
    ItemFinished {
        /// Position of the item in the submitted batch
        index: usize,
        /// Identifier of the item
        identifier: String,
        /// Terminal status
        outcome: OutcomeStatus,
    },

    /// Every item of the batch has an outcome
    BatchComplete {
        /// Outcome counts
        summary: BatchSummary,
    },
}
