//! Batch downloader split into focused submodules.
//!
//! - [`pool`] - Per-batch worker pool with a single join point
//! - [`transfer`] - Single-item skip check, chunked copy and atomic rename

mod pool;
mod transfer;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::config::FetchConfig;
use crate::error::Result;
use crate::source::{ByteSource, HttpSource};
use crate::types::{BatchSummary, DownloadItem, DownloadOutcome, Event};

use pool::WorkerPool;
use transfer::Transfer;

/// Downloads batches of items with a bounded number of workers.
///
/// Cloneable; clones share the configuration, the byte source and the event
/// channel. Batches never share a worker pool, so concurrent `run_batch`
/// calls are independent of each other.
#[derive(Clone)]
pub struct BatchDownloader {
    /// Configuration (wrapped in Arc for sharing across clones)
    pub(crate) config: Arc<FetchConfig>,
    /// Where bytes come from
    pub(crate) source: Arc<dyn ByteSource>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl BatchDownloader {
    /// Create a downloader that fetches over HTTP(S).
    pub fn new(config: FetchConfig) -> Result<Self> {
        config.validate()?;
        let source = HttpSource::new(&config)?;
        Self::with_source(config, Arc::new(source))
    }

    /// Create a downloader reading from a custom [`ByteSource`].
    pub fn with_source(config: FetchConfig, source: Arc<dyn ByteSource>) -> Result<Self> {
        config.validate()?;
        let (event_tx, _) = tokio::sync::broadcast::channel(config.event_capacity);
        Ok(Self {
            config: Arc::new(config),
            source,
            event_tx,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Subscribe to batch and item events.
    ///
    /// Events sent while nobody is subscribed are dropped.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Run a batch with the configured default concurrency.
    pub async fn run(&self, items: Vec<DownloadItem>) -> Result<Vec<DownloadOutcome>> {
        self.run_batch(items, self.config.concurrency).await
    }

    /// Download every item, at most `concurrency` at a time.
    ///
    /// Returns exactly one outcome per item, in input order, once every item
    /// has finished. Items whose destination already exists are `Skipped`
    /// without touching the network. Per-item failures are reported as
    /// `Failed` outcomes and never cancel other items.
    ///
    /// Fails only when the worker pool cannot be set up (zero concurrency or
    /// no tokio runtime); in that case nothing is attempted. An empty batch
    /// returns an empty list without building a pool.
    ///
    /// Destination paths must be unique within the batch. Duplicates are
    /// logged; which download ends up on disk is undefined.
    pub async fn run_batch(
        &self,
        items: Vec<DownloadItem>,
        concurrency: usize,
    ) -> Result<Vec<DownloadOutcome>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let pool = WorkerPool::new(concurrency, items.len())?;
        warn_duplicate_destinations(&items);

        let total = items.len();
        let workers = pool.workers();
        tracing::info!(total, workers, "Starting download batch");
        self.event_tx
            .send(Event::BatchStarted { total, workers })
            .ok();

        let transfer = Arc::new(Transfer {
            source: Arc::clone(&self.source),
            buffer_size: self.config.effective_buffer_size(),
            item_timeout: self.config.item_timeout,
        });
        let outcomes = pool.run(items, transfer, self.event_tx.clone()).await;

        let summary = BatchSummary::from_outcomes(&outcomes);
        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            "Download batch complete"
        );
        self.event_tx.send(Event::BatchComplete { summary }).ok();

        Ok(outcomes)
    }
}

fn warn_duplicate_destinations(items: &[DownloadItem]) {
    let mut seen: HashSet<&Path> = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.destination_path.as_path()) {
            tracing::warn!(
                identifier = %item.identifier,
                path = %item.destination_path.display(),
                "Duplicate destination in batch; final file content is undefined"
            );
        }
    }
}
