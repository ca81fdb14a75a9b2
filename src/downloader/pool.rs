//! Per-batch worker pool -- fixed worker count, shared queue, single join point.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinSet;

use crate::error::{Error, FetchError, Result};
use crate::types::{DownloadItem, DownloadOutcome, Event, OutcomeStatus};

use super::transfer::Transfer;

/// Work queue shared by the workers of one batch: (input index, item)
type ItemQueue = Arc<Mutex<VecDeque<(usize, DownloadItem)>>>;

/// Bounded set of workers serving exactly one batch.
///
/// Built fresh for every batch and consumed by [`WorkerPool::run`], which
/// returns only after every worker has exited.
pub(crate) struct WorkerPool {
    workers: usize,
    handle: tokio::runtime::Handle,
}

impl WorkerPool {
    /// Size a pool for `item_count` items with at most `concurrency` workers.
    ///
    /// Fails if `concurrency` is zero or there is no tokio runtime to spawn on.
    pub(crate) fn new(concurrency: usize, item_count: usize) -> Result<Self> {
        if concurrency == 0 {
            return Err(Error::PoolInit(
                "concurrency must be at least 1".to_string(),
            ));
        }
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::PoolInit(format!("no tokio runtime available: {e}")))?;

        Ok(Self {
            workers: concurrency.min(item_count.max(1)),
            handle,
        })
    }

    /// Number of worker tasks this pool will spawn
    pub(crate) fn workers(&self) -> usize {
        self.workers
    }

    /// Process every item and return one outcome per item, in input order.
    pub(crate) async fn run(
        self,
        items: Vec<DownloadItem>,
        transfer: Arc<Transfer>,
        event_tx: broadcast::Sender<Event>,
    ) -> Vec<DownloadOutcome> {
        let total = items.len();
        let queue: ItemQueue = Arc::new(Mutex::new(items.iter().cloned().enumerate().collect()));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<(usize, DownloadOutcome)>();

        let mut workers = JoinSet::new();
        for worker_id in 0..self.workers {
            let queue = Arc::clone(&queue);
            let result_tx = result_tx.clone();
            let transfer = Arc::clone(&transfer);
            let event_tx = event_tx.clone();

            workers.spawn_on(
                async move {
                    loop {
                        let next = queue.lock().await.pop_front();
                        let Some((index, item)) = next else {
                            break;
                        };

                        let status = match AssertUnwindSafe(transfer.run(&item))
                            .catch_unwind()
                            .await
                        {
                            Ok(status) => status,
                            Err(panic) => {
                                let reason =
                                    FetchError::Worker(panic_message(panic.as_ref())).to_string();
                                tracing::error!(
                                    worker_id,
                                    identifier = %item.identifier,
                                    error = %reason,
                                    "Download panicked"
                                );
                                OutcomeStatus::Failed { reason }
                            }
                        };
                        event_tx
                            .send(Event::ItemFinished {
                                index,
                                identifier: item.identifier.clone(),
                                outcome: status.clone(),
                            })
                            .ok();

                        if result_tx
                            .send((index, DownloadOutcome::for_item(&item, status)))
                            .is_err()
                        {
                            break;
                        }
                    }
                    tracing::trace!(worker_id, "Download worker finished");
                },
                &self.handle,
            );
        }
        drop(result_tx);

        // Barrier: nothing is returned until every worker has exited
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Download worker terminated abnormally");
            }
        }

        let mut slots: Vec<Option<DownloadOutcome>> = vec![None; total];
        while let Ok((index, outcome)) = result_rx.try_recv() {
            slots[index] = Some(outcome);
        }

        slots
            .into_iter()
            .zip(items)
            .map(|(slot, item)| {
                slot.unwrap_or_else(|| {
                    let reason =
                        FetchError::Worker(format!("no result for '{}'", item.identifier))
                            .to_string();
                    DownloadOutcome::for_item(&item, OutcomeStatus::Failed { reason })
                })
            })
            .collect()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panicked".to_string()
    }
}
