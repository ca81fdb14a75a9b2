//! # fetch-dl
//!
//! Bounded concurrent batch downloader for HTTP(S) assets.
//!
//! ## Design Philosophy
//!
//! - **Bounded** - a batch never has more than `concurrency` downloads in flight
//! - **Idempotent** - files already on disk are skipped, so re-running a batch resumes it
//! - **Partial-failure tolerant** - one bad item never cancels the others
//! - **Library-first** - no CLI or UI, purely a Rust crate for embedding
//!
//! ## Quick Start
//!
//! ```no_run
//! use fetch_dl::{BatchDownloader, DownloadItem, FetchConfig, OutcomeStatus};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = BatchDownloader::new(FetchConfig::default())?;
//!
//!     let items = vec![
//!         DownloadItem::new("a", "https://cdn.example.com/1.png", "/tmp/pics/a.png"),
//!         DownloadItem::new("b", "https://cdn.example.com/2.png", "/tmp/pics/b.png"),
//!     ];
//!
//!     for outcome in downloader.run_batch(items, 2).await? {
//!         match outcome.status {
//!             OutcomeStatus::Success => println!("{}: saved", outcome.identifier),
//!             OutcomeStatus::Skipped => println!("{}: already present", outcome.identifier),
//!             OutcomeStatus::Failed { reason } => println!("{}: {reason}", outcome.identifier),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Campaign image requests
pub mod campaign;
/// Configuration types
pub mod config;
/// Batch downloader and its worker pool
pub mod downloader;
/// Error types
pub mod error;
/// Byte-stream sources (HTTP and custom)
pub mod source;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use campaign::{CampaignBatch, ImageRecord, ImageRequest, ImageResult};
pub use config::FetchConfig;
pub use downloader::BatchDownloader;
pub use error::{Error, FetchError, Result};
pub use source::{BoxedReader, ByteSource, HttpSource};
pub use types::{BatchSummary, DownloadItem, DownloadOutcome, Event, OutcomeStatus};
