//! Single-item transfer -- skip check, directory creation, chunked copy, atomic rename.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::FetchError;
use crate::source::{BoxedReader, ByteSource};
use crate::types::{DownloadItem, OutcomeStatus};
use crate::utils::part_path;

/// Everything a worker needs to process one item
pub(crate) struct Transfer {
    pub(crate) source: Arc<dyn ByteSource>,
    pub(crate) buffer_size: usize,
    pub(crate) item_timeout: Duration,
}

impl Transfer {
    /// Process one item to its terminal status. Never fails; errors become `Failed`.
    pub(crate) async fn run(&self, item: &DownloadItem) -> OutcomeStatus {
        let result = match tokio::time::timeout(self.item_timeout, self.fetch(item)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.item_timeout)),
        };

        match result {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(
                    identifier = %item.identifier,
                    uri = %item.source_uri,
                    network = e.is_network(),
                    error = %e,
                    "Download failed"
                );
                OutcomeStatus::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn fetch(&self, item: &DownloadItem) -> Result<OutcomeStatus, FetchError> {
        let destination = item.destination_path.as_path();

        let exists = tokio::fs::try_exists(destination)
            .await
            .map_err(|e| FetchError::io("check", destination, e))?;
        if exists {
            tracing::debug!(
                identifier = %item.identifier,
                path = %destination.display(),
                "Destination already present, skipping"
            );
            return Ok(OutcomeStatus::Skipped);
        }

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::io("create directory", parent, e))?;
        }

        let temp_path = part_path(destination).ok_or_else(|| {
            FetchError::io(
                "derive temporary file for",
                destination,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "destination has no file name",
                ),
            )
        })?;

        let mut reader = self.source.open(&item.source_uri).await?;

        // Declared before the file so the handle is closed before the guard removes the path
        let part = PartFile::new(temp_path);
        let mut file = tokio::fs::File::create(part.path())
            .await
            .map_err(|e| FetchError::io("create", part.path(), e))?;

        let bytes = self
            .copy(&mut reader, &mut file, &item.source_uri, part.path())
            .await?;

        file.flush()
            .await
            .map_err(|e| FetchError::io("flush", part.path(), e))?;
        drop(file);
        drop(reader);

        tokio::fs::rename(part.path(), destination)
            .await
            .map_err(|e| FetchError::io("move into place", destination, e))?;
        part.commit();

        tracing::debug!(
            identifier = %item.identifier,
            path = %destination.display(),
            bytes,
            "Download complete"
        );
        Ok(OutcomeStatus::Success)
    }

    /// Copy `reader` into `file` in `buffer_size` chunks until end-of-stream.
    async fn copy(
        &self,
        reader: &mut BoxedReader,
        file: &mut tokio::fs::File,
        uri: &str,
        path: &Path,
    ) -> Result<u64, FetchError> {
        let mut buf = vec![0u8; self.buffer_size];
        let mut total = 0u64;

        loop {
            let n = reader
                .read(&mut buf)
                .await
                .map_err(|source| FetchError::Read {
                    uri: uri.to_string(),
                    source,
                })?;
            if n == 0 {
                return Ok(total);
            }
            file.write_all(&buf[..n])
                .await
                .map_err(|e| FetchError::io("write", path, e))?;
            total += n as u64;
        }
    }
}

/// Temporary download file that is deleted unless committed.
///
/// Covers every exit path, including the item future being dropped on timeout.
struct PartFile {
    path: PathBuf,
    committed: bool,
}

impl PartFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// The file has been renamed into place; nothing left to clean up.
    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Removed partial download");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove partial download"
                );
            }
        }
    }
}
