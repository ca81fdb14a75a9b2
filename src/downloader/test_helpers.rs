//! In-memory byte sources for downloader tests.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, ReadBuf};

use crate::error::FetchError;
use crate::source::{BoxedReader, ByteSource};

/// Serves fixed bodies by URI and records how it was used.
///
/// Unknown URIs answer 404. Every `open` call is counted, and the number of
/// simultaneously open readers is tracked so tests can check the concurrency bound.
#[derive(Default)]
pub(crate) struct MemorySource {
    bodies: HashMap<String, Vec<u8>>,
    /// uri -> number of bytes served before the stream breaks
    broken: HashMap<String, usize>,
    hanging: HashSet<String>,
    panicking: HashSet<String>,
    delay: Duration,
    opens: AtomicUsize,
    active: Arc<AtomicUsize>,
    max_active: AtomicUsize,
}

impl MemorySource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_body(mut self, uri: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(uri.to_string(), body.into());
        self
    }

    /// Serve `uri` but fail with a reset after `good_bytes`
    pub(crate) fn with_broken(mut self, uri: &str, body: impl Into<Vec<u8>>, good_bytes: usize) -> Self {
        self.bodies.insert(uri.to_string(), body.into());
        self.broken.insert(uri.to_string(), good_bytes);
        self
    }

    /// `open` for `uri` never completes
    pub(crate) fn with_hanging(mut self, uri: &str) -> Self {
        self.hanging.insert(uri.to_string());
        self
    }

    /// `open` for `uri` panics
    pub(crate) fn with_panic(mut self, uri: &str) -> Self {
        self.panicking.insert(uri.to_string());
        self
    }

    /// Hold every reader open for at least `delay` before returning it
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub(crate) fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ByteSource for MemorySource {
    async fn open(&self, uri: &str) -> Result<BoxedReader, FetchError> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        if self.panicking.contains(uri) {
            panic!("source exploded for {uri}");
        }
        if self.hanging.contains(uri) {
            std::future::pending::<()>().await;
        }

        let Some(body) = self.bodies.get(uri) else {
            return Err(FetchError::HttpStatus {
                status: 404,
                uri: uri.to_string(),
            });
        };

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        let guard = ActiveGuard(Arc::clone(&self.active));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.broken.get(uri) {
            Some(&good_bytes) => Ok(Box::new(BrokenReader {
                data: body[..good_bytes.min(body.len())].to_vec(),
                pos: 0,
                _guard: guard,
            })),
            None => Ok(Box::new(TrackedReader {
                inner: Cursor::new(body.clone()),
                _guard: guard,
            })),
        }
    }
}

/// Decrements the active-reader count when the reader goes away
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct TrackedReader {
    inner: Cursor<Vec<u8>>,
    _guard: ActiveGuard,
}

impl AsyncRead for TrackedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

struct BrokenReader {
    data: Vec<u8>,
    pos: usize,
    _guard: ActiveGuard,
}

impl AsyncRead for BrokenReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        if self.pos >= self.data.len() {
            return Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }
        let n = buf.remaining().min(self.data.len() - self.pos);
        let start = self.pos;
        buf.put_slice(&self.data[start..start + n]);
        self.pos += n;
        Poll::Ready(Ok(()))
    }
}
