//! Byte-stream sources -- where downloaded bytes come from.
//!
//! The downloader only needs "open a readable stream for this URI". That
//! capability is the [`ByteSource`] trait, so tests can swap the network for
//! in-memory doubles. [`HttpSource`] is the production implementation.

use futures::TryStreamExt;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use url::Url;

use crate::config::FetchConfig;
use crate::error::{FetchError, Result};

/// Readable byte stream returned by a [`ByteSource`]
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Abstraction over "open a byte stream for a URI", enabling testability.
///
/// Implementations must be cheap to share between workers; the downloader
/// holds one behind an `Arc` and calls `open` from many tasks at once.
#[async_trait::async_trait]
pub trait ByteSource: Send + Sync {
    /// Open a stream for `uri`. The stream is consumed to end-of-file by the caller.
    async fn open(&self, uri: &str) -> std::result::Result<BoxedReader, FetchError>;
}

/// Production [`ByteSource`] performing plain HTTP(S) GET requests.
#[derive(Clone, Debug)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    /// Build a source with the connect timeout and user agent from `config`.
    ///
    /// No overall request timeout is set on the client; the downloader
    /// applies `item_timeout` around the whole item instead.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an already configured client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ByteSource for HttpSource {
    async fn open(&self, uri: &str) -> std::result::Result<BoxedReader, FetchError> {
        let url = parse_http_uri(uri)?;

        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|source| FetchError::Network {
                    uri: uri.to_string(),
                    source,
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                uri: uri.to_string(),
            });
        }

        tracing::debug!(
            uri,
            content_length = ?response.content_length(),
            "Opened HTTP source"
        );

        let body = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
        Ok(Box::new(StreamReader::new(body)))
    }
}

/// Parse `uri` and accept only `http` and `https`.
pub(crate) fn parse_http_uri(uri: &str) -> std::result::Result<Url, FetchError> {
    let url = Url::parse(uri).map_err(|e| FetchError::InvalidUri {
        uri: uri.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::InvalidUri {
            uri: uri.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}
