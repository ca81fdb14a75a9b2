//! Configuration types for fetch-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Smallest copy buffer the downloader will use
pub const MIN_BUFFER_SIZE: usize = 1024;

/// Largest copy buffer the downloader will use
pub const MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Main configuration for [`BatchDownloader`](crate::BatchDownloader)
///
/// Every field has a default, so an empty JSON object deserializes into a
/// working configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum number of simultaneous downloads in a batch (default: 10)
    ///
    /// Bounds open network connections and in-flight buffers. Used by
    /// [`BatchDownloader::run`](crate::BatchDownloader::run); `run_batch`
    /// takes an explicit value instead.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Deadline for a single item, covering connect, transfer and write (default: 30 seconds)
    #[serde(default = "default_item_timeout", with = "duration_serde")]
    pub item_timeout: Duration,

    /// TCP/TLS connect timeout for HTTP sources (default: 10 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Copy buffer size in bytes (default: 8192)
    ///
    /// Clamped into [`MIN_BUFFER_SIZE`]..=[`MAX_BUFFER_SIZE`] when used.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// User-Agent header sent by the HTTP source
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Root directory for campaign image storage (default: "./files")
    #[serde(default = "default_files_dir")]
    pub files_dir: PathBuf,

    /// Subdirectory of `files_dir` holding campaign folders (default: "pics")
    #[serde(default = "default_pictures_subdir")]
    pub pictures_subdir: String,

    /// Extension given to stored campaign images (default: "png")
    #[serde(default = "default_image_extension")]
    pub image_extension: String,

    /// Buffered events per subscriber before lagging (default: 256)
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            item_timeout: default_item_timeout(),
            connect_timeout: default_connect_timeout(),
            buffer_size: default_buffer_size(),
            user_agent: default_user_agent(),
            files_dir: default_files_dir(),
            pictures_subdir: default_pictures_subdir(),
            image_extension: default_image_extension(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl FetchConfig {
    /// Check that every setting is usable
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::config("concurrency", "concurrency must be at least 1"));
        }
        if self.buffer_size == 0 {
            return Err(Error::config("buffer_size", "buffer_size must be non-zero"));
        }
        if self.item_timeout.is_zero() {
            return Err(Error::config("item_timeout", "item_timeout must be non-zero"));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::config(
                "connect_timeout",
                "connect_timeout must be non-zero",
            ));
        }
        if self.image_extension.trim().is_empty() {
            return Err(Error::config(
                "image_extension",
                "image_extension must not be empty",
            ));
        }
        if self.event_capacity == 0 {
            return Err(Error::config(
                "event_capacity",
                "event_capacity must be at least 1",
            ));
        }
        Ok(())
    }

    /// Copy buffer size actually used by transfers
    pub fn effective_buffer_size(&self) -> usize {
        self.buffer_size.clamp(MIN_BUFFER_SIZE, MAX_BUFFER_SIZE)
    }

    /// Directory that holds all campaign folders
    pub fn pictures_dir(&self) -> PathBuf {
        self.files_dir.join(&self.pictures_subdir)
    }
}

fn default_concurrency() -> usize {
    10
}

fn default_item_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_buffer_size() -> usize {
    8 * 1024
}

fn default_user_agent() -> String {
    format!("fetch-dl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_files_dir() -> PathBuf {
    PathBuf::from("./files")
}

fn default_pictures_subdir() -> String {
    "pics".to_string()
}

fn default_image_extension() -> String {
    "png".to_string()
}

fn default_event_capacity() -> usize {
    256
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_uses_defaults() {
        let config: FetchConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.item_timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.buffer_size, 8192);
        assert_eq!(config.pictures_subdir, "pics");
        assert_eq!(config.image_extension, "png");
        assert!(config.user_agent.starts_with("fetch-dl/"));
        config.validate().unwrap();
    }

    #[test]
    fn timeouts_are_seconds_on_the_wire() {
        let config: FetchConfig =
            serde_json::from_str(r#"{"item_timeout": 5, "connect_timeout": 2}"#).unwrap();
        assert_eq!(config.item_timeout, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["item_timeout"], 5);
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let config = FetchConfig {
            concurrency: 0,
            ..Default::default()
        };
        match config.validate() {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("concurrency")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_timeout_and_empty_extension() {
        let config = FetchConfig {
            item_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = FetchConfig {
            image_extension: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn buffer_size_is_clamped() {
        let small = FetchConfig {
            buffer_size: 16,
            ..Default::default()
        };
        assert_eq!(small.effective_buffer_size(), MIN_BUFFER_SIZE);

        let large = FetchConfig {
            buffer_size: 1 << 20,
            ..Default::default()
        };
        assert_eq!(large.effective_buffer_size(), MAX_BUFFER_SIZE);
    }

    #[test]
    fn pictures_dir_joins_subdir() {
        let config = FetchConfig {
            files_dir: PathBuf::from("/data/files"),
            ..Default::default()
        };
        assert_eq!(config.pictures_dir(), PathBuf::from("/data/files/pics"));
    }
}
