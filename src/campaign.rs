//! Campaign image requests
//!
//! Callers hand over a list of `{ "img": <url>, "value": <name> }` records and a
//! campaign name. Each record becomes a [`DownloadItem`] stored at
//! `<files_dir>/<pictures_subdir>/<campaign>/<name>.<ext>`, the batch is run,
//! and the records come back in the same order with `img` pointing at the
//! local file.
//!
//! ```no_run
//! use fetch_dl::{BatchDownloader, FetchConfig, campaign};
//!
//! # async fn example() -> fetch_dl::Result<()> {
//! let downloader = BatchDownloader::new(FetchConfig::default())?;
//! let response = campaign::fetch_images_json(
//!     &downloader,
//!     r#"{"campaign": "spring", "images": [{"img": "https://cdn.example.com/1.png", "value": "Blue!"}]}"#,
//! )
//! .await?;
//! println!("{response}");
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::config::FetchConfig;
use crate::downloader::BatchDownloader;
use crate::error::{Error, Result};
use crate::types::{DownloadItem, DownloadOutcome, OutcomeStatus};
use crate::utils::sanitize_name;

/// Campaign used when the caller does not name one
pub const FALLBACK_CAMPAIGN: &str = "fallback";

/// One image entry as exchanged with the calling layer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Remote URL on the way in, local path on the way out
    pub img: String,
    /// Name the image is stored under; numbers are accepted and kept as text
    #[serde(
        default,
        deserialize_with = "name_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<String>,
    /// Any other fields, echoed back untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A campaign download request
#[derive(Clone, Debug, Deserialize)]
pub struct ImageRequest {
    /// Images to fetch; accepts a JSON array or a string containing one
    #[serde(deserialize_with = "images_array_or_string")]
    pub images: Vec<ImageRecord>,
    /// Campaign folder name
    #[serde(default)]
    pub campaign: Option<String>,
}

impl ImageRequest {
    /// Parse a request from its JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidRequest(e.to_string()))
    }
}

/// Result for one image, echoing the caller's record
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageResult {
    /// The caller's record with `img` replaced by the local path and `value` by the stored name
    #[serde(flatten)]
    pub record: ImageRecord,
    /// How the download went
    #[serde(flatten)]
    pub outcome: OutcomeStatus,
}

/// A request resolved into download items
#[derive(Clone, Debug)]
pub struct CampaignBatch {
    /// Sanitized campaign name
    pub campaign: String,
    /// Directory holding the campaign's images
    pub directory: PathBuf,
    /// One item per record, in request order
    pub items: Vec<DownloadItem>,
    records: Vec<ImageRecord>,
}

impl CampaignBatch {
    /// Resolve every record of `request` to a destination under `config`'s picture store.
    ///
    /// Names are stripped of everything but word characters and whitespace. A
    /// record with no usable name is stored under its index. Names that end up
    /// equal to an earlier one get `_<index>` appended, so every record has its
    /// own destination.
    pub fn plan(request: ImageRequest, config: &FetchConfig) -> Self {
        let campaign = request
            .campaign
            .as_deref()
            .map(sanitize_name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_CAMPAIGN.to_string());
        let directory = config.pictures_dir().join(&campaign);

        let mut items = Vec::with_capacity(request.images.len());
        let mut records = Vec::with_capacity(request.images.len());
        let mut used = HashSet::with_capacity(request.images.len());
        for (index, mut record) in request.images.into_iter().enumerate() {
            let base = record
                .value
                .as_deref()
                .map(sanitize_name)
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| index.to_string());
            let name = unique_name(&mut used, base, index);

            let destination = directory.join(format!("{name}.{}", config.image_extension));
            items.push(DownloadItem::new(
                format!("{campaign}/{name}"),
                record.img.clone(),
                destination,
            ));
            record.value = Some(name);
            records.push(record);
        }

        Self {
            campaign,
            directory,
            items,
            records,
        }
    }

    /// Pair each record with its outcome.
    ///
    /// `outcomes` must be the result of running `self.items`, in the same order.
    pub fn respond(self, outcomes: Vec<DownloadOutcome>) -> Vec<ImageResult> {
        self.records
            .into_iter()
            .zip(outcomes)
            .map(|(mut record, outcome)| {
                record.img = outcome.destination_path.to_string_lossy().into_owned();
                ImageResult {
                    record,
                    outcome: outcome.status,
                }
            })
            .collect()
    }
}

/// Download every image of a campaign request with the downloader's default concurrency.
pub async fn fetch_images(
    downloader: &BatchDownloader,
    request: ImageRequest,
) -> Result<Vec<ImageResult>> {
    let batch = CampaignBatch::plan(request, downloader.config());
    tracing::info!(
        campaign = %batch.campaign,
        images = batch.items.len(),
        directory = %batch.directory.display(),
        "Fetching campaign images"
    );

    let outcomes = downloader.run(batch.items.clone()).await?;
    Ok(batch.respond(outcomes))
}

/// JSON in, JSON out variant of [`fetch_images`].
pub async fn fetch_images_json(downloader: &BatchDownloader, request: &str) -> Result<String> {
    let request = ImageRequest::from_json(request)?;
    let results = fetch_images(downloader, request).await?;
    Ok(serde_json::to_string(&results)?)
}

/// Reserve `base` in `used`, or the first free `base_<index>[_<n>]` if it is taken.
fn unique_name(used: &mut HashSet<String>, base: String, index: usize) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    let mut candidate = format!("{base}_{index}");
    let mut n = 1;
    while used.contains(&candidate) {
        candidate = format!("{base}_{index}_{n}");
        n += 1;
    }
    tracing::debug!(name = %base, renamed = %candidate, "Image name already taken in campaign");
    used.insert(candidate.clone());
    candidate
}

fn images_array_or_string<'de, D>(deserializer: D) -> std::result::Result<Vec<ImageRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(encoded) => serde_json::from_str(&encoded).map_err(|e| {
            serde::de::Error::custom(format!("images string is not a JSON array of images: {e}"))
        }),
        images => serde_json::from_value(images)
            .map_err(|e| serde::de::Error::custom(format!("invalid images: {e}"))),
    }
}

fn name_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(name) => Ok(Some(name)),
        Value::Number(number) => Ok(Some(number.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "value must be a string or a number, got {other}"
        ))),
    }
}
