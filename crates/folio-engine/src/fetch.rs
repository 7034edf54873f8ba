use folio_common::protocol::{DiscoveredItem, FetchedItem};
use futures::{StreamExt, stream};
use reqwest::header::CONTENT_TYPE;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub max_concurrency: usize,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            request_timeout: Duration::from_secs(15),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::Timeout(err.to_string());
    }
    FetchError::Network(err.to_string())
}

pub fn build_client(settings: &FetchSettings) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .timeout(settings.request_timeout)
        .user_agent(settings.user_agent.clone())
        .build()
        .map_err(|err| FetchError::Network(err.to_string()))
}

/// Download every item into `dest`, at most `max_concurrency` at a time.
///
/// Individual failures are logged and left out of the result; only failing to
/// prepare the destination or the HTTP client is an error. Result order follows
/// completion order.
pub async fn fetch_all(
    items: &[DiscoveredItem],
    dest: &Path,
    settings: &FetchSettings,
) -> Result<Vec<FetchedItem>, FetchError> {
    tokio::fs::create_dir_all(dest).await?;
    let client = build_client(settings)?;
    let limit = settings.max_concurrency.max(1);

    info!("Starting batch download of {} images ({} at a time)...", items.len(), limit);
    let fetched: Vec<FetchedItem> = stream::iter(items)
        .map(|item| {
            let client = client.clone();
            async move {
                match fetch_one(&client, item, dest).await {
                    Ok(fetched) => {
                        info!("Downloaded: {}", fetched.path.display());
                        Some(fetched)
                    }
                    Err(e) => {
                        warn!("Failed to download {} ({}): {}", item.id, item.source, e);
                        None
                    }
                }
            }
        })
        .buffer_unordered(limit)
        .filter_map(|fetched| async move { fetched })
        .collect()
        .await;

    info!("Downloaded {}/{} images", fetched.len(), items.len());
    Ok(fetched)
}

/// Single attempt at one item, streamed to `dest/<id>.<ext>`.
pub async fn fetch_one(
    client: &reqwest::Client,
    item: &DiscoveredItem,
    dest: &Path,
) -> Result<FetchedItem, FetchError> {
    let url = reqwest::Url::parse(&item.source)
        .map_err(|err| FetchError::InvalidUrl(err.to_string()))?;

    let response = client.get(url).send().await.map_err(map_reqwest_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());
    let ext = extension_from_url(&item.source)
        .unwrap_or_else(|| extension_from_content_type(content_type.as_deref()).to_string());
    let path = dest.join(format!("{}.{}", item.id, ext));

    if let Err(e) = write_body(response, &path).await {
        if let Err(cleanup) = tokio::fs::remove_file(&path).await {
            debug!("Could not remove partial {}: {}", path.display(), cleanup);
        }
        return Err(e);
    }

    Ok(FetchedItem {
        id: item.id.clone(),
        path,
        sequence: item.sequence,
    })
}

async fn write_body(response: reqwest::Response, path: &Path) -> Result<(), FetchError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}

/// Lowercased extension of the URL's last path segment, ignoring the query.
pub fn extension_from_url(source: &str) -> Option<String> {
    let url = url::Url::parse(source).ok()?;
    let segment = url.path_segments()?.next_back()?;
    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn extension_from_content_type(content_type: Option<&str>) -> &'static str {
    let Some(content_type) = content_type else {
        return "jpg";
    };
    let content_type = content_type.to_ascii_lowercase();
    if content_type.contains("png") {
        "png"
    } else if content_type.contains("gif") {
        "gif"
    } else if content_type.contains("webp") {
        "webp"
    } else {
        "jpg"
    }
}
