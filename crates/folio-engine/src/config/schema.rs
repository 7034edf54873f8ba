use crate::fetch::{DEFAULT_USER_AGENT, FetchSettings};
use crate::harvest::HarvestOptions;
use folio_common::protocol::{DEFAULT_CONTAINER_ID, DEFAULT_ITEM_PREFIX, ItemPattern, PageFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolioConfig {
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
}

impl FolioConfig {
    pub fn harvest_options(&self) -> HarvestOptions {
        HarvestOptions {
            settle: Duration::from_millis(self.scroll.scroll_delay_ms),
            pattern: ItemPattern::new(&self.scroll.item_prefix),
            max_steps: self.scroll.max_scroll_steps,
        }
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            max_concurrency: self.fetch.max_concurrency,
            request_timeout: Duration::from_millis(self.fetch.request_timeout_ms),
            user_agent: self.fetch.user_agent.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollConfig {
    #[serde(default = "default_scroll_delay_ms")]
    pub scroll_delay_ms: u64,
    /// Pause after the body appears, before classification.
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,
    #[serde(default = "default_body_timeout_ms")]
    pub body_timeout_ms: u64,
    #[serde(default = "default_container_id")]
    pub container_id: String,
    #[serde(default = "default_item_prefix")]
    pub item_prefix: String,
    #[serde(default)]
    pub max_scroll_steps: Option<usize>,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            scroll_delay_ms: default_scroll_delay_ms(),
            startup_delay_ms: default_startup_delay_ms(),
            body_timeout_ms: default_body_timeout_ms(),
            container_id: default_container_id(),
            item_prefix: default_item_prefix(),
            max_scroll_steps: None,
        }
    }
}

fn default_scroll_delay_ms() -> u64 {
    2000
}

fn default_startup_delay_ms() -> u64 {
    3000
}

fn default_body_timeout_ms() -> u64 {
    10000
}

fn default_container_id() -> String {
    DEFAULT_CONTAINER_ID.to_string()
}

fn default_item_prefix() -> String {
    DEFAULT_ITEM_PREFIX.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            request_timeout_ms: default_request_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_max_concurrency() -> usize {
    5
}

fn default_request_timeout_ms() -> u64 {
    15000
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_images_root")]
    pub images_root: PathBuf,
    #[serde(default = "default_documents_root")]
    pub documents_root: PathBuf,
    #[serde(default)]
    pub page_format: PageFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            images_root: default_images_root(),
            documents_root: default_documents_root(),
            page_format: PageFormat::default(),
        }
    }
}

fn default_images_root() -> PathBuf {
    PathBuf::from("downloaded_images")
}

fn default_documents_root() -> PathBuf {
    PathBuf::from("downloaded")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Show the browser window instead of running headless.
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,
}
