//! End-to-end run: open the page, classify, harvest, fetch, assemble.

use crate::assemble::{AssembleError, assemble};
use crate::backend::{Renderer, RendererError};
use crate::classify::classify_or_default;
use crate::config::FolioConfig;
use crate::fetch::{FetchError, fetch_all};
use crate::harvest::harvest;
use crate::scroll::scroll_to_end;
use crate::session::{OutputArtifact, SessionId, normalize_url};
use folio_common::protocol::ScrollTarget;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Scroll to the bottom and stop.
    ScrollOnly,
    /// Harvest page images and assemble them into a PDF.
    Download,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config: FolioConfig,
    pub mode: RunMode,
    /// Leave the browser running; the caller becomes responsible for closing it.
    pub keep_open: bool,
}

/// Failures that prevent a run from producing anything.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to launch browser: {0}")]
    Launch(#[source] RendererError),
    #[error("Failed to open page: {0}")]
    Navigation(#[source] RendererError),
    #[error("Page body did not appear: {0}")]
    BodyTimeout(#[source] RendererError),
    #[error("Scrolling failed: {0}")]
    Harvest(#[source] RendererError),
    #[error("Could not prepare downloads: {0}")]
    Fetch(#[from] FetchError),
    #[error("Assembly task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Outcome of a run. Always reports how many items were attempted and how many made it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HarvestReport {
    pub success: bool,
    pub url: String,
    pub target: Option<ScrollTarget>,
    pub images_dir: Option<PathBuf>,
    pub pdf_path: Option<PathBuf>,
    pub discovered_count: usize,
    pub downloaded_count: usize,
    pub page_count: usize,
    /// Content height after a scroll-only run.
    pub final_height: Option<f64>,
    pub error: Option<String>,
    /// Scrolling stopped on a renderer error; later pages may be missing.
    pub truncated: bool,
    /// The browser session itself failed; nothing was harvested.
    pub fatal: bool,
}

impl HarvestReport {
    fn failed(url: &str, err: &SessionError) -> Self {
        Self {
            url: url.to_string(),
            error: Some(err.to_string()),
            fatal: true,
            ..Self::default()
        }
    }
}

/// Run one session against `renderer`.
///
/// The renderer is closed on every path unless `keep_open` is set.
pub async fn run(renderer: &mut dyn Renderer, url: &str, options: &RunOptions) -> HarvestReport {
    let url = normalize_url(url);
    let result = drive(renderer, &url, options).await;

    if options.keep_open {
        info!("Browser kept open. Close it when done.");
    } else if let Err(e) = renderer.close().await {
        warn!("Failed to close browser: {}", e);
    }

    match result {
        Ok(report) => report,
        Err(e) => {
            error!("Error occurred: {}", e);
            HarvestReport::failed(&url, &e)
        }
    }
}

async fn drive(
    renderer: &mut dyn Renderer,
    url: &str,
    options: &RunOptions,
) -> Result<HarvestReport, SessionError> {
    let config = &options.config;
    let session = SessionId::new(url);

    renderer.launch().await.map_err(SessionError::Launch)?;
    info!("Opening URL: {}", url);
    renderer
        .navigate(url)
        .await
        .map_err(SessionError::Navigation)?;
    renderer
        .wait_for_body(Duration::from_millis(config.scroll.body_timeout_ms))
        .await
        .map_err(SessionError::BodyTimeout)?;
    if config.scroll.startup_delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(config.scroll.startup_delay_ms)).await;
    }

    let target = classify_or_default(renderer, &config.scroll.container_id).await;
    let mut report = HarvestReport {
        url: url.to_string(),
        target: Some(target.clone()),
        ..HarvestReport::default()
    };

    if options.mode == RunMode::ScrollOnly {
        let height = scroll_to_end(
            renderer,
            &target,
            Duration::from_millis(config.scroll.scroll_delay_ms),
            config.scroll.max_scroll_steps,
        )
        .await
        .map_err(SessionError::Harvest)?;
        report.success = true;
        report.final_height = Some(height);
        return Ok(report);
    }

    let harvested = harvest(renderer, &target, &config.harvest_options())
        .await
        .map_err(SessionError::Harvest)?;
    if let Some(reason) = harvested.interrupted() {
        warn!("Continuing with {} image(s) found before the error", harvested.len());
        report.truncated = true;
        report.error = Some(format!("Scrolling stopped early: {}", reason));
    }
    let discovered = harvested.into_items();
    report.discovered_count = discovered.len();
    if discovered.is_empty() {
        report
            .error
            .get_or_insert_with(|| "No images found to download".to_string());
        return Ok(report);
    }

    let artifact = OutputArtifact::new(
        &session,
        &config.output.images_root,
        &config.output.documents_root,
    );
    info!("Images will be saved to: {}", artifact.items_dir.display());
    info!("PDF will be saved to: {}", artifact.document_path.display());

    let fetched = fetch_all(&discovered, &artifact.items_dir, &config.fetch_settings()).await?;
    report.downloaded_count = fetched.len();
    report.images_dir = Some(artifact.items_dir.clone());
    if fetched.is_empty() {
        report.error = Some(format!(
            "All {} downloads failed",
            report.discovered_count
        ));
        return Ok(report);
    }

    info!("Download completed! Creating PDF...");
    let document_path = artifact.document_path.clone();
    let format = config.output.page_format;
    let assembled =
        tokio::task::spawn_blocking(move || assemble(&fetched, &document_path, format)).await?;

    match assembled {
        Ok(outcome) => {
            info!("PDF created: {}", outcome.path.display());
            report.success = true;
            report.page_count = outcome.pages;
            report.pdf_path = Some(outcome.path);
        }
        Err(AssembleError::NoPages) => {
            report.error = Some(format!(
                "None of the {} downloaded images could be rendered",
                report.downloaded_count
            ));
        }
        Err(e) => {
            report.error = Some(format!("Failed to create PDF: {}", e));
        }
    }
    Ok(report)
}
