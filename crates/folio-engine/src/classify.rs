//! Viewport classification: decide which region of the page actually scrolls.

use crate::backend::{Renderer, RendererError};
use folio_common::protocol::{Scope, ScrollTarget};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Scroll target classification unavailable: {0}")]
    Unavailable(#[from] RendererError),
}

/// Pick the scroll target of the current page, first match wins:
/// the main document's reserved container, then each iframe (its container,
/// then its own document), then the main document itself.
pub async fn classify(
    renderer: &mut dyn Renderer,
    container_id: &str,
) -> Result<ScrollTarget, ClassifyError> {
    match container_overflows(renderer, container_id).await {
        Ok(true) => {
            info!("Using div#{} for scrolling", container_id);
            return Ok(ScrollTarget::NestedContainer {
                container: container_id.to_string(),
            });
        }
        Ok(false) => {}
        Err(e) => debug!("div#{} lookup failed: {}", container_id, e),
    }

    let frames = renderer.frame_count().await?;
    info!("Found {} iframe(s)", frames);

    for index in 0..frames {
        match probe_frame(renderer, index, container_id).await {
            Ok(Some(target)) => {
                info!("Using {} for scrolling", target);
                return Ok(target);
            }
            Ok(None) => debug!("iframe {} does not scroll", index + 1),
            Err(e) => warn!("Skipping iframe {}: {}", index + 1, e),
        }
    }

    info!("Using main page for scrolling");
    Ok(ScrollTarget::MainDocument)
}

/// Like [`classify`], but any top-level failure degrades to the main document.
pub async fn classify_or_default(renderer: &mut dyn Renderer, container_id: &str) -> ScrollTarget {
    match classify(renderer, container_id).await {
        Ok(target) => target,
        Err(e) => {
            warn!("{}; falling back to main page", e);
            ScrollTarget::MainDocument
        }
    }
}

async fn container_overflows(
    renderer: &mut dyn Renderer,
    container_id: &str,
) -> Result<bool, RendererError> {
    if !renderer.has_element(container_id).await? {
        return Ok(false);
    }
    let extent = renderer
        .get_extent(&Scope::Element(container_id.to_string()))
        .await?;
    debug!(
        "div#{} scrollHeight={} clientHeight={}",
        container_id, extent.scroll_height, extent.client_height
    );
    Ok(extent.overflows())
}

/// Probe one iframe. The outer context is restored on every path.
async fn probe_frame(
    renderer: &mut dyn Renderer,
    index: usize,
    container_id: &str,
) -> Result<Option<ScrollTarget>, RendererError> {
    renderer.enter_frame(index).await?;
    let verdict = frame_verdict(renderer, index, container_id).await;
    let restored = renderer.exit_frame().await;

    match (verdict, restored) {
        (Ok(target), Ok(())) => Ok(target),
        (Err(e), _) | (Ok(_), Err(e)) => Err(e),
    }
}

async fn frame_verdict(
    renderer: &mut dyn Renderer,
    index: usize,
    container_id: &str,
) -> Result<Option<ScrollTarget>, RendererError> {
    // A broken container lookup inside the frame still lets the frame's own document qualify.
    if container_overflows(renderer, container_id)
        .await
        .unwrap_or(false)
    {
        return Ok(Some(ScrollTarget::FrameNestedContainer {
            frame: index,
            container: container_id.to_string(),
        }));
    }

    let extent = renderer.get_extent(&Scope::Document).await?;
    if extent.overflows() {
        return Ok(Some(ScrollTarget::Frame { frame: index }));
    }
    Ok(None)
}
