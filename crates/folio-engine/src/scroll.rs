//! Scroll driver. Both modes measure progress with [`Extent::reached`], the
//! bottom edge of the viewport in content coordinates: a reading that did not
//! move since the previous one means the end has been reached.
//!
//! [`step`] addresses the current frame context (the harvest loop enters the
//! target's frame once for the whole session); [`scroll_to_end`] is a
//! standalone mode and enters the frame itself.

use crate::backend::{Renderer, RendererError};
use folio_common::protocol::{Extent, ScrollTarget};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Advance the target by one viewport, wait `settle`, and return
/// `(previous, new)` progress readings.
pub async fn step(
    renderer: &mut dyn Renderer,
    target: &ScrollTarget,
    settle: Duration,
) -> Result<(f64, f64), RendererError> {
    let scope = target.scope();
    let before = renderer.get_extent(&scope).await?;
    renderer
        .set_scroll(&scope, before.scroll_top + before.client_height)
        .await?;
    settle_for(settle).await;
    let after = renderer.get_extent(&scope).await?;

    debug!(
        "Scrolled {}: {} -> {} (content height {})",
        target,
        before.reached(),
        after.reached(),
        after.scroll_height
    );
    Ok((before.reached(), after.reached()))
}

/// Jump straight to the bottom until two consecutive readings agree on both
/// progress and content height. Returns the final content height.
pub async fn scroll_to_end(
    renderer: &mut dyn Renderer,
    target: &ScrollTarget,
    settle: Duration,
    max_steps: Option<usize>,
) -> Result<f64, RendererError> {
    let Some(frame) = target.frame() else {
        return jump_until_stable(renderer, target, settle, max_steps).await;
    };

    renderer.enter_frame(frame).await?;
    let result = jump_until_stable(renderer, target, settle, max_steps).await;
    if let Err(e) = renderer.exit_frame().await {
        warn!("Failed to leave iframe {}: {}", frame + 1, e);
    }
    result
}

async fn jump_until_stable(
    renderer: &mut dyn Renderer,
    target: &ScrollTarget,
    settle: Duration,
    max_steps: Option<usize>,
) -> Result<f64, RendererError> {
    let scope = target.scope();
    let mut last = renderer.get_extent(&scope).await?;
    let mut steps = 0usize;

    info!("Starting auto-scroll to bottom of {}...", target);
    loop {
        renderer.set_scroll(&scope, last.scroll_height).await?;
        settle_for(settle).await;
        let current: Extent = renderer.get_extent(&scope).await?;
        steps += 1;

        // Content that grew during the settle leaves `reached` unchanged but
        // moves the bottom, so another jump is needed.
        if current.reached() == last.reached() && current.scroll_height == last.scroll_height {
            info!("Reached bottom! (height: {})", current.scroll_height);
            return Ok(current.scroll_height);
        }
        if max_steps.is_some_and(|max| steps >= max) {
            info!("Stopped after {} scroll steps (height: {})", steps, current.scroll_height);
            return Ok(current.scroll_height);
        }

        info!("Scrolling {}... (height: {})", target, current.scroll_height);
        last = current;
    }
}

async fn settle_for(settle: Duration) {
    if !settle.is_zero() {
        tokio::time::sleep(settle).await;
    }
}
