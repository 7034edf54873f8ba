//! Incremental harvest loop: sample the viewport, scroll one viewport, repeat
//! until a scroll step makes no progress.

use crate::backend::{Renderer, RendererError};
use crate::collect::collect;
use crate::scroll;
use folio_common::protocol::{DiscoveredItem, ItemPattern, ScrollTarget};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Delay after each scroll before measuring and sampling.
    pub settle: Duration,
    pub pattern: ItemPattern,
    /// Safety cap on scroll steps; `None` runs until progress stops.
    pub max_steps: Option<usize>,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(2),
            pattern: ItemPattern::default(),
            max_steps: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestState {
    Sampling,
    Scrolling,
    Terminated,
}

/// State of one harvest run.
#[derive(Debug, Clone)]
pub struct HarvestSession {
    pub target: ScrollTarget,
    discovered: Vec<DiscoveredItem>,
    seen: HashSet<String>,
    last_reached: Option<f64>,
    steps: usize,
    interrupted: Option<String>,
}

impl HarvestSession {
    pub fn new(target: ScrollTarget) -> Self {
        Self {
            target,
            discovered: Vec::new(),
            seen: HashSet::new(),
            last_reached: None,
            steps: 0,
            interrupted: None,
        }
    }

    /// Merge items by id; returns how many were new.
    pub fn merge(&mut self, items: impl IntoIterator<Item = DiscoveredItem>) -> usize {
        let mut added = 0;
        for item in items {
            if self.seen.insert(item.id.clone()) {
                debug!("Discovered {}", item.id);
                self.discovered.push(item);
                added += 1;
            }
        }
        added
    }

    /// Record a progress reading. Readings never move backwards.
    fn record(&mut self, reached: f64) {
        self.last_reached = Some(self.last_reached.map_or(reached, |last| last.max(reached)));
        self.steps += 1;
    }

    pub fn discovered(&self) -> &[DiscoveredItem] {
        &self.discovered
    }

    pub fn into_items(self) -> Vec<DiscoveredItem> {
        self.discovered
    }

    pub fn len(&self) -> usize {
        self.discovered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.discovered.is_empty()
    }

    pub fn last_reached(&self) -> Option<f64> {
        self.last_reached
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// The renderer error that ended scrolling before the bottom was reached.
    pub fn interrupted(&self) -> Option<&str> {
        self.interrupted.as_deref()
    }
}

/// Run the loop against `target`, entering its frame first and leaving it on
/// every exit path.
///
/// Only a failure to enter the target's frame is an error. A renderer error
/// mid-run ends the loop and the items found so far are returned, with the
/// error kept in [`HarvestSession::interrupted`].
pub async fn harvest(
    renderer: &mut dyn Renderer,
    target: &ScrollTarget,
    options: &HarvestOptions,
) -> Result<HarvestSession, RendererError> {
    let Some(frame) = target.frame() else {
        return Ok(run_loop(renderer, target, options).await);
    };

    renderer.enter_frame(frame).await?;
    let session = run_loop(renderer, target, options).await;
    if let Err(e) = renderer.exit_frame().await {
        warn!("Failed to leave iframe {}: {}", frame + 1, e);
    }
    Ok(session)
}

async fn run_loop(
    renderer: &mut dyn Renderer,
    target: &ScrollTarget,
    options: &HarvestOptions,
) -> HarvestSession {
    let mut session = HarvestSession::new(target.clone());
    let mut state = HarvestState::Sampling;

    info!("Starting viewport-by-viewport scrolling of {} to collect images...", target);
    while state != HarvestState::Terminated {
        state = match state {
            HarvestState::Sampling => {
                // A failed sample counts as an empty one; the next viewport is still tried.
                match collect(renderer, target, &options.pattern).await {
                    Ok(visible) => {
                        let added = session.merge(visible);
                        if added > 0 {
                            info!("Found {} new image(s), {} total", added, session.len());
                        }
                    }
                    Err(e) => warn!("Failed to sample visible images: {}", e),
                }
                HarvestState::Scrolling
            }
            HarvestState::Scrolling => {
                if options.max_steps.is_some_and(|max| session.steps() >= max) {
                    info!("Stopped after {} scroll steps", session.steps());
                    HarvestState::Terminated
                } else {
                    match scroll::step(renderer, target, options.settle).await {
                        Ok((previous, new)) => {
                            session.record(new);
                            if new == previous {
                                info!("Reached bottom of {}!", target);
                                HarvestState::Terminated
                            } else {
                                info!("Scrolled to: {}", new);
                                HarvestState::Sampling
                            }
                        }
                        Err(e) => {
                            warn!("Scrolling stopped early after {} step(s): {}", session.steps(), e);
                            session.interrupted = Some(e.to_string());
                            HarvestState::Terminated
                        }
                    }
                }
            }
            HarvestState::Terminated => HarvestState::Terminated,
        };
    }

    info!("Found {} unique images to download", session.len());
    session
}
