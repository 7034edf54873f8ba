use crate::backend::{Renderer, RendererError};
use folio_common::protocol::{DiscoveredItem, ElementProbe, ItemPattern, Scope, ScrollTarget};
use tracing::trace;

/// Page items currently inside the viewport of the current frame context.
///
/// Elements are looked up inside the container for container targets and
/// document-wide otherwise.
pub async fn collect(
    renderer: &mut dyn Renderer,
    target: &ScrollTarget,
    pattern: &ItemPattern,
) -> Result<Vec<DiscoveredItem>, RendererError> {
    let probes = renderer
        .find_by_id_prefix(&target.scope(), pattern.prefix())
        .await?;
    let viewport_height = renderer.get_extent(&Scope::Document).await?.client_height;

    Ok(visible_items(&probes, viewport_height, pattern))
}

/// Filter probes down to displayed, correctly named items whose top edge lies
/// within `[0, viewport_height]`.
pub fn visible_items(
    probes: &[ElementProbe],
    viewport_height: f64,
    pattern: &ItemPattern,
) -> Vec<DiscoveredItem> {
    probes
        .iter()
        .filter(|probe| is_visible(probe, viewport_height))
        .filter_map(|probe| {
            if !pattern.matches(&probe.id) {
                trace!("Ignoring {}: id does not match", probe.id);
                return None;
            }
            let source = probe.src.as_deref().filter(|src| !src.is_empty())?;
            Some(pattern.item(&probe.id, source))
        })
        .collect()
}

fn is_visible(probe: &ElementProbe, viewport_height: f64) -> bool {
    probe.displayed && probe.height > 0.0 && probe.top >= 0.0 && probe.top <= viewport_height
}
