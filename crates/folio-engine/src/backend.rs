use async_trait::async_trait;
pub use folio_common::error::RendererError;
use folio_common::protocol::{ElementProbe, Extent, NavigationResult, Scope};
use std::time::Duration;

/// The Renderer trait is the capability interface every browser engine must implement.
///
/// Frame context is a stack owned by the renderer: `enter_frame` descends into an
/// iframe of the current context and `exit_frame` returns to its parent. All
/// other primitives address the current context.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Launch the browser process and open a blank page.
    async fn launch(&mut self) -> Result<(), RendererError>;

    /// Close the browser and cleanup resources.
    async fn close(&mut self) -> Result<(), RendererError>;

    async fn is_ready(&self) -> bool;

    /// Navigate to a specific URL.
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, RendererError>;

    /// Wait until the document has a `body` element.
    async fn wait_for_body(&mut self, timeout: Duration) -> Result<(), RendererError>;

    /// Number of iframes in the current context, in document order.
    async fn frame_count(&mut self) -> Result<usize, RendererError>;

    async fn enter_frame(&mut self, index: usize) -> Result<(), RendererError>;

    async fn exit_frame(&mut self) -> Result<(), RendererError>;

    /// Whether an element with this id exists in the current context.
    async fn has_element(&mut self, id: &str) -> Result<bool, RendererError>;

    async fn get_extent(&mut self, scope: &Scope) -> Result<Extent, RendererError>;

    /// Set the vertical scroll offset of a scope. The browser clamps it to the maximum.
    async fn set_scroll(&mut self, scope: &Scope, top: f64) -> Result<(), RendererError>;

    /// Elements inside `scope` whose id starts with `prefix`.
    async fn find_by_id_prefix(
        &mut self,
        scope: &Scope,
        prefix: &str,
    ) -> Result<Vec<ElementProbe>, RendererError>;
}

