use crate::cdp::{CdpClient, LaunchOptions};
use crate::inject::{evaluate, in_frame, scope_root};
use async_trait::async_trait;
use folio_engine::backend::{Renderer, RendererError};
use folio_engine::protocol::{ElementProbe, Extent, NavigationResult, Scope};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

const BODY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Chromium driven over CDP. Frame context is tracked as a path of iframe
/// indices from the top-level document; every script is routed through it.
pub struct HeadlessRenderer {
    client: Option<CdpClient>,
    options: LaunchOptions,
    frames: Vec<usize>,
}

impl HeadlessRenderer {
    pub fn new(options: LaunchOptions) -> Self {
        Self {
            client: None,
            options,
            frames: Vec::new(),
        }
    }

    pub fn get_client(&self) -> Option<&CdpClient> {
        self.client.as_ref()
    }

    /// Current frame path, outermost first.
    pub fn frame_path(&self) -> &[usize] {
        &self.frames
    }

    fn page(&self) -> Result<&chromiumoxide::Page, RendererError> {
        self.client
            .as_ref()
            .map(|client| &client.page)
            .ok_or(RendererError::NotReady)
    }

    async fn run<T: serde::de::DeserializeOwned>(&self, body: &str) -> Result<T, RendererError> {
        let page = self.page()?;
        evaluate(page, &in_frame(&self.frames, body)).await
    }

    async fn get_navigation_result(
        page: &chromiumoxide::Page,
    ) -> Result<NavigationResult, RendererError> {
        let title = page
            .get_title()
            .await
            .unwrap_or_default()
            .unwrap_or_default();
        let url = page
            .url()
            .await
            .map_err(|e| RendererError::Navigation(e.to_string()))?
            .unwrap_or_default();
        Ok(NavigationResult { url, title })
    }
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new(LaunchOptions::default())
    }
}

fn container_of(scope: &Scope) -> Option<&str> {
    match scope {
        Scope::Document => None,
        Scope::Element(id) => Some(id.as_str()),
    }
}

fn extent_script(scope: &Scope) -> String {
    match scope {
        Scope::Document => "const el = doc.scrollingElement || doc.documentElement;
  return {
    scroll_top: win.pageYOffset || el.scrollTop || 0,
    scroll_height: Math.max(el.scrollHeight, doc.body ? doc.body.scrollHeight : 0),
    client_height: win.innerHeight
  };"
        .to_string(),
        Scope::Element(_) => format!(
            "const el = {};
  return {{ scroll_top: el.scrollTop, scroll_height: el.scrollHeight, client_height: el.clientHeight }};",
            scope_root(container_of(scope))
        ),
    }
}

fn scroll_script(scope: &Scope, top: f64) -> String {
    match scope {
        Scope::Document => format!("win.scrollTo(0, {}); return true;", top),
        Scope::Element(_) => format!(
            "{}.scrollTop = {}; return true;",
            scope_root(container_of(scope)),
            top
        ),
    }
}

fn probe_script(scope: &Scope, prefix: &str) -> String {
    let root = match scope {
        Scope::Document => "doc".to_string(),
        Scope::Element(_) => scope_root(container_of(scope)),
    };
    let prefix = serde_json::to_string(prefix).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "const root = {root};
  return Array.from(root.querySelectorAll('[id]'))
    .filter((e) => e.id.startsWith({prefix}))
    .map((e) => {{
      const rect = e.getBoundingClientRect();
      const style = win.getComputedStyle(e);
      return {{
        id: e.id,
        src: e.currentSrc || e.src || e.getAttribute('src'),
        top: rect.top,
        height: rect.height,
        displayed: style.display !== 'none' && style.visibility !== 'hidden' && rect.width > 0
      }};
    }});"
    )
}

#[async_trait]
impl Renderer for HeadlessRenderer {
    async fn launch(&mut self) -> Result<(), RendererError> {
        info!("Launching Headless Renderer (Chromium)...");
        let client = CdpClient::launch(&self.options)
            .await
            .map_err(|e| RendererError::Launch(e.to_string()))?;
        self.client = Some(client);
        self.frames.clear();
        Ok(())
    }

    async fn close(&mut self) -> Result<(), RendererError> {
        self.frames.clear();
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| RendererError::Other(e.to_string()))?;
        }
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.client.is_some()
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, RendererError> {
        let client = self.client.as_mut().ok_or(RendererError::NotReady)?;

        info!("Navigating to: {}", url);
        client
            .page
            .goto(url)
            .await
            .map_err(|e| RendererError::Navigation(e.to_string()))?;
        self.frames.clear();

        Self::get_navigation_result(&client.page).await
    }

    async fn wait_for_body(&mut self, timeout: Duration) -> Result<(), RendererError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.run::<bool>("return doc.body !== null;").await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(RendererError::NotReady) => return Err(RendererError::NotReady),
                Err(e) => debug!("Body check failed: {}", e),
            }
            if Instant::now() >= deadline {
                return Err(RendererError::Timeout(format!(
                    "document body did not appear within {:?}",
                    timeout
                )));
            }
            tokio::time::sleep(BODY_POLL_INTERVAL).await;
        }
    }

    async fn frame_count(&mut self) -> Result<usize, RendererError> {
        self.run("return doc.querySelectorAll('iframe').length;")
            .await
    }

    async fn enter_frame(&mut self, index: usize) -> Result<(), RendererError> {
        let mut path = self.frames.clone();
        path.push(index);
        let page = self.page()?;
        let reachable: Result<bool, _> =
            evaluate(page, &in_frame(&path, "return doc.body !== null;")).await;
        match reachable {
            Ok(_) => {
                debug!("Entered iframe {}", index + 1);
                self.frames = path;
                Ok(())
            }
            Err(RendererError::NotReady) => Err(RendererError::NotReady),
            Err(e) => {
                debug!("Cannot enter iframe {}: {}", index + 1, e);
                Err(RendererError::FrameUnavailable(index))
            }
        }
    }

    async fn exit_frame(&mut self) -> Result<(), RendererError> {
        self.frames
            .pop()
            .map(|index| debug!("Left iframe {}", index + 1))
            .ok_or_else(|| RendererError::Other("already at top level".into()))
    }

    async fn has_element(&mut self, id: &str) -> Result<bool, RendererError> {
        let id = serde_json::to_string(id)?;
        self.run(&format!("return doc.getElementById({}) !== null;", id))
            .await
    }

    async fn get_extent(&mut self, scope: &Scope) -> Result<Extent, RendererError> {
        self.run(&extent_script(scope)).await
    }

    async fn set_scroll(&mut self, scope: &Scope, top: f64) -> Result<(), RendererError> {
        let _: bool = self.run(&scroll_script(scope, top)).await?;
        Ok(())
    }

    async fn find_by_id_prefix(
        &mut self,
        scope: &Scope,
        prefix: &str,
    ) -> Result<Vec<ElementProbe>, RendererError> {
        self.run(&probe_script(scope, prefix)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_scripts_address_the_container() {
        let scope = Scope::Element("contents".into());
        assert!(extent_script(&scope).contains(r#"getElementById("contents")"#));
        assert!(scroll_script(&scope, 1200.0).contains(".scrollTop = 1200;"));
        assert!(probe_script(&scope, "page").contains(r#"startsWith("page")"#));
    }

    #[test]
    fn document_scripts_use_the_window() {
        assert!(scroll_script(&Scope::Document, 640.5).contains("win.scrollTo(0, 640.5)"));
        assert!(extent_script(&Scope::Document).contains("win.innerHeight"));
        assert!(probe_script(&Scope::Document, "page").starts_with("const root = doc;"));
    }

    #[tokio::test]
    async fn operations_before_launch_are_not_ready() {
        let mut renderer = HeadlessRenderer::default();
        assert!(!renderer.is_ready().await);
        assert!(matches!(
            renderer.frame_count().await,
            Err(RendererError::NotReady)
        ));
        assert!(matches!(
            renderer.navigate("https://example.com").await,
            Err(RendererError::NotReady)
        ));
        assert!(renderer.exit_frame().await.is_err());
    }
}
