//! In-memory renderer that models a page, its optional scroll container and its iframes.
#![allow(dead_code)]

use async_trait::async_trait;
use folio_engine::backend::{Renderer, RendererError};
use folio_engine::protocol::{ElementProbe, Extent, NavigationResult, Scope};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FakeItem {
    pub id: String,
    pub src: Option<String>,
    /// Offset from the top of the scrolling content.
    pub y: f64,
    pub height: f64,
    pub displayed: bool,
}

impl FakeItem {
    pub fn new(id: &str, y: f64, height: f64) -> Self {
        Self {
            id: id.to_string(),
            src: Some(format!("https://cdn.test/{}.jpg", id)),
            y,
            height,
            displayed: true,
        }
    }
}

/// `count` stacked page images of equal height.
pub fn pages(count: usize, height: f64) -> Vec<FakeItem> {
    (0..count)
        .map(|i| FakeItem::new(&format!("page{}", i), i as f64 * height, height))
        .collect()
}

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub id: String,
    pub client_height: f64,
    pub scroll_height: f64,
    pub scroll_top: f64,
    /// Distance of the container from the top of the viewport.
    pub offset: f64,
}

impl FakeContainer {
    pub fn new(id: &str, client_height: f64, scroll_height: f64) -> Self {
        Self {
            id: id.to_string(),
            client_height,
            scroll_height,
            scroll_top: 0.0,
            offset: 0.0,
        }
    }
}

/// Content that keeps growing while the reader sits at the bottom.
#[derive(Debug, Clone, Copy)]
pub struct LazyGrowth {
    pub step: f64,
    pub max_height: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct FakeDocument {
    pub window_height: f64,
    pub body_height: f64,
    pub scroll_top: f64,
    pub container: Option<FakeContainer>,
    /// Items scroll with the container instead of the document.
    pub items_in_container: bool,
    pub items: Vec<FakeItem>,
    pub frames: Vec<FakeFrame>,
    pub growth: Option<LazyGrowth>,
}

impl FakeDocument {
    pub fn new(window_height: f64, body_height: f64) -> Self {
        Self {
            window_height,
            body_height,
            scroll_top: 0.0,
            container: None,
            items_in_container: false,
            items: Vec::new(),
            frames: Vec::new(),
            growth: None,
        }
    }

    pub fn with_items(mut self, items: Vec<FakeItem>) -> Self {
        self.items = items;
        self
    }

    pub fn with_container(mut self, container: FakeContainer, items_inside: bool) -> Self {
        self.container = Some(container);
        self.items_in_container = items_inside;
        self
    }

    pub fn with_frame(mut self, frame: FakeFrame) -> Self {
        self.frames.push(frame);
        self
    }

    fn extent(&self, scope: &Scope) -> Result<Extent, RendererError> {
        match scope {
            Scope::Document => Ok(Extent {
                scroll_top: self.scroll_top,
                scroll_height: self.body_height,
                client_height: self.window_height,
            }),
            Scope::Element(id) => {
                let container = self.container_named(id)?;
                Ok(Extent {
                    scroll_top: container.scroll_top,
                    scroll_height: container.scroll_height,
                    client_height: container.client_height,
                })
            }
        }
    }

    fn container_named(&self, id: &str) -> Result<&FakeContainer, RendererError> {
        self.container
            .as_ref()
            .filter(|c| c.id == id)
            .ok_or_else(|| RendererError::Script(format!("no element #{}", id)))
    }

    fn set_scroll(&mut self, scope: &Scope, top: f64) -> Result<(), RendererError> {
        match scope {
            Scope::Document => {
                let max = (self.body_height - self.window_height).max(0.0);
                self.scroll_top = top.clamp(0.0, max);
                if let Some(growth) = self.growth {
                    if self.scroll_top >= max {
                        let grown = self.body_height + growth.step;
                        self.body_height = growth.max_height.map_or(grown, |m| grown.min(m));
                    }
                }
                Ok(())
            }
            Scope::Element(id) => {
                self.container_named(id)?;
                let growth = self.growth;
                let container = self.container.as_mut().expect("checked above");
                let max = (container.scroll_height - container.client_height).max(0.0);
                container.scroll_top = top.clamp(0.0, max);
                if let Some(growth) = growth {
                    if container.scroll_top >= max {
                        let grown = container.scroll_height + growth.step;
                        container.scroll_height = growth.max_height.map_or(grown, |m| grown.min(m));
                    }
                }
                Ok(())
            }
        }
    }

    fn probes(&self, scope: &Scope, prefix: &str) -> Result<Vec<ElementProbe>, RendererError> {
        if let Scope::Element(id) = scope {
            self.container_named(id)?;
            if !self.items_in_container {
                return Ok(Vec::new());
            }
        }
        let shift = match (&self.container, self.items_in_container) {
            (Some(container), true) => container.offset - container.scroll_top - self.scroll_top,
            _ => -self.scroll_top,
        };
        Ok(self
            .items
            .iter()
            .filter(|item| item.id.starts_with(prefix))
            .map(|item| ElementProbe {
                id: item.id.clone(),
                src: item.src.clone(),
                top: item.y + shift,
                height: item.height,
                displayed: item.displayed,
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct FakeFrame {
    /// Cross-origin frames cannot be entered.
    pub accessible: bool,
    pub document: FakeDocument,
}

impl FakeFrame {
    pub fn new(document: FakeDocument) -> Self {
        Self {
            accessible: true,
            document,
        }
    }

    pub fn cross_origin() -> Self {
        Self {
            accessible: false,
            document: FakeDocument::new(600.0, 5000.0),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Failures {
    pub launch: bool,
    pub body: bool,
    pub frame_count: bool,
    /// 1-based call number on which `find_by_id_prefix` fails.
    pub lookup_on_call: Option<usize>,
    /// 1-based call number on which `set_scroll` fails.
    pub scroll_on_call: Option<usize>,
}

pub struct FakeRenderer {
    pub root: FakeDocument,
    pub stack: Vec<usize>,
    pub fail: Failures,
    pub launched: bool,
    pub closed: bool,
    pub navigated: Option<String>,
    pub scroll_calls: usize,
    pub lookup_calls: usize,
    pub max_depth: usize,
}

impl FakeRenderer {
    pub fn new(root: FakeDocument) -> Self {
        Self {
            root,
            stack: Vec::new(),
            fail: Failures::default(),
            launched: false,
            closed: false,
            navigated: None,
            scroll_calls: 0,
            lookup_calls: 0,
            max_depth: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn frame_document(&self, index: usize) -> &FakeDocument {
        &self.root.frames[index].document
    }

    fn current(&mut self) -> &mut FakeDocument {
        let mut doc = &mut self.root;
        for &index in &self.stack {
            doc = &mut doc.frames[index].document;
        }
        doc
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn launch(&mut self) -> Result<(), RendererError> {
        if self.fail.launch {
            return Err(RendererError::Launch("no chromium binary".into()));
        }
        self.launched = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), RendererError> {
        self.closed = true;
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.launched && !self.closed
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, RendererError> {
        if !self.launched {
            return Err(RendererError::NotReady);
        }
        self.navigated = Some(url.to_string());
        Ok(NavigationResult {
            url: url.to_string(),
            title: "Viewer".into(),
        })
    }

    async fn wait_for_body(&mut self, timeout: Duration) -> Result<(), RendererError> {
        if self.fail.body {
            return Err(RendererError::Timeout(format!("no body after {:?}", timeout)));
        }
        Ok(())
    }

    async fn frame_count(&mut self) -> Result<usize, RendererError> {
        if self.fail.frame_count {
            return Err(RendererError::Script("document detached".into()));
        }
        Ok(self.current().frames.len())
    }

    async fn enter_frame(&mut self, index: usize) -> Result<(), RendererError> {
        let accessible = self
            .current()
            .frames
            .get(index)
            .map(|frame| frame.accessible)
            .unwrap_or(false);
        if !accessible {
            return Err(RendererError::FrameUnavailable(index));
        }
        self.stack.push(index);
        self.max_depth = self.max_depth.max(self.stack.len());
        Ok(())
    }

    async fn exit_frame(&mut self) -> Result<(), RendererError> {
        self.stack
            .pop()
            .map(|_| ())
            .ok_or_else(|| RendererError::Other("already at top level".into()))
    }

    async fn has_element(&mut self, id: &str) -> Result<bool, RendererError> {
        Ok(self
            .current()
            .container
            .as_ref()
            .is_some_and(|c| c.id == id))
    }

    async fn get_extent(&mut self, scope: &Scope) -> Result<Extent, RendererError> {
        self.current().extent(scope)
    }

    async fn set_scroll(&mut self, scope: &Scope, top: f64) -> Result<(), RendererError> {
        self.scroll_calls += 1;
        if self.fail.scroll_on_call == Some(self.scroll_calls) {
            return Err(RendererError::Script("execution context was destroyed".into()));
        }
        self.current().set_scroll(scope, top)
    }

    async fn find_by_id_prefix(
        &mut self,
        scope: &Scope,
        prefix: &str,
    ) -> Result<Vec<ElementProbe>, RendererError> {
        self.lookup_calls += 1;
        if self.fail.lookup_on_call == Some(self.lookup_calls) {
            return Err(RendererError::Timeout("element lookup".into()));
        }
        self.current().probes(scope, prefix)
    }
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .ok();
}
