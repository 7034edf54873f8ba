use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Element id reserved for viewers that scroll an inner container instead of the document.
pub const DEFAULT_CONTAINER_ID: &str = "contents";

/// Id prefix shared by the page images of a viewer (`page0`, `page1`, ...).
pub const DEFAULT_ITEM_PREFIX: &str = "page";

/// Which region of the rendered page actually scrolls.
///
/// Chosen once per session by the classifier and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScrollTarget {
    MainDocument,
    NestedContainer { container: String },
    Frame { frame: usize },
    FrameNestedContainer { frame: usize, container: String },
}

impl ScrollTarget {
    /// Iframe (document-order index) that must be entered before addressing the target.
    pub fn frame(&self) -> Option<usize> {
        match self {
            ScrollTarget::Frame { frame } | ScrollTarget::FrameNestedContainer { frame, .. } => {
                Some(*frame)
            }
            ScrollTarget::MainDocument | ScrollTarget::NestedContainer { .. } => None,
        }
    }

    /// Scope the extent and scroll primitives address once inside the right frame.
    pub fn scope(&self) -> Scope {
        match self {
            ScrollTarget::NestedContainer { container }
            | ScrollTarget::FrameNestedContainer { container, .. } => {
                Scope::Element(container.clone())
            }
            ScrollTarget::MainDocument | ScrollTarget::Frame { .. } => Scope::Document,
        }
    }
}

impl fmt::Display for ScrollTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrollTarget::MainDocument => write!(f, "main document"),
            ScrollTarget::NestedContainer { container } => write!(f, "div#{}", container),
            ScrollTarget::Frame { frame } => write!(f, "iframe {}", frame + 1),
            ScrollTarget::FrameNestedContainer { frame, container } => {
                write!(f, "div#{} in iframe {}", container, frame + 1)
            }
        }
    }
}

/// What a renderer primitive operates on within the current frame context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// `window` / `document.body` of the current browsing context.
    Document,
    /// The element with this id.
    Element(String),
}

/// Vertical scroll metrics of a scope, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Extent {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl Extent {
    /// Bottom edge of the visible region in content coordinates.
    pub fn reached(&self) -> f64 {
        self.scroll_top + self.client_height
    }

    pub fn overflows(&self) -> bool {
        self.scroll_height > self.client_height
    }
}

/// Raw observation of one element whose id starts with the item prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementProbe {
    pub id: String,
    #[serde(default)]
    pub src: Option<String>,
    /// Distance from the top of the viewport (bounding client rect).
    pub top: f64,
    pub height: f64,
    pub displayed: bool,
}

/// A page image seen in the viewport during a harvest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscoveredItem {
    pub id: String,
    pub source: String,
    pub sequence: Option<u64>,
}

/// A page image stored on disk, ready for assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedItem {
    pub id: String,
    pub path: PathBuf,
    pub sequence: Option<u64>,
}

impl FetchedItem {
    /// Key that orders items by page number with unnumbered items last.
    pub fn sort_key(&self) -> u64 {
        self.sequence.unwrap_or(u64::MAX)
    }
}

/// Id naming convention for page items, e.g. `page12`.
#[derive(Debug, Clone)]
pub struct ItemPattern {
    prefix: String,
    strict: Regex,
    sequence: Regex,
}

impl ItemPattern {
    pub fn new(prefix: &str) -> Self {
        let escaped = regex::escape(prefix);
        Self {
            prefix: prefix.to_string(),
            strict: Regex::new(&format!(r"^{}\d+$", escaped)).expect("escaped prefix is valid"),
            sequence: Regex::new(&format!(r"{}(\d+)", escaped)).expect("escaped prefix is valid"),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// True when the whole id is the prefix followed by digits.
    pub fn matches(&self, id: &str) -> bool {
        self.strict.is_match(id)
    }

    /// Page number embedded in an id, if any.
    pub fn sequence(&self, id: &str) -> Option<u64> {
        self.sequence
            .captures(id)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    pub fn item(&self, id: &str, source: &str) -> DiscoveredItem {
        DiscoveredItem {
            id: id.to_string(),
            source: source.to_string(),
            sequence: self.sequence(id),
        }
    }
}

impl Default for ItemPattern {
    fn default() -> Self {
        Self::new(DEFAULT_ITEM_PREFIX)
    }
}

/// Paper size of the assembled document, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFormat {
    #[default]
    A4,
    Letter,
}

impl PageFormat {
    pub fn size(&self) -> (f64, f64) {
        match self {
            PageFormat::A4 => (595.0, 842.0),
            PageFormat::Letter => (612.0, 792.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub url: String,
    pub title: String,
}
