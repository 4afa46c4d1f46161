//! The render surface a countdown paints into.
//!
//! The engine only needs a handful of primitives from its host: mount the
//! scanned markup, find the node for a unit, overwrite a node's content and
//! let go of nodes on teardown. `MarkupSurface` is an in-memory implementation
//! that keeps the markup as a string.

use crate::common::{lock, NodeId};
use regex::Regex;
use slotmap::SlotMap;
use std::sync::{Arc, LazyLock, Mutex};

static EMPTY_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<span class="([^"]*)"></span>"#).expect("valid regex"));

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Host-provided render target.
///
/// Implementations must not call back into the countdown that owns them.
pub trait RenderSurface: Send {
    /// Markup the host already placed in the surface. When present it is
    /// scanned instead of the configured template.
    fn initial_markup(&self) -> Option<String> {
        None
    }

    /// Replaces the surface content with `markup`, dropping all previous nodes.
    fn mount(&mut self, markup: &str);

    /// Finds the first node tagged `hand-{unit}`.
    fn resolve(&self, unit: &str) -> Option<NodeId>;

    /// Replaces the content of `node`. Writes to detached nodes are ignored.
    fn write(&mut self, node: NodeId, markup: String);

    /// Releases `node`. Its last content stays visible.
    fn detach(&mut self, node: NodeId);

    fn set_visible(&mut self, _visible: bool) {}

    /// The current markup of the whole surface.
    fn markup(&self) -> String;
}

#[derive(Debug, Clone)]
enum Segment {
    Text(String),
    Cell { class: String, content: String },
}

/// An in-memory surface. Empty `span` elements in the mounted markup become
/// writable cells; everything else is kept verbatim.
#[derive(Debug, Default)]
pub struct MarkupSurface {
    initial: Option<String>,
    segments: Vec<Segment>,
    nodes: SlotMap<NodeId, usize>,
    visible: bool,
    writes: usize,
}

impl MarkupSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface that already holds host markup (with placeholders).
    pub fn with_content(markup: impl Into<String>) -> Self {
        Self {
            initial: Some(markup.into()),
            ..Default::default()
        }
    }

    /// Number of node writes since creation.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// The surface markup with every tag stripped.
    pub fn text(&self) -> String {
        plain_text(&self.markup())
    }

    /// Current content of `node`, if it is attached.
    pub fn content(&self, node: NodeId) -> Option<&str> {
        match self.segments.get(*self.nodes.get(node)?)? {
            Segment::Cell { content, .. } => Some(content.as_str()),
            Segment::Text(_) => None,
        }
    }
}

impl RenderSurface for MarkupSurface {
    fn initial_markup(&self) -> Option<String> {
        self.initial.clone()
    }

    fn mount(&mut self, markup: &str) {
        self.segments.clear();
        self.nodes.clear();

        let mut cursor = 0;
        for caps in EMPTY_SPAN.captures_iter(markup) {
            let (Some(whole), Some(class)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > cursor {
                self.segments
                    .push(Segment::Text(markup[cursor..whole.start()].to_string()));
            }
            self.nodes.insert(self.segments.len());
            self.segments.push(Segment::Cell {
                class: class.as_str().to_string(),
                content: String::new(),
            });
            cursor = whole.end();
        }
        if cursor < markup.len() {
            self.segments.push(Segment::Text(markup[cursor..].to_string()));
        }
    }

    fn resolve(&self, unit: &str) -> Option<NodeId> {
        let tag = format!("hand-{unit}");
        self.nodes
            .iter()
            .filter(|&(_, &index)| match &self.segments[index] {
                Segment::Cell { class, .. } => class.split_whitespace().any(|c| c == tag),
                Segment::Text(_) => false,
            })
            .min_by_key(|&(_, &index)| index)
            .map(|(node, _)| node)
    }

    fn write(&mut self, node: NodeId, markup: String) {
        let Some(&index) = self.nodes.get(node) else {
            return;
        };
        if let Some(Segment::Cell { content, .. }) = self.segments.get_mut(index) {
            *content = markup;
            self.writes += 1;
        }
    }

    fn detach(&mut self, node: NodeId) {
        self.nodes.remove(node);
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn markup(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.clone(),
                Segment::Cell { class, content } => {
                    format!("<span class=\"{class}\">{content}</span>")
                }
            })
            .collect()
    }
}

/// A surface shared with the host, so the host can inspect it while a
/// countdown owns the other handle.
impl<S: RenderSurface> RenderSurface for Arc<Mutex<S>> {
    fn initial_markup(&self) -> Option<String> {
        lock(&**self).initial_markup()
    }

    fn mount(&mut self, markup: &str) {
        lock(&**self).mount(markup)
    }

    fn resolve(&self, unit: &str) -> Option<NodeId> {
        lock(&**self).resolve(unit)
    }

    fn write(&mut self, node: NodeId, markup: String) {
        lock(&**self).write(node, markup)
    }

    fn detach(&mut self, node: NodeId) {
        lock(&**self).detach(node)
    }

    fn set_visible(&mut self, visible: bool) {
        lock(&**self).set_visible(visible)
    }

    fn markup(&self) -> String {
        lock(&**self).markup()
    }
}

/// Strips every tag from `markup`.
pub fn plain_text(markup: &str) -> String {
    TAG.replace_all(markup, "").into_owned()
}
