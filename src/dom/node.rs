use crate::dom::style::ComputedStyle;
use crate::types::{ElementRect, Viewport};
use serde::{Deserialize, Serialize};

/// Handle to a node inside a [`Page`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadowRootMode {
    Open,
    Closed,
}

/// What an `<iframe>` exposes to the embedding document.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Document(NodeId),
    Unavailable { src: Option<String> },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone)]
pub struct ElementData {
    pub tag_name: String,
    pub attributes: Vec<(String, String)>,
    pub style: ComputedStyle,
    pub rect: Option<ElementRect>,
    pub scroll_size: Option<ScrollSize>,
    pub shadow_root: Option<NodeId>,
    pub frame: Option<Frame>,
}

impl ElementData {
    pub fn new(tag_name: &str) -> Self {
        Self {
            tag_name: tag_name.to_ascii_lowercase(),
            attributes: Vec::new(),
            style: ComputedStyle::default(),
            rect: None,
            scroll_size: None,
            shadow_root: None,
            frame: None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attribute("class").unwrap_or("").split_whitespace()
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Document {
        url: String,
        frame_element: Option<NodeId>,
    },
    ShadowRoot {
        host: NodeId,
        mode: ShadowRootMode,
    },
    Element(ElementData),
    Text(String),
    Comment(String),
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventListener {
    pub id: u64,
    pub target: NodeId,
    pub event: String,
    pub owner: String,
}

/// An in-memory page: the top document plus every shadow tree and frame
/// document hanging off it.
#[derive(Debug, Clone)]
pub struct Page {
    nodes: Vec<Node>,
    root: NodeId,
    viewport: Viewport,
    listeners: Vec<EventListener>,
    next_listener_id: u64,
}

impl Page {
    pub fn new(url: &str, viewport: Viewport) -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Document {
                url: url.to_string(),
                frame_element: None,
            },
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            viewport,
            listeners: Vec::new(),
            next_listener_id: 1,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains_id(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn push(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            kind,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    // ---- construction ------------------------------------------------------

    pub fn append_element(&mut self, parent: NodeId, tag_name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let mut data = ElementData::new(tag_name);
        if let Some(parent_style) = self.element(parent).map(|e| e.style.clone()) {
            data.style = ComputedStyle::inherit_from(&parent_style);
        }
        data.attributes = attrs
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect();
        self.push(Some(parent), NodeKind::Element(data))
    }

    pub fn append_element_data(&mut self, parent: Option<NodeId>, data: ElementData) -> NodeId {
        self.push(parent, NodeKind::Element(data))
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(Some(parent), NodeKind::Text(text.to_string()))
    }

    pub fn append_comment(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(Some(parent), NodeKind::Comment(text.to_string()))
    }

    pub fn append_doctype(&mut self, parent: NodeId, name: &str, public_id: &str, system_id: &str) -> NodeId {
        self.push(
            Some(parent),
            NodeKind::Doctype {
                name: name.to_string(),
                public_id: public_id.to_string(),
                system_id: system_id.to_string(),
            },
        )
    }

    /// Creates a detached document, optionally owned by a frame element.
    pub fn create_document(&mut self, url: &str, frame_element: Option<NodeId>) -> NodeId {
        self.push(
            None,
            NodeKind::Document {
                url: url.to_string(),
                frame_element,
            },
        )
    }

    pub fn attach_shadow(&mut self, host: NodeId, mode: ShadowRootMode) -> NodeId {
        let shadow = self.push(None, NodeKind::ShadowRoot { host, mode });
        if let Some(element) = self.element_mut(host) {
            element.shadow_root = Some(shadow);
        }
        shadow
    }

    pub fn attach_frame_document(&mut self, iframe: NodeId, url: &str) -> NodeId {
        let document = self.create_document(url, Some(iframe));
        if let Some(element) = self.element_mut(iframe) {
            element.frame = Some(Frame::Document(document));
        }
        document
    }

    pub fn set_frame_unavailable(&mut self, iframe: NodeId, src: Option<String>) {
        if let Some(element) = self.element_mut(iframe) {
            element.frame = Some(Frame::Unavailable { src });
        }
    }

    // ---- element access ----------------------------------------------------

    pub fn is_element(&self, id: NodeId) -> bool {
        self.contains_id(id) && matches!(self.nodes[id.0].kind, NodeKind::Element(_))
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.nodes.get(id.0).map(|n| &n.kind) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.kind) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag_name.as_str())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attribute(name))
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(element) = self.element_mut(id) {
            let name = name.to_ascii_lowercase();
            match element.attributes.iter_mut().find(|(key, _)| *key == name) {
                Some(entry) => entry.1 = value.to_string(),
                None => element.attributes.push((name, value.to_string())),
            }
        }
    }

    pub fn class_name(&self, id: NodeId) -> &str {
        self.attribute(id, "class").unwrap_or("")
    }

    pub fn style(&self, id: NodeId) -> Option<&ComputedStyle> {
        self.element(id).map(|e| &e.style)
    }

    pub fn style_mut(&mut self, id: NodeId) -> Option<&mut ComputedStyle> {
        self.element_mut(id).map(|e| &mut e.style)
    }

    /// Bounding rect, zero-sized when no geometry is known.
    pub fn rect(&self, id: NodeId) -> ElementRect {
        self.element(id).and_then(|e| e.rect).unwrap_or_default()
    }

    pub fn set_rect(&mut self, id: NodeId, rect: ElementRect) {
        if let Some(element) = self.element_mut(id) {
            element.rect = Some(rect);
        }
    }

    pub fn set_scroll_size(&mut self, id: NodeId, width: f64, height: f64) {
        if let Some(element) = self.element_mut(id) {
            element.scroll_size = Some(ScrollSize { width, height });
        }
    }

    pub fn shadow_root(&self, id: NodeId) -> Option<NodeId> {
        self.element(id).and_then(|e| e.shadow_root)
    }

    pub fn frame(&self, id: NodeId) -> Option<&Frame> {
        self.element(id).and_then(|e| e.frame.as_ref())
    }

    // ---- tree navigation ---------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    /// Parent within the same tree, only when it is an element.
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.is_element(*p))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    /// Element descendants of `id` in tree order, not crossing shadow or frame boundaries.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if self.is_element(node) {
                out.push(node);
            }
            for child in self.children(node).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// Document or shadow root at the top of `id`'s tree (or a detached subtree root).
    pub fn tree_root(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    pub fn is_shadow_root(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::ShadowRoot { .. })
    }

    pub fn is_document(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Document { .. })
    }

    pub fn shadow_host(&self, shadow_root: NodeId) -> Option<NodeId> {
        match self.nodes[shadow_root.0].kind {
            NodeKind::ShadowRoot { host, .. } => Some(host),
            _ => None,
        }
    }

    pub fn shadow_mode(&self, shadow_root: NodeId) -> Option<ShadowRootMode> {
        match self.nodes[shadow_root.0].kind {
            NodeKind::ShadowRoot { mode, .. } => Some(mode),
            _ => None,
        }
    }

    /// Document that owns `id`, stepping out of shadow trees.
    pub fn owner_document(&self, id: NodeId) -> Option<NodeId> {
        let mut root = self.tree_root(id);
        loop {
            match &self.nodes[root.0].kind {
                NodeKind::Document { .. } => return Some(root),
                NodeKind::ShadowRoot { host, .. } => root = self.tree_root(*host),
                _ => return None,
            }
        }
    }

    pub fn document_url(&self, document: NodeId) -> Option<&str> {
        match &self.nodes[document.0].kind {
            NodeKind::Document { url, .. } => Some(url.as_str()),
            _ => None,
        }
    }

    pub fn frame_element(&self, document: NodeId) -> Option<NodeId> {
        match &self.nodes[document.0].kind {
            NodeKind::Document { frame_element, .. } => *frame_element,
            _ => None,
        }
    }

    pub fn document_element(&self, document: NodeId) -> Option<NodeId> {
        self.children(document)
            .iter()
            .copied()
            .find(|c| self.is_element(*c))
    }

    pub fn body(&self, document: NodeId) -> Option<NodeId> {
        let html = self.document_element(document)?;
        self.element_children(html)
            .into_iter()
            .find(|c| self.tag_name(*c) == Some("body"))
    }

    /// Whether `id` is still reachable from the top document.
    pub fn is_connected(&self, id: NodeId) -> bool {
        if !self.contains_id(id) {
            return false;
        }
        let root = self.tree_root(id);
        if root == self.root {
            return true;
        }
        match &self.nodes[root.0].kind {
            NodeKind::ShadowRoot { host, .. } => {
                self.shadow_root(*host) == Some(root) && self.is_connected(*host)
            }
            NodeKind::Document {
                frame_element: Some(frame),
                ..
            } => {
                self.frame(*frame) == Some(&Frame::Document(root)) && self.is_connected(*frame)
            }
            _ => false,
        }
    }

    /// Every document node in the arena, top document first.
    pub fn documents(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n.kind, NodeKind::Document { .. }))
            .map(|(i, _)| NodeId(i))
            .collect()
    }

    pub fn get_element_by_id(&self, root: NodeId, id: &str) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|e| self.attribute(*e, "id") == Some(id))
    }

    /// Removes `id` from its parent; handles to it become stale.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            self.nodes[parent.0].children.retain(|c| *c != id);
            self.nodes[id.0].parent = None;
        }
    }

    // ---- text --------------------------------------------------------------

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out, false);
        out
    }

    /// Rendered text: skips `display:none` subtrees and non-rendered tags,
    /// whitespace collapsed.
    pub fn inner_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out, true);
        out.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn collect_text(&self, id: NodeId, out: &mut String, rendered_only: bool) {
        for child in self.children(id) {
            match &self.nodes[child.0].kind {
                NodeKind::Text(text) => {
                    out.push_str(text);
                }
                NodeKind::Element(element) => {
                    if rendered_only
                        && (element.style.is_display_none()
                            || matches!(element.tag_name.as_str(), "script" | "style" | "template"))
                    {
                        continue;
                    }
                    if rendered_only {
                        out.push(' ');
                    }
                    self.collect_text(*child, out, rendered_only);
                }
                _ => {}
            }
        }
    }

    // ---- sibling positions -------------------------------------------------

    /// 1-based index among element siblings with the same tag.
    pub fn nth_of_type(&self, id: NodeId) -> usize {
        let Some(parent) = self.parent(id) else {
            return 1;
        };
        let tag = self.tag_name(id);
        self.children(parent)
            .iter()
            .filter(|c| self.is_element(**c) && self.tag_name(**c) == tag)
            .position(|c| *c == id)
            .map(|p| p + 1)
            .unwrap_or(1)
    }

    /// 1-based index among all element siblings.
    pub fn nth_child(&self, id: NodeId) -> usize {
        let Some(parent) = self.parent(id) else {
            return 1;
        };
        self.children(parent)
            .iter()
            .filter(|c| self.is_element(**c))
            .position(|c| *c == id)
            .map(|p| p + 1)
            .unwrap_or(1)
    }

    /// Number of element siblings (including `id`) that share its tag.
    pub fn same_tag_count(&self, id: NodeId) -> usize {
        let Some(parent) = self.parent(id) else {
            return 1;
        };
        let tag = self.tag_name(id);
        self.children(parent)
            .iter()
            .filter(|c| self.is_element(**c) && self.tag_name(**c) == tag)
            .count()
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|c| *c == id)?;
        siblings[..pos].iter().rev().copied().find(|c| self.is_element(*c))
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|c| *c == id)?;
        siblings[pos + 1..].iter().copied().find(|c| self.is_element(*c))
    }

    // ---- event listeners ---------------------------------------------------

    pub fn add_event_listener(&mut self, target: NodeId, event: &str, owner: &str) -> u64 {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners.push(EventListener {
            id,
            target,
            event: event.to_string(),
            owner: owner.to_string(),
        });
        id
    }

    pub fn remove_event_listener(&mut self, listener_id: u64) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != listener_id);
        before != self.listeners.len()
    }

    pub fn event_listeners(&self) -> &[EventListener] {
        &self.listeners
    }
}
