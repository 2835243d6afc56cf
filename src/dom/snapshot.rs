//! Full-fidelity DOM snapshots: shadow roots, frames, doctype, computed
//! style subset and geometry, as JSON-compatible values.

use crate::dom::node::{ElementData, Frame, NodeId, NodeKind, Page, ScrollSize, ShadowRootMode};
use crate::dom::style::ComputedStyle;
use crate::dom::traversal::accessible_frame_document;
use crate::errors::{HighlightError, Result};
use crate::types::{ElementRect, Viewport};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedAttribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedShadowRoot {
    pub mode: ShadowRootMode,
    pub children: Vec<SerializedNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SerializedFrame {
    Document { document: Box<SerializedNode> },
    Unavailable { src: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "nodeType", rename_all = "camelCase")]
pub enum SerializedNode {
    #[serde(rename_all = "camelCase")]
    Document {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        viewport: Option<Viewport>,
        children: Vec<SerializedNode>,
    },
    #[serde(rename_all = "camelCase")]
    Element {
        tag_name: String,
        #[serde(default)]
        attributes: Vec<SerializedAttribute>,
        #[serde(default)]
        computed_style: ComputedStyle,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rect: Option<ElementRect>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scroll_size: Option<ScrollSize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shadow_root: Option<SerializedShadowRoot>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_document: Option<SerializedFrame>,
        #[serde(default)]
        children: Vec<SerializedNode>,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Doctype {
        name: String,
        #[serde(default)]
        public_id: String,
        #[serde(default)]
        system_id: String,
    },
}

pub fn serialize_node_to_json(page: &Page, node: NodeId) -> SerializedNode {
    let children = || {
        page.children(node)
            .iter()
            .map(|child| serialize_node_to_json(page, *child))
            .collect::<Vec<_>>()
    };

    match page.node(node).kind() {
        NodeKind::Document { url, .. } => SerializedNode::Document {
            url: url.clone(),
            viewport: (node == page.root()).then(|| *page.viewport()),
            children: children(),
        },
        // A bare shadow root serializes as its host's view of it.
        NodeKind::ShadowRoot { host, .. } => serialize_node_to_json(page, *host),
        NodeKind::Element(element) => SerializedNode::Element {
            tag_name: element.tag_name.clone(),
            attributes: element
                .attributes
                .iter()
                .map(|(name, value)| SerializedAttribute {
                    name: name.clone(),
                    value: value.clone(),
                })
                .collect(),
            computed_style: element.style.clone(),
            rect: element.rect,
            scroll_size: element.scroll_size,
            shadow_root: element.shadow_root.map(|shadow| SerializedShadowRoot {
                mode: page.shadow_mode(shadow).unwrap_or(ShadowRootMode::Open),
                children: page
                    .children(shadow)
                    .iter()
                    .map(|child| serialize_node_to_json(page, *child))
                    .collect(),
            }),
            content_document: element.frame.as_ref().map(|frame| serialize_frame(page, node, frame)),
            children: children(),
        },
        NodeKind::Text(text) => SerializedNode::Text { text: text.clone() },
        NodeKind::Comment(text) => SerializedNode::Comment { text: text.clone() },
        NodeKind::Doctype {
            name,
            public_id,
            system_id,
        } => SerializedNode::Doctype {
            name: name.clone(),
            public_id: public_id.clone(),
            system_id: system_id.clone(),
        },
    }
}

fn serialize_frame(page: &Page, iframe: NodeId, frame: &Frame) -> SerializedFrame {
    match accessible_frame_document(page, iframe) {
        Ok(document) => SerializedFrame::Document {
            document: Box::new(serialize_node_to_json(page, document)),
        },
        Err(err) => {
            warn!("Frame content not serialized: {}", err);
            let src = match frame {
                Frame::Unavailable { src } => src.clone(),
                Frame::Document(_) => page.attribute(iframe, "src").map(str::to_string),
            };
            SerializedFrame::Unavailable { src }
        }
    }
}

/// Rebuilds a page from a serialized node. A non-document root is placed
/// under a fresh `about:blank` document.
pub fn deserialize_node_from_json(value: &serde_json::Value) -> Result<Page> {
    let node: SerializedNode = serde_json::from_value(value.clone())?;
    page_from_serialized(&node)
}

pub fn page_from_serialized(node: &SerializedNode) -> Result<Page> {
    match node {
        SerializedNode::Document {
            url,
            viewport,
            children,
        } => {
            let mut page = Page::new(url, viewport.unwrap_or_default());
            let root = page.root();
            for child in children {
                build(&mut page, root, child)?;
            }
            Ok(page)
        }
        SerializedNode::Element { .. } => {
            let mut page = Page::new("about:blank", Viewport::default());
            let root = page.root();
            build(&mut page, root, node)?;
            Ok(page)
        }
        _ => Err(HighlightError::Snapshot(
            "snapshot root must be a document or an element".to_string(),
        )),
    }
}

fn build(page: &mut Page, parent: NodeId, node: &SerializedNode) -> Result<()> {
    match node {
        SerializedNode::Document { .. } => {
            return Err(HighlightError::Snapshot(
                "nested document outside of a frame".to_string(),
            ))
        }
        SerializedNode::Text { text } => {
            page.append_text(parent, text);
        }
        SerializedNode::Comment { text } => {
            page.append_comment(parent, text);
        }
        SerializedNode::Doctype {
            name,
            public_id,
            system_id,
        } => {
            page.append_doctype(parent, name, public_id, system_id);
        }
        SerializedNode::Element {
            tag_name,
            attributes,
            computed_style,
            rect,
            scroll_size,
            shadow_root,
            content_document,
            children,
        } => {
            let mut data = ElementData::new(tag_name);
            data.attributes = attributes
                .iter()
                .map(|a| (a.name.to_ascii_lowercase(), a.value.clone()))
                .collect();
            data.style = computed_style.clone();
            data.rect = *rect;
            data.scroll_size = *scroll_size;
            let element = page.append_element_data(Some(parent), data);

            if let Some(shadow) = shadow_root {
                let root = page.attach_shadow(element, shadow.mode);
                for child in &shadow.children {
                    build(page, root, child)?;
                }
            }
            match content_document {
                Some(SerializedFrame::Document { document }) => match document.as_ref() {
                    SerializedNode::Document { url, children, .. } => {
                        let frame_doc = page.attach_frame_document(element, url);
                        for child in children {
                            build(page, frame_doc, child)?;
                        }
                    }
                    _ => {
                        return Err(HighlightError::Snapshot(
                            "frame content must be a document".to_string(),
                        ))
                    }
                },
                Some(SerializedFrame::Unavailable { src }) => {
                    page.set_frame_unavailable(element, src.clone())
                }
                None => {}
            }
            for child in children {
                build(page, element, child)?;
            }
        }
    }
    Ok(())
}

impl Page {
    pub fn to_snapshot(&self) -> SerializedNode {
        serialize_node_to_json(self, self.root())
    }

    pub fn to_snapshot_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_snapshot())?)
    }

    pub fn from_snapshot(json: &str) -> Result<Page> {
        let node: SerializedNode = serde_json::from_str(json)?;
        page_from_serialized(&node)
    }
}
