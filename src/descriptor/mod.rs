//! Per-candidate descriptors: selectors, geometry, text and a sanitized
//! HTML snippet, plus an optional live handle that never crosses a
//! serialization boundary.

pub mod sanitize;

pub use sanitize::sanitize_html;

use crate::core::config::SelectorConfig;
use crate::dom::node::{NodeId, Page};
use crate::dom::traversal::{accessible_frame_document, depth};
use crate::errors::{HighlightError, Result};
use crate::selector::{generate_css_path, generate_xpath, get_robust_selector};
use crate::types::{CapabilityTag, ElementRect};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use tracing::warn;

/// Placed in `iframe_selector` when the containing frame exists but its
/// relationship to the top document cannot be inspected.
pub const CROSS_ORIGIN_IFRAME: &str = "cross-origin-iframe";

const LABEL_ATTRIBUTES: [&str; 6] = ["aria-label", "placeholder", "title", "alt", "value", "name"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDescriptor {
    pub index: String,
    pub capability_tag: CapabilityTag,
    pub role_type: String,
    pub text: String,
    pub sanitized_html: String,
    pub primary_selector: String,
    pub xpath: String,
    pub css_path: String,
    pub bounding_box: ElementRect,
    pub iframe_selector: String,
    #[serde(skip)]
    element: Option<NodeId>,
    #[serde(skip)]
    depth: OnceCell<usize>,
}

impl ElementDescriptor {
    /// The live element this descriptor was captured from, if still attached.
    pub fn element(&self) -> Option<NodeId> {
        self.element
    }

    /// A copy without the live handle, suitable for storage or transfer.
    pub fn detached(&self) -> Self {
        let mut copy = self.clone();
        copy.element = None;
        copy.depth = OnceCell::new();
        copy
    }

    /// Logical ancestor count, computed on first read.
    pub fn depth(&self, page: &Page) -> usize {
        *self
            .depth
            .get_or_init(|| self.element.map_or(0, |element| depth(page, element)))
    }

    pub fn is_inside_iframe(&self) -> bool {
        !self.iframe_selector.is_empty()
    }
}

impl PartialEq for ElementDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.capability_tag == other.capability_tag
            && self.primary_selector == other.primary_selector
            && self.css_path == other.css_path
            && self.iframe_selector == other.iframe_selector
            && self.bounding_box == other.bounding_box
    }
}

/// Underlying tag, or the input type for `<input>`.
pub fn role_type(page: &Page, element: NodeId) -> String {
    match page.tag_name(element) {
        Some("input") => page
            .attribute(element, "type")
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "text".to_string()),
        Some(tag) => tag.to_string(),
        None => String::new(),
    }
}

/// Rendered text, falling back to labelling attributes.
pub fn element_text(page: &Page, element: NodeId) -> String {
    let rendered = page.inner_text(element);
    if !rendered.is_empty() {
        return rendered;
    }
    LABEL_ATTRIBUTES
        .iter()
        .filter_map(|name| page.attribute(element, name))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// CSS path of the iframe whose document contains `element`; empty in the
/// top document.
pub fn iframe_selector(page: &Page, element: NodeId) -> String {
    let Some(document) = page.owner_document(element) else {
        return String::new();
    };
    let Some(frame) = page.frame_element(document) else {
        return String::new();
    };
    match accessible_frame_document(page, frame) {
        Ok(_) => generate_css_path(page, frame),
        Err(err) => {
            warn!("Containing iframe is not accessible: {}", err);
            CROSS_ORIGIN_IFRAME.to_string()
        }
    }
}

/// Builds the descriptor for one candidate.
///
/// The primary selector is the robust selector; when none can be found the
/// tree-local XPath is used instead, which always identifies exactly one
/// element of its tree.
pub fn get_element_info(
    page: &Page,
    element: NodeId,
    index: usize,
    tag: CapabilityTag,
    config: &SelectorConfig,
) -> Result<ElementDescriptor> {
    if !page.is_element(element) {
        return Err(HighlightError::NotAnElement(format!(
            "node {} has no element info",
            element.index()
        )));
    }

    let xpath = generate_xpath(page, element);
    let css_path = generate_css_path(page, element);
    let primary_selector = match get_robust_selector(page, element, config) {
        Ok(selector) => selector,
        Err(err) => {
            warn!("Using XPath as primary selector: {}", err);
            xpath.clone()
        }
    };

    Ok(ElementDescriptor {
        index: index.to_string(),
        capability_tag: tag,
        role_type: role_type(page, element),
        text: element_text(page, element),
        sanitized_html: sanitize_html(page, element),
        primary_selector,
        xpath,
        css_path,
        bounding_box: page.rect(element),
        iframe_selector: iframe_selector(page, element),
        element: Some(element),
        depth: OnceCell::new(),
    })
}
