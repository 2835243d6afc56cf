//! Enumeration across shadow roots and frames, and logical parent resolution.

use crate::dom::node::{Frame, NodeId, Page, ShadowRootMode};
use crate::dom::query::SelectorList;
use crate::errors::{HighlightError, Result};
use tracing::{debug, warn};
use url::Url;

/// All elements matching `selector` in `root`, every open shadow root and
/// every same-origin frame document reachable from it.
pub fn query_all_deep(page: &Page, root: NodeId, selector: &str) -> Result<Vec<NodeId>> {
    let list = SelectorList::parse(selector)?;
    let mut out = Vec::new();
    collect_deep(page, root, Some(&list), &mut out);
    Ok(out)
}

/// Every element reachable from `root`, crossing shadow and frame boundaries.
pub fn all_elements_deep(page: &Page, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    collect_deep(page, root, None, &mut out);
    out
}

fn collect_deep(page: &Page, root: NodeId, list: Option<&SelectorList>, out: &mut Vec<NodeId>) {
    let elements = page.descendants(root);
    out.extend(
        elements
            .iter()
            .copied()
            .filter(|e| list.map_or(true, |l| l.matches(page, *e))),
    );

    for element in elements {
        if let Some(shadow) = open_shadow_root(page, element) {
            collect_deep(page, shadow, list, out);
        }
        if page.frame(element).is_some() {
            match accessible_frame_document(page, element) {
                Ok(document) => collect_deep(page, document, list, out),
                Err(err) => warn!("Skipping frame content: {}", err),
            }
        }
    }
}

/// The shadow root of `host` if script could reach it (`element.shadowRoot`).
pub fn open_shadow_root(page: &Page, host: NodeId) -> Option<NodeId> {
    let shadow = page.shadow_root(host)?;
    match page.shadow_mode(shadow) {
        Some(ShadowRootMode::Open) => Some(shadow),
        _ => {
            debug!("Closed shadow root on node {} is not traversable", host.index());
            None
        }
    }
}

/// Content document of an iframe, provided it is same-origin with its embedder.
pub fn accessible_frame_document(page: &Page, iframe: NodeId) -> Result<NodeId> {
    match page.frame(iframe) {
        Some(Frame::Document(document)) => {
            let embedder = page
                .owner_document(iframe)
                .ok_or_else(|| HighlightError::ElementNotFound("iframe is detached".to_string()))?;
            if same_origin(page, embedder, *document) {
                Ok(*document)
            } else {
                Err(HighlightError::CrossOrigin(
                    page.document_url(*document).unwrap_or_default().to_string(),
                ))
            }
        }
        Some(Frame::Unavailable { src }) => Err(HighlightError::CrossOrigin(
            src.clone().unwrap_or_else(|| "about:blank".to_string()),
        )),
        None => Err(HighlightError::NotAnElement("not a frame element".to_string())),
    }
}

/// Origin of a document; `about:` and unparseable URLs inherit from the embedder.
pub fn effective_origin(page: &Page, document: NodeId) -> Option<url::Origin> {
    let url = page.document_url(document).unwrap_or_default();
    let parsed = Url::parse(url).ok().filter(|u| u.scheme() != "about");
    match parsed.map(|u| u.origin()) {
        Some(origin) if origin.is_tuple() => Some(origin),
        _ => {
            let frame = page.frame_element(document)?;
            let embedder = page.owner_document(frame)?;
            effective_origin(page, embedder)
        }
    }
}

pub fn same_origin(page: &Page, a: NodeId, b: NodeId) -> bool {
    match (effective_origin(page, a), effective_origin(page, b)) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

/// The `<slot>` a light-DOM child of a shadow host is projected into.
pub fn assigned_slot(page: &Page, element: NodeId) -> Option<NodeId> {
    let host = page.parent_element(element)?;
    let shadow = page.shadow_root(host)?;
    let slot_name = page.attribute(element, "slot").unwrap_or("");
    page.descendants(shadow).into_iter().find(|candidate| {
        page.tag_name(*candidate) == Some("slot")
            && page.attribute(*candidate, "name").unwrap_or("") == slot_name
    })
}

/// Logical parent of an element.
///
/// Slotted elements whose own root is a shadow root resolve to their slot;
/// a shadow root parent resolves to its host. Returns `None` for non-element
/// input.
pub fn get_parent_node(page: &Page, node: Option<NodeId>) -> Option<NodeId> {
    let element = node.filter(|n| page.is_element(*n))?;

    if page.is_shadow_root(page.tree_root(element)) {
        if let Some(slot) = assigned_slot(page, element) {
            return Some(slot);
        }
    }

    let parent = page.parent(element)?;
    if page.is_shadow_root(parent) {
        return page.shadow_host(parent);
    }
    Some(parent)
}

/// Logical parent, only when it is an element.
pub fn parent_element_deep(page: &Page, element: NodeId) -> Option<NodeId> {
    get_parent_node(page, Some(element)).filter(|p| page.is_element(*p))
}

/// Logical ancestors, nearest first.
pub fn ancestors(page: &Page, element: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut cursor = parent_element_deep(page, element);
    while let Some(ancestor) = cursor {
        if out.contains(&ancestor) {
            break;
        }
        out.push(ancestor);
        cursor = parent_element_deep(page, ancestor);
    }
    out
}

pub fn depth(page: &Page, element: NodeId) -> usize {
    ancestors(page, element).len()
}

pub fn is_ancestor(page: &Page, ancestor: NodeId, element: NodeId) -> bool {
    ancestors(page, element).contains(&ancestor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Viewport;

    fn body(page: &mut Page) -> NodeId {
        let root = page.root();
        let html = page.append_element(root, "html", &[]);
        page.append_element(html, "body", &[])
    }

    #[test]
    fn finds_elements_three_shadow_roots_deep() {
        let mut page = Page::new("https://app.example/", Viewport::default());
        let body = body(&mut page);
        let mut host = page.append_element(body, "x-outer", &[]);
        for tag in ["x-middle", "x-inner", "x-leaf"] {
            let shadow = page.attach_shadow(host, ShadowRootMode::Open);
            host = page.append_element(shadow, tag, &[]);
        }
        let shadow = page.attach_shadow(host, ShadowRootMode::Open);
        let button = page.append_element(shadow, "button", &[("id", "deep")]);

        let found = query_all_deep(&page, page.root(), "button").unwrap();
        assert_eq!(found, vec![button]);
        assert_eq!(depth(&page, button), 6);
    }

    #[test]
    fn skips_closed_shadow_roots_and_cross_origin_frames() {
        let mut page = Page::new("https://app.example/", Viewport::default());
        let body = body(&mut page);
        let host = page.append_element(body, "x-closed", &[]);
        let shadow = page.attach_shadow(host, ShadowRootMode::Closed);
        page.append_element(shadow, "button", &[]);

        let foreign = page.append_element(body, "iframe", &[("src", "https://ads.example/")]);
        let foreign_doc = page.attach_frame_document(foreign, "https://ads.example/");
        let foreign_html = page.append_element(foreign_doc, "html", &[]);
        page.append_element(foreign_html, "button", &[]);

        let opaque = page.append_element(body, "iframe", &[("src", "https://other.example/")]);
        page.set_frame_unavailable(opaque, Some("https://other.example/".to_string()));

        let same = page.append_element(body, "iframe", &[]);
        let same_doc = page.attach_frame_document(same, "about:srcdoc");
        let same_html = page.append_element(same_doc, "html", &[]);
        let reachable = page.append_element(same_html, "button", &[]);

        assert_eq!(query_all_deep(&page, page.root(), "button").unwrap(), vec![reachable]);
        assert!(matches!(
            accessible_frame_document(&page, foreign),
            Err(HighlightError::CrossOrigin(_))
        ));
    }

    #[test]
    fn parent_of_slotted_element_inside_shadow_tree_is_its_slot() {
        let mut page = Page::new("https://app.example/", Viewport::default());
        let body = body(&mut page);
        let outer = page.append_element(body, "x-outer", &[]);
        let outer_shadow = page.attach_shadow(outer, ShadowRootMode::Open);
        let inner_host = page.append_element(outer_shadow, "x-inner", &[]);
        let slotted = page.append_element(inner_host, "span", &[("slot", "label")]);
        let inner_shadow = page.attach_shadow(inner_host, ShadowRootMode::Open);
        let wrapper = page.append_element(inner_shadow, "div", &[]);
        let slot = page.append_element(wrapper, "slot", &[("name", "label")]);

        assert_eq!(get_parent_node(&page, Some(slotted)), Some(slot));
        assert_eq!(get_parent_node(&page, Some(wrapper)), Some(inner_host));
        assert_eq!(get_parent_node(&page, Some(inner_host)), Some(outer));
    }

    #[test]
    fn light_dom_slotted_element_keeps_its_tree_parent() {
        let mut page = Page::new("https://app.example/", Viewport::default());
        let body = body(&mut page);
        let host = page.append_element(body, "x-card", &[]);
        let child = page.append_element(host, "p", &[]);
        let shadow = page.attach_shadow(host, ShadowRootMode::Open);
        page.append_element(shadow, "slot", &[]);

        assert_eq!(get_parent_node(&page, Some(child)), Some(host));
        assert_eq!(get_parent_node(&page, None), None);
        let text = page.append_text(child, "hi");
        assert_eq!(get_parent_node(&page, Some(text)), None);
    }
}
