//! Naive geometry for fixtures without a layout engine, plus hit testing.

use crate::dom::node::{Frame, NodeId, Page};
use crate::dom::style::{declared_px, parse_inline_style};
use crate::dom::traversal::parent_element_deep;
use crate::types::ElementRect;

const PADDING: f64 = 4.0;
const LEAF_HEIGHT: f64 = 20.0;

/// Stacks every rendered element as a block inside its parent.
///
/// Explicit `width`/`height` declarations are honoured, `position:
/// absolute|fixed` boxes use `left`/`top` literally and take no flow space,
/// and `display:none` subtrees collapse to zero-sized rects.
pub fn block_layout(page: &mut Page) {
    let viewport = *page.viewport();
    let root = page.root();
    let content = layout_children(page, root, ElementRect::new(0.0, 0.0, viewport.width, viewport.height));

    let mut updated = viewport;
    updated.document_height = viewport.height.max(content);
    updated.document_width = viewport.width;
    page.set_viewport(updated);
}

fn layout_children(page: &mut Page, parent: NodeId, area: ElementRect) -> f64 {
    let mut children = Vec::new();
    if let Some(shadow) = page.shadow_root(parent) {
        children.extend(page.element_children(shadow));
    }
    children.extend(page.element_children(parent));

    let mut y = area.y;
    for child in children {
        y += layout_element(page, child, area.x, y, area.width);
    }
    y - area.y
}

fn layout_element(page: &mut Page, element: NodeId, x: f64, y: f64, available: f64) -> f64 {
    let hidden = page.style(element).map_or(true, |s| s.is_display_none());
    if hidden {
        collapse(page, element, x, y);
        return 0.0;
    }

    let declarations = page
        .attribute(element, "style")
        .map(parse_inline_style)
        .unwrap_or_default();
    let positioned = page
        .style(element)
        .is_some_and(|s| s.position == "absolute" || s.position == "fixed");

    let left = if positioned {
        declared_px(&declarations, "left").unwrap_or(x)
    } else {
        x
    };
    let top = if positioned {
        declared_px(&declarations, "top").unwrap_or(y)
    } else {
        y
    };
    let width = declared_px(&declarations, "width").unwrap_or(available).max(0.0);

    let inner = ElementRect::new(
        left + PADDING,
        top + PADDING,
        (width - 2.0 * PADDING).max(0.0),
        0.0,
    );
    let content = layout_children(page, element, inner);
    let natural = if content > 0.0 {
        content + 2.0 * PADDING
    } else {
        LEAF_HEIGHT
    };
    let height = declared_px(&declarations, "height").unwrap_or(natural).max(0.0);

    page.set_rect(element, ElementRect::new(left, top, width, height));
    if natural > height {
        page.set_scroll_size(element, width, natural);
    }

    if let Some(Frame::Document(document)) = page.frame(element).cloned() {
        layout_children(page, document, ElementRect::new(0.0, 0.0, width, height));
    }

    if positioned {
        0.0
    } else {
        height
    }
}

fn collapse(page: &mut Page, element: NodeId, x: f64, y: f64) {
    page.set_rect(element, ElementRect::new(x, y, 0.0, 0.0));
    let mut nested = page.descendants(element);
    if let Some(shadow) = page.shadow_root(element) {
        nested.extend(page.descendants(shadow));
    }
    for node in nested {
        page.set_rect(node, ElementRect::new(x, y, 0.0, 0.0));
    }
}

/// No inclusive logical ancestor is `display:none`.
pub fn is_rendered(page: &Page, element: NodeId) -> bool {
    let mut cursor = Some(element);
    while let Some(current) = cursor {
        if page.style(current).is_some_and(|s| s.is_display_none()) {
            return false;
        }
        cursor = parent_element_deep(page, current);
    }
    true
}

/// Elements of `document` (shadow trees included, frames excluded) in paint order.
pub fn paint_order(page: &Page, document: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = page.children(document).iter().rev().copied().collect();
    while let Some(node) = stack.pop() {
        if !page.is_element(node) {
            continue;
        }
        out.push(node);
        for child in page.children(node).iter().rev() {
            stack.push(*child);
        }
        if let Some(shadow) = page.shadow_root(node) {
            for child in page.children(shadow).iter().rev() {
                stack.push(*child);
            }
        }
    }
    out
}

fn effective_z_index(page: &Page, element: NodeId) -> i64 {
    let mut cursor = Some(element);
    while let Some(current) = cursor {
        if let Some(style) = page.style(current) {
            if style.position != "static" {
                if let Some(z) = style.z_index {
                    return z;
                }
            }
        }
        cursor = parent_element_deep(page, current);
    }
    0
}

/// Topmost element of `document` at viewport point `(x, y)`.
pub fn element_from_point(page: &Page, document: NodeId, x: f64, y: f64) -> Option<NodeId> {
    let (width, height) = match page.frame_element(document) {
        Some(frame) => {
            let rect = page.rect(frame);
            (rect.width, rect.height)
        }
        None => (page.viewport().width, page.viewport().height),
    };
    if x < 0.0 || y < 0.0 || x > width || y > height {
        return None;
    }

    paint_order(page, document)
        .into_iter()
        .enumerate()
        .filter(|(_, element)| {
            let rect = page.rect(*element);
            let Some(style) = page.style(*element) else {
                return false;
            };
            rect.width > 0.0
                && rect.height > 0.0
                && rect.contains_point(x, y)
                && !style.is_hidden()
                && style.pointer_events != "none"
                && is_rendered(page, *element)
        })
        .max_by_key(|(order, element)| (effective_z_index(page, *element), *order))
        .map(|(_, element)| element)
}
