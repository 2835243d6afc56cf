use crate::descriptor::iframe_selector;
use crate::dom::node::{NodeId, Page};
use crate::dom::traversal::all_elements_deep;
use crate::selector::generate_css_path;
use crate::types::ElementRect;
use serde::{Deserialize, Serialize};

const SCROLLABLE_OVERFLOW: [&str; 3] = ["auto", "scroll", "overlay"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollableContainer {
    /// Empty for the top document's own scrolling.
    pub css_path: String,
    pub iframe_selector: String,
    pub bounding_box: ElementRect,
    pub scroll_width: f64,
    pub scroll_height: f64,
    pub horizontal: bool,
    pub vertical: bool,
}

fn scroll_axes(page: &Page, element: NodeId) -> Option<(bool, bool, f64, f64)> {
    let style = page.style(element)?;
    let extent = page.element(element)?.scroll_size?;
    let rect = page.rect(element);
    let horizontal = SCROLLABLE_OVERFLOW.contains(&style.overflow_x.as_str()) && extent.width > rect.width;
    let vertical = SCROLLABLE_OVERFLOW.contains(&style.overflow_y.as_str()) && extent.height > rect.height;
    Some((horizontal, vertical, extent.width, extent.height))
}

pub fn is_scrollable_container(page: &Page, element: NodeId) -> bool {
    scroll_axes(page, element).is_some_and(|(h, v, _, _)| h || v)
}

/// Scrollable elements across every reachable document, preceded by the
/// top document itself when its content overflows the viewport.
pub fn detect_scrollable_containers(page: &Page) -> Vec<ScrollableContainer> {
    let mut out = Vec::new();
    let viewport = page.viewport();
    let horizontal = viewport.document_width > viewport.width;
    let vertical = viewport.document_height > viewport.height;
    if horizontal || vertical {
        out.push(ScrollableContainer {
            css_path: String::new(),
            iframe_selector: String::new(),
            bounding_box: ElementRect::new(0.0, 0.0, viewport.width, viewport.height),
            scroll_width: viewport.document_width,
            scroll_height: viewport.document_height,
            horizontal,
            vertical,
        });
    }

    for element in all_elements_deep(page, page.root()) {
        let Some((horizontal, vertical, scroll_width, scroll_height)) = scroll_axes(page, element) else {
            continue;
        };
        if horizontal || vertical {
            out.push(ScrollableContainer {
                css_path: generate_css_path(page, element),
                iframe_selector: iframe_selector(page, element),
                bounding_box: page.rect(element),
                scroll_width,
                scroll_height,
                horizontal,
                vertical,
            });
        }
    }
    out
}
