//! Re-locating elements from stored selectors and matching a real
//! interaction target against a candidate list.

use crate::descriptor::{iframe_selector, ElementDescriptor, CROSS_ORIGIN_IFRAME};
use crate::dom::node::{NodeId, Page};
use crate::dom::query::SelectorList;
use crate::dom::traversal::{accessible_frame_document, all_elements_deep, open_shadow_root};
use crate::errors::{HighlightError, Result};
use crate::selector::{generate_css_path, resolve_xpath};
use tracing::{debug, warn};

const CONTAINMENT_BONUS: f64 = 100.0;
const DISTANCE_SCALE: f64 = 1000.0;

/// Resolves a stored selector pair to a live element.
///
/// The iframe is located by recomputing the CSS path of every reachable
/// iframe; the selector is then tried against that document (or the top
/// document) and, failing that, against its shadow roots depth-first.
/// Selectors starting with `/` are treated as XPaths.
pub fn find_element(page: &Page, iframe_css_path: &str, selector: &str) -> Result<Option<NodeId>> {
    Ok(find_elements(page, iframe_css_path, selector)?.into_iter().next())
}

/// Every match of `selector` in the frame's document followed by its open
/// shadow trees, depth-first.
pub fn find_elements(page: &Page, iframe_css_path: &str, selector: &str) -> Result<Vec<NodeId>> {
    let document = frame_document(page, iframe_css_path)?;
    let mut found = Vec::new();
    if selector.starts_with('/') {
        collect_in_trees(
            page,
            document,
            &|root| Ok(resolve_xpath(page, root, selector)?.into_iter().collect()),
            &mut found,
        )?;
    } else {
        let list = SelectorList::parse(selector)?;
        collect_in_trees(page, document, &|root| Ok(list.select(page, root)), &mut found)?;
    }
    Ok(found)
}

fn frame_document(page: &Page, iframe_css_path: &str) -> Result<NodeId> {
    if iframe_css_path.is_empty() {
        return Ok(page.root());
    }
    if iframe_css_path == CROSS_ORIGIN_IFRAME {
        return Err(HighlightError::CrossOrigin(
            "descriptor was captured in an inaccessible frame".to_string(),
        ));
    }
    let iframe = all_elements_deep(page, page.root())
        .into_iter()
        .filter(|e| page.tag_name(*e) == Some("iframe"))
        .find(|e| generate_css_path(page, *e) == iframe_css_path);
    match iframe {
        Some(iframe) => accessible_frame_document(page, iframe),
        None => Err(HighlightError::ElementNotFound(format!(
            "no iframe at {}",
            iframe_css_path
        ))),
    }
}

fn collect_in_trees(
    page: &Page,
    root: NodeId,
    lookup: &dyn Fn(NodeId) -> Result<Vec<NodeId>>,
    out: &mut Vec<NodeId>,
) -> Result<()> {
    out.extend(lookup(root)?);
    for element in page.descendants(root) {
        if let Some(shadow) = open_shadow_root(page, element) {
            collect_in_trees(page, shadow, lookup, out)?;
        }
    }
    Ok(())
}

/// The descriptor's live element, re-resolved through its selectors when
/// the held handle is missing or no longer attached.
///
/// A hit only counts when its CSS path agrees with the stored one, so a
/// light-DOM twin cannot stand in for a shadow-DOM element; the stored
/// bounding box breaks remaining ties.
pub fn resolve_descriptor(page: &Page, descriptor: &ElementDescriptor) -> Option<NodeId> {
    if let Some(element) = descriptor.element() {
        if page.contains_id(element) && page.is_connected(element) && page.is_element(element) {
            return Some(element);
        }
        debug!("Stale handle for descriptor {}", descriptor.index);
    }

    for selector in [&descriptor.primary_selector, &descriptor.css_path] {
        if selector.is_empty() {
            continue;
        }
        match find_elements(page, &descriptor.iframe_selector, selector) {
            Ok(found) => {
                if let Some(element) = pick_agreeing(page, descriptor, found) {
                    return Some(element);
                }
            }
            Err(err) => {
                warn!("Could not resolve descriptor {}: {}", descriptor.index, err);
                return None;
            }
        }
    }
    warn!(
        "Descriptor {} no longer matches any element ({})",
        descriptor.index, descriptor.primary_selector
    );
    None
}

fn pick_agreeing(page: &Page, descriptor: &ElementDescriptor, found: Vec<NodeId>) -> Option<NodeId> {
    let agreeing: Vec<NodeId> = if descriptor.css_path.is_empty() {
        found
    } else {
        found
            .into_iter()
            .filter(|e| generate_css_path(page, *e) == descriptor.css_path)
            .collect()
    };
    agreeing
        .iter()
        .copied()
        .find(|e| page.rect(*e) == descriptor.bounding_box)
        .or_else(|| agreeing.first().copied())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    Ancestor,
    Spatial,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionMatch {
    /// Position in the candidate slice.
    pub position: usize,
    pub tier: MatchTier,
    pub score: f64,
}

/// Finds which candidate an interaction with `actual` most plausibly
/// targeted: same element, then nearest candidate ancestor, then the best
/// spatial score.
pub fn match_interaction(page: &Page, candidates: &[ElementDescriptor], actual: NodeId) -> Option<InteractionMatch> {
    let live: Vec<Option<NodeId>> = candidates.iter().map(|c| resolve_descriptor(page, c)).collect();

    if let Some(position) = live.iter().position(|e| *e == Some(actual)) {
        return Some(InteractionMatch {
            position,
            tier: MatchTier::Exact,
            score: f64::INFINITY,
        });
    }

    let mut cursor = page.parent_element(actual);
    while let Some(ancestor) = cursor {
        if let Some(position) = live.iter().position(|e| *e == Some(ancestor)) {
            return Some(InteractionMatch {
                position,
                tier: MatchTier::Ancestor,
                score: f64::INFINITY,
            });
        }
        cursor = page.parent_element(ancestor);
    }

    let target = page.rect(actual);
    let scope = iframe_selector(page, actual);
    let mut best: Option<InteractionMatch> = None;
    for (position, candidate) in candidates.iter().enumerate() {
        if candidate.iframe_selector != scope {
            continue;
        }
        let rect = candidate.bounding_box;
        let mut score = rect.overlap_area(&target);
        if rect.contains(&target) {
            score += CONTAINMENT_BONUS;
        }
        if score <= 0.0 {
            score = DISTANCE_SCALE / (rect.center_distance(&target) + 1.0);
        }
        if best.map_or(true, |b| score > b.score) {
            best = Some(InteractionMatch {
                position,
                tier: MatchTier::Spatial,
                score,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SelectorConfig;
    use crate::descriptor::get_element_info;
    use crate::dom::layout::block_layout;
    use crate::dom::node::ShadowRootMode;
    use crate::types::{CapabilityTag, ElementRect};

    fn page() -> Page {
        let mut page = Page::from_html(
            r#"<html><body>
                <div class="toolbar"><button id="save">Save <b id="bold">now</b></button></div>
                <x-panel id="panel"><template shadowrootmode="open"><button class="close">Close</button></template></x-panel>
                <iframe srcdoc="<div><a id='help' href='/help'>Help</a></div>"></iframe>
                <p id="far">Footer</p>
            </body></html>"#,
            "https://app.example/",
        );
        block_layout(&mut page);
        page
    }

    fn info(page: &Page, element: NodeId, index: usize) -> ElementDescriptor {
        get_element_info(page, element, index, CapabilityTag::Clickable, &SelectorConfig::default()).unwrap()
    }

    #[test]
    fn round_trips_through_stored_selectors() {
        let page = page();
        let targets: Vec<NodeId> = all_elements_deep(&page, page.root())
            .into_iter()
            .filter(|e| matches!(page.tag_name(*e), Some("button" | "a")))
            .collect();
        assert_eq!(targets.len(), 3);

        for (i, target) in targets.into_iter().enumerate() {
            let stored = info(&page, target, i).detached();
            let found = find_element(&page, &stored.iframe_selector, &stored.primary_selector).unwrap();
            assert_eq!(found, Some(target), "{}", stored.primary_selector);
            assert_eq!(resolve_descriptor(&page, &stored), Some(target));
        }
    }

    #[test]
    fn xpath_selectors_resolve_too() {
        let page = page();
        let far = page.get_element_by_id(page.root(), "far").unwrap();
        assert_eq!(find_element(&page, "", "/html/body/p").unwrap(), Some(far));
    }

    #[test]
    fn missing_iframe_and_cross_origin_are_errors() {
        let page = page();
        assert!(matches!(
            find_element(&page, "html > body > iframe:nth-of-type(4)", "a"),
            Err(HighlightError::ElementNotFound(_))
        ));
        assert!(matches!(
            find_element(&page, CROSS_ORIGIN_IFRAME, "a"),
            Err(HighlightError::CrossOrigin(_))
        ));
    }

    #[test]
    fn detached_element_is_not_resolved() {
        let mut page = page();
        let far = page.get_element_by_id(page.root(), "far").unwrap();
        let descriptor = info(&page, far, 0);
        page.detach(far);
        assert_eq!(resolve_descriptor(&page, &descriptor), None);
    }

    #[test]
    fn three_tier_matching() {
        let mut page = page();
        let save = page.get_element_by_id(page.root(), "save").unwrap();
        let bold = page.get_element_by_id(page.root(), "bold").unwrap();
        let far = page.get_element_by_id(page.root(), "far").unwrap();
        let candidates = vec![info(&page, far, 0), info(&page, save, 1)];

        let exact = match_interaction(&page, &candidates, save).unwrap();
        assert_eq!((exact.position, exact.tier), (1, MatchTier::Exact));

        let ancestor = match_interaction(&page, &candidates, bold).unwrap();
        assert_eq!((ancestor.position, ancestor.tier), (1, MatchTier::Ancestor));

        let body = page.body(page.root()).unwrap();
        let stray = page.append_element(body, "span", &[]);
        let save_rect = page.rect(save);
        page.set_rect(
            stray,
            ElementRect::new(save_rect.x + 2.0, save_rect.y + 2.0, 4.0, 4.0),
        );
        let spatial = match_interaction(&page, &candidates, stray).unwrap();
        assert_eq!((spatial.position, spatial.tier), (1, MatchTier::Spatial));
        assert!(spatial.score > CONTAINMENT_BONUS);
    }

    #[test]
    fn shadow_root_search_is_recursive() {
        let mut page = Page::new("https://app.example/", Default::default());
        let root = page.root();
        let html = page.append_element(root, "html", &[]);
        let mut host = page.append_element(html, "x-outer", &[]);
        for _ in 0..2 {
            let shadow = page.attach_shadow(host, ShadowRootMode::Open);
            host = page.append_element(shadow, "x-inner", &[]);
        }
        let shadow = page.attach_shadow(host, ShadowRootMode::Open);
        let target = page.append_element(shadow, "input", &[("name", "query")]);

        assert_eq!(find_element(&page, "", "[name=\"query\"]").unwrap(), Some(target));
    }

    #[test]
    fn shadow_descriptor_is_not_resolved_to_its_light_twin() {
        let mut page = Page::from_html(
            r#"<html><body>
                <button class="close">Dismiss banner</button>
                <x-panel><template shadowrootmode="open"><button class="close">Close panel</button></template></x-panel>
            </body></html>"#,
            "https://app.example/",
        );
        block_layout(&mut page);
        let buttons = all_elements_deep(&page, page.root())
            .into_iter()
            .filter(|e| page.tag_name(*e) == Some("button"))
            .collect::<Vec<_>>();
        let (light, shadowed) = (buttons[0], buttons[1]);
        assert!(page.is_shadow_root(page.tree_root(shadowed)));

        let stored = info(&page, shadowed, 0).detached();
        assert_eq!(
            find_elements(&page, &stored.iframe_selector, &stored.primary_selector).unwrap(),
            vec![light, shadowed]
        );
        assert_eq!(resolve_descriptor(&page, &stored), Some(shadowed));

        let stored = info(&page, light, 1).detached();
        assert_eq!(resolve_descriptor(&page, &stored), Some(light));
    }
}
