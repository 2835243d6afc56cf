//! Candidate pruning: infrastructure, visibility, parent/child redundancy,
//! overlap and occlusion, always in that order.

use crate::core::config::{Config, FilterConfig};
use crate::descriptor::ElementDescriptor;
use crate::dom::layout::{element_from_point, is_rendered};
use crate::dom::node::{NodeId, Page};
use crate::dom::traversal::{ancestors, is_ancestor};
use crate::selector::generate_css_path;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

static WRAPPER_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)overlay|container|wrapper").unwrap());
static ROOT_WRAPPER_XPATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/html/body(/div(\[\d+\])?){1,2}$").unwrap());
static DROPDOWN_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)dropdown-item|menu-item|select-option|option").unwrap());

const ROOT_WRAPPER_IDS: [&str; 4] = ["root", "app", "__next", "__nuxt"];
const FORM_CONTROLS: [&str; 5] = ["input", "select", "textarea", "button", "option"];
const CELL_ROLES: [&str; 4] = ["cell", "gridcell", "columnheader", "rowheader"];
const DROPDOWN_ITEM_ROLES: [&str; 4] = ["option", "menuitem", "menuitemcheckbox", "menuitemradio"];

pub struct CandidateFilter {
    config: FilterConfig,
    overlay_id: String,
}

impl CandidateFilter {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.filter.clone(),
            overlay_id: config.highlight.overlay_id.clone(),
        }
    }

    /// Runs every stage in order. The structural stages repeat until nothing
    /// more is dropped: occlusion can remove a kept intermediate, exposing a
    /// candidate to a different nearest kept ancestor.
    pub fn apply(&self, page: &Page, candidates: Vec<ElementDescriptor>) -> Vec<ElementDescriptor> {
        let total = candidates.len();
        let candidates = self.drop_infrastructure(page, candidates);
        let mut candidates = self.drop_invisible(page, candidates);
        let mut passes = 0;
        loop {
            let before = candidates.len();
            candidates = self.drop_nested(page, candidates);
            candidates = self.drop_overlapping(page, candidates);
            candidates = self.drop_occluded(page, candidates);
            passes += 1;
            if candidates.len() == before {
                break;
            }
        }
        debug!(
            "Filtered {} candidates down to {} in {} passes",
            total,
            candidates.len(),
            passes
        );
        candidates
    }

    pub fn drop_infrastructure(&self, page: &Page, candidates: Vec<ElementDescriptor>) -> Vec<ElementDescriptor> {
        candidates
            .into_iter()
            .filter(|descriptor| match descriptor.element() {
                Some(element) => {
                    !self.inside_overlay(page, element) && !self.is_framework_container(page, descriptor, element)
                }
                None => true,
            })
            .collect()
    }

    fn inside_overlay(&self, page: &Page, element: NodeId) -> bool {
        std::iter::once(element)
            .chain(ancestors(page, element))
            .any(|node| page.attribute(node, "id") == Some(self.overlay_id.as_str()))
    }

    /// A text-free div spanning the viewport from its origin that looks like
    /// an application root or layout wrapper.
    pub fn is_framework_container(&self, page: &Page, descriptor: &ElementDescriptor, element: NodeId) -> bool {
        if page.tag_name(element) != Some("div") {
            return false;
        }
        let viewport = page.viewport();
        let rect = descriptor.bounding_box;
        let coverage = self.config.viewport_coverage;
        let tolerance = self.config.origin_tolerance_px;
        let covers = rect.width >= viewport.width * coverage
            && rect.height >= viewport.height * coverage
            && rect.x.abs() <= tolerance
            && rect.y.abs() <= tolerance;
        if !covers || !page.inner_text(element).trim().is_empty() {
            return false;
        }

        let class = page.class_name(element).trim();
        descriptor.depth(page) <= self.config.shallow_depth
            || class.is_empty()
            || WRAPPER_CLASS_RE.is_match(class)
            || ROOT_WRAPPER_XPATH_RE.is_match(&descriptor.xpath)
            || page
                .attribute(element, "id")
                .is_some_and(|id| ROOT_WRAPPER_IDS.contains(&id))
    }

    pub fn drop_invisible(&self, page: &Page, candidates: Vec<ElementDescriptor>) -> Vec<ElementDescriptor> {
        let min = self.config.min_size_px;
        candidates
            .into_iter()
            .filter(|descriptor| {
                let rect = descriptor.bounding_box;
                if rect.width <= min || rect.height <= min {
                    return false;
                }
                match descriptor.element() {
                    Some(element) => {
                        is_rendered(page, element) && page.style(element).is_some_and(|s| !s.is_hidden())
                    }
                    None => true,
                }
            })
            .collect()
    }

    /// Shallow candidates first; a candidate nested in an already kept one
    /// survives only when it carries its own interactive meaning.
    pub fn drop_nested(&self, page: &Page, mut candidates: Vec<ElementDescriptor>) -> Vec<ElementDescriptor> {
        candidates.sort_by_key(|descriptor| descriptor.depth(page));

        let mut seen: HashSet<(NodeId, String)> = HashSet::new();
        let mut kept = Vec::with_capacity(candidates.len());
        for descriptor in candidates {
            let Some(element) = descriptor.element() else {
                kept.push(descriptor);
                continue;
            };

            let seen_ancestor = ancestors(page, element).into_iter().find(|ancestor| {
                seen.contains(&(page.tree_root(*ancestor), generate_css_path(page, *ancestor)))
            });
            let keep = match seen_ancestor {
                None => true,
                Some(ancestor) => keeps_under(page, element, ancestor),
            };
            if keep {
                seen.insert((page.tree_root(element), descriptor.css_path.clone()));
                kept.push(descriptor);
            } else {
                debug!("Dropping nested candidate {}", descriptor.css_path);
            }
        }
        kept
    }

    pub fn drop_overlapping(&self, page: &Page, candidates: Vec<ElementDescriptor>) -> Vec<ElementDescriptor> {
        let mut selectors = HashSet::new();
        let mut boxes = HashSet::new();
        candidates
            .into_iter()
            .filter(|descriptor| {
                let scope = scope_key(page, descriptor);
                let rect = descriptor.bounding_box;
                let geometry = (
                    scope.clone(),
                    rect.x.to_bits(),
                    rect.y.to_bits(),
                    rect.width.to_bits(),
                    rect.height.to_bits(),
                );
                let selector = (scope, descriptor.primary_selector.clone());
                if selectors.contains(&selector) || boxes.contains(&geometry) {
                    return false;
                }
                selectors.insert(selector);
                boxes.insert(geometry);
                true
            })
            .collect()
    }

    pub fn drop_occluded(&self, page: &Page, candidates: Vec<ElementDescriptor>) -> Vec<ElementDescriptor> {
        candidates
            .into_iter()
            .filter(|descriptor| {
                let Some(element) = descriptor.element() else {
                    return true;
                };
                if page.class_name(element).to_ascii_lowercase().contains("tooltip") {
                    return true;
                }
                let Some(document) = page.owner_document(element) else {
                    return true;
                };
                let (x, y) = descriptor.bounding_box.center();
                match element_from_point(page, document, x, y) {
                    None => true,
                    Some(hit) if hit == element => true,
                    Some(hit) if is_ancestor(page, hit, element) || is_ancestor(page, element, hit) => true,
                    Some(hit) => {
                        debug!(
                            "{} is covered by {:?} at ({}, {})",
                            descriptor.css_path,
                            page.tag_name(hit),
                            x,
                            y
                        );
                        false
                    }
                }
            })
            .collect()
    }
}

fn keeps_under(page: &Page, element: NodeId, ancestor: NodeId) -> bool {
    if page.tag_name(ancestor) == Some("a") {
        return false;
    }
    let tag = page.tag_name(element).unwrap_or_default();
    let kind = page
        .attribute(element, "type")
        .map(|t| t.to_ascii_lowercase())
        .unwrap_or_default();
    if tag == "input" && (kind == "checkbox" || kind == "radio") {
        return page.tag_name(ancestor) != Some("label");
    }

    let role = page.attribute(element, "role").unwrap_or_default().to_ascii_lowercase();
    FORM_CONTROLS.contains(&tag)
        || page.has_attribute(element, "contenteditable")
        || tag == "td"
        || tag == "th"
        || CELL_ROLES.contains(&role.as_str())
        || DROPDOWN_ITEM_ROLES.contains(&role.as_str())
        || DROPDOWN_ITEM_RE.is_match(page.class_name(element))
}

/// Selectors and boxes are only comparable within one tree of one document.
fn scope_key(page: &Page, descriptor: &ElementDescriptor) -> String {
    match descriptor.element() {
        Some(element) => format!("{}|{}", descriptor.iframe_selector, page.tree_root(element).index()),
        None => descriptor.iframe_selector.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::descriptor::get_element_info;
    use crate::dom::layout::block_layout;
    use crate::types::{CapabilityTag, ElementRect};

    fn describe(page: &Page, tags: &[CapabilityTag]) -> Vec<ElementDescriptor> {
        let config = Config::default();
        Classifier::default()
            .find_candidates(page, tags)
            .into_iter()
            .enumerate()
            .filter_map(|(i, c)| get_element_info(page, c.element, i, c.tag, &config.selector).ok())
            .collect()
    }

    fn layout(html: &str) -> Page {
        let mut page = Page::from_html(html, "https://app.example/");
        block_layout(&mut page);
        page
    }

    fn ids(page: &Page, kept: &[ElementDescriptor]) -> Vec<String> {
        kept.iter()
            .filter_map(|d| d.element())
            .map(|e| page.attribute(e, "id").unwrap_or("-").to_string())
            .collect()
    }

    #[test]
    fn framework_root_wrapper_is_dropped() {
        let page = layout(
            r#"<html><body style="width:1280px">
                <div id="root" style="position:absolute;left:0px;top:0px;width:1280px;height:720px;cursor:pointer"></div>
                <button id="go">Go</button>
            </body></html>"#,
        );
        let filter = CandidateFilter::new(&Config::default());
        let kept = filter.drop_infrastructure(&page, describe(&page, &[CapabilityTag::Clickable]));
        assert_eq!(ids(&page, &kept), vec!["go"]);
    }

    #[test]
    fn link_swallows_nested_content_but_forms_keep_controls() {
        let page = layout(
            r#"<html><body>
                <a id="card" href="/item"><span id="title" style="cursor:pointer">Item</span><button id="inner">Buy</button></a>
                <div id="row" onclick="select()"><input id="qty" type="number"><span id="hint" style="cursor:pointer">hint</span></div>
            </body></html>"#,
        );
        let filter = CandidateFilter::new(&Config::default());
        let kept = filter.drop_nested(&page, describe(&page, &[CapabilityTag::Clickable, CapabilityTag::Fillable]));
        let kept = ids(&page, &kept);
        assert!(kept.contains(&"card".to_string()));
        assert!(kept.contains(&"row".to_string()));
        assert!(kept.contains(&"qty".to_string()));
        assert!(!kept.contains(&"title".to_string()));
        assert!(!kept.contains(&"inner".to_string()));
        assert!(!kept.contains(&"hint".to_string()));
    }

    #[test]
    fn overlap_drops_duplicate_boxes() {
        let page = layout(r#"<html><body><button id="a">A</button><button id="b">B</button></body></html>"#);
        let filter = CandidateFilter::new(&Config::default());
        let mut candidates = describe(&page, &[CapabilityTag::Clickable]);
        let mut duplicate = candidates[0].clone();
        duplicate.primary_selector = "button.copy".to_string();
        candidates.push(duplicate);

        let kept = filter.drop_overlapping(&page, candidates);
        assert_eq!(ids(&page, &kept), vec!["a", "b"]);
    }

    #[test]
    fn pipeline_is_idempotent() {
        let page = layout(
            r#"<html><body>
                <nav class="menu"><a id="home" href="/">Home</a><a id="docs" href="/docs">Docs</a></nav>
                <label id="opt" class="radio-option" style="cursor:pointer"><input id="radio" type="radio" style="opacity:0;width:16px;height:16px">A</label>
                <div class="custom-checkbox" id="decoy"><input type="checkbox" style="width:1px;height:1px"><span>Agree</span></div>
                <input id="email" type="email">
                <table><tr><td id="cell" style="cursor:pointer">1</td></tr></table>
            </body></html>"#,
        );
        let filter = CandidateFilter::new(&Config::default());
        let once = filter.apply(&page, describe(&page, &CapabilityTag::ALL));
        let twice = filter.apply(&page, once.clone());
        assert_eq!(once, twice);
        assert!(!once.is_empty());
    }

    #[test]
    fn checkbox_under_an_occluded_button_falls_back_to_its_label() {
        let mut page = layout(
            r#"<html><body>
                <label id="outer" style="cursor:pointer"><button id="mid"><input id="box" type="checkbox"></button></label>
                <div id="cover" style="position:absolute;z-index:10"></div>
            </body></html>"#,
        );
        for (id, rect) in [
            ("outer", ElementRect::new(0.0, 0.0, 400.0, 200.0)),
            ("mid", ElementRect::new(300.0, 150.0, 100.0, 50.0)),
            ("box", ElementRect::new(10.0, 10.0, 20.0, 20.0)),
            ("cover", ElementRect::new(340.0, 165.0, 20.0, 20.0)),
        ] {
            let element = page.get_element_by_id(page.root(), id).unwrap();
            page.set_rect(element, rect);
        }

        let filter = CandidateFilter::new(&Config::default());
        let candidates = describe(&page, &[CapabilityTag::Clickable]);
        let once = filter.apply(&page, candidates);
        assert_eq!(ids(&page, &once), vec!["outer"]);
        assert_eq!(filter.apply(&page, once.clone()), once);
    }
}
