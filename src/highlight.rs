//! Candidate discovery plus numbered overlay boxes drawn into each document
//! that hosts a highlighted element.

use crate::classifier::Classifier;
use crate::core::config::Config;
use crate::core::finder::ElementFinder;
use crate::descriptor::{get_element_info, ElementDescriptor};
use crate::dom::node::{NodeId, Page};
use crate::dom::traversal::all_elements_deep;
use crate::errors::Result;
use crate::filter::CandidateFilter;
use crate::resolve::resolve_descriptor;
use crate::types::{CapabilityTag, ElementRect, Viewport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Owner recorded on scroll/resize listeners registered by the highlighter.
pub const LISTENER_OWNER: &str = "dom-highlighter";

const OVERLAY_Z_INDEX: i64 = 2_147_483_647;
const BOX_CLASS: &str = "highlight-box";
const LABEL_CLASS: &str = "highlight-label";

#[derive(Debug, Clone)]
struct HighlightedBox {
    element: NodeId,
    frame: NodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportViewport {
    pub width: f64,
    pub height: f64,
    pub document_width: f64,
    pub document_height: f64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl ReportViewport {
    fn capture(viewport: &Viewport) -> Self {
        Self {
            width: viewport.width,
            height: viewport.height,
            document_width: viewport.document_width,
            document_height: viewport.document_height,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// The JSON document produced by [`Highlighter::generate_json`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageReport {
    #[serde(rename = "CLICKABLE")]
    pub clickable: Vec<ElementDescriptor>,
    #[serde(rename = "FILLABLE")]
    pub fillable: Vec<ElementDescriptor>,
    #[serde(rename = "SELECTABLE")]
    pub selectable: Vec<ElementDescriptor>,
    #[serde(rename = "NON_INTERACTIVE_ELEMENT")]
    pub non_interactive: Vec<ElementDescriptor>,
    pub viewport: ReportViewport,
}

impl PageReport {
    pub fn descriptors(&self, tag: CapabilityTag) -> &[ElementDescriptor] {
        match tag {
            CapabilityTag::Clickable => &self.clickable,
            CapabilityTag::Fillable => &self.fillable,
            CapabilityTag::Selectable => &self.selectable,
            CapabilityTag::NonInteractive => &self.non_interactive,
        }
    }
}

pub struct Highlighter {
    config: Config,
    classifier: Classifier,
    filter: CandidateFilter,
    boxes: Vec<HighlightedBox>,
    listeners: Vec<u64>,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Highlighter {
    pub fn new(config: Config) -> Self {
        Self::with_classifier(config, Classifier::default())
    }

    pub fn with_classifier(config: Config, classifier: Classifier) -> Self {
        let filter = CandidateFilter::new(&config);
        Self {
            config,
            classifier,
            filter,
            boxes: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Number of boxes currently drawn.
    pub fn highlighted_count(&self) -> usize {
        self.boxes.len()
    }

    /// Classifies, describes and filters. Elements without a usable
    /// selector are skipped individually.
    pub async fn find_elements(&self, page: &Page, tags: &[CapabilityTag]) -> Result<Vec<ElementDescriptor>> {
        let candidates = self.classifier.find_candidates(page, tags);
        let mut descriptors = Vec::with_capacity(candidates.len());
        for (index, candidate) in candidates.iter().enumerate() {
            match get_element_info(page, candidate.element, index, candidate.tag, &self.config.selector) {
                Ok(descriptor) => descriptors.push(descriptor),
                Err(err) => warn!("Skipping candidate {}: {}", index, err),
            }
        }

        let kept = self.filter.apply(page, descriptors);
        info!("Found {} elements for {:?}", kept.len(), tags);
        Ok(kept)
    }

    /// Replaces any existing overlay with one numbered box per descriptor.
    /// Returns the number of boxes drawn.
    pub fn highlight_elements(
        &mut self,
        page: &mut Page,
        descriptors: &[ElementDescriptor],
        handle_scroll: bool,
    ) -> Result<usize> {
        remove_overlays(page, &self.config.highlight.overlay_id);
        self.boxes.clear();

        let mut overlays: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        for descriptor in descriptors {
            let Some(element) = resolve_descriptor(page, descriptor) else {
                warn!("Not highlighting {}: element not found", descriptor.primary_selector);
                continue;
            };
            let Some(document) = page.owner_document(element) else {
                continue;
            };
            let overlay = match overlays.get(&document) {
                Some(overlay) => *overlay,
                None => {
                    let overlay = self.create_overlay(page, document);
                    overlays.insert(document, overlay);
                    overlay
                }
            };
            let frame = self.draw_box(page, overlay, element, &descriptor.index);
            self.boxes.push(HighlightedBox { element, frame });
        }

        if handle_scroll {
            self.remove_listeners(page);
            for document in overlays.keys() {
                for event in ["scroll", "resize"] {
                    let id = page.add_event_listener(*document, event, LISTENER_OWNER);
                    self.listeners.push(id);
                }
            }
        }
        debug!("Highlighted {} elements in {} documents", self.boxes.len(), overlays.len());
        Ok(self.boxes.len())
    }

    fn create_overlay(&self, page: &mut Page, document: NodeId) -> NodeId {
        let parent = page
            .body(document)
            .or_else(|| page.document_element(document))
            .unwrap_or(document);
        let overlay = page.append_element(
            parent,
            "div",
            &[
                ("id", self.config.highlight.overlay_id.as_str()),
                (
                    "style",
                    "position:fixed;top:0;left:0;width:100%;height:100%;pointer-events:none;z-index:2147483647",
                ),
            ],
        );
        if let Some(style) = page.style_mut(overlay) {
            style.position = "fixed".to_string();
            style.pointer_events = "none".to_string();
            style.z_index = Some(OVERLAY_Z_INDEX);
        }
        let bounds = match page.frame_element(document) {
            Some(frame) => {
                let rect = page.rect(frame);
                ElementRect::new(0.0, 0.0, rect.width, rect.height)
            }
            None => ElementRect::new(0.0, 0.0, page.viewport().width, page.viewport().height),
        };
        page.set_rect(overlay, bounds);
        overlay
    }

    fn draw_box(&self, page: &mut Page, overlay: NodeId, element: NodeId, index: &str) -> NodeId {
        let frame = page.append_element(overlay, "div", &[("class", BOX_CLASS), ("data-index", index)]);
        let label = page.append_element(frame, "span", &[("class", LABEL_CLASS)]);
        page.append_text(label, index);
        self.place_box(page, frame, element);
        frame
    }

    fn place_box(&self, page: &mut Page, frame: NodeId, element: NodeId) {
        let rect = page.rect(element);
        let style = format!(
            "position:absolute;left:{}px;top:{}px;width:{}px;height:{}px;border:2px solid {};pointer-events:none",
            rect.x, rect.y, rect.width, rect.height, self.config.highlight.border_color
        );
        page.set_attribute(frame, "style", &style);
        page.set_rect(frame, rect);
        if let Some(computed) = page.style_mut(frame) {
            computed.position = "absolute".to_string();
            computed.pointer_events = "none".to_string();
        }
    }

    /// Moves every box to its element's current geometry. This is what the
    /// registered scroll and resize handlers run.
    pub fn refresh(&self, page: &mut Page) -> usize {
        let mut moved = 0;
        for highlighted in &self.boxes {
            if page.is_connected(highlighted.element) && page.is_connected(highlighted.frame) {
                self.place_box(page, highlighted.frame, highlighted.element);
                moved += 1;
            }
        }
        moved
    }

    /// Removes all overlays and, when asked, the listeners this highlighter registered.
    pub fn unhighlight_elements(&mut self, page: &mut Page, handle_scroll: bool) -> usize {
        let removed = remove_overlays(page, &self.config.highlight.overlay_id);
        self.boxes.clear();
        if handle_scroll {
            self.remove_listeners(page);
        }
        removed
    }

    fn remove_listeners(&mut self, page: &mut Page) {
        for id in self.listeners.drain(..) {
            page.remove_event_listener(id);
        }
    }

    /// Finds and highlights in one call.
    pub async fn execute(
        &mut self,
        page: &mut Page,
        tags: &[CapabilityTag],
        handle_scroll: bool,
    ) -> Result<Vec<ElementDescriptor>> {
        let descriptors = self.find_elements(page, tags).await?;
        self.highlight_elements(page, &descriptors, handle_scroll)?;
        Ok(descriptors)
    }

    /// Every capability class with its descriptors, detached, plus the viewport.
    pub async fn generate_report(&self, page: &Page) -> Result<PageReport> {
        let mut by_tag = BTreeMap::new();
        for tag in CapabilityTag::ALL {
            let found = self.find_elements(page, &[tag]).await?;
            by_tag.insert(tag, found.iter().map(ElementDescriptor::detached).collect::<Vec<_>>());
        }
        let mut take = |tag| by_tag.remove(&tag).unwrap_or_default();

        Ok(PageReport {
            clickable: take(CapabilityTag::Clickable),
            fillable: take(CapabilityTag::Fillable),
            selectable: take(CapabilityTag::Selectable),
            non_interactive: take(CapabilityTag::NonInteractive),
            viewport: ReportViewport::capture(page.viewport()),
        })
    }

    pub async fn generate_json(&self, page: &Page) -> Result<String> {
        let report = self.generate_report(page).await?;
        Ok(serde_json::to_string_pretty(&report)?)
    }
}

#[async_trait]
impl ElementFinder for Highlighter {
    async fn find_elements(&self, page: &Page, tags: &[CapabilityTag]) -> Result<Vec<ElementDescriptor>> {
        Highlighter::find_elements(self, page, tags).await
    }
}

/// Detaches every overlay with `overlay_id` from every reachable document.
pub fn remove_overlays(page: &mut Page, overlay_id: &str) -> usize {
    let overlays: Vec<NodeId> = all_elements_deep(page, page.root())
        .into_iter()
        .filter(|e| page.attribute(*e, "id") == Some(overlay_id))
        .collect();
    for overlay in &overlays {
        page.detach(*overlay);
    }
    overlays.len()
}

/// Drops every scroll/resize listener a highlighter registered on `page`.
pub fn remove_highlight_listeners(page: &mut Page) -> usize {
    let ids: Vec<u64> = page
        .event_listeners()
        .iter()
        .filter(|listener| listener.owner == LISTENER_OWNER)
        .map(|listener| listener.id)
        .collect();
    for id in &ids {
        page.remove_event_listener(*id);
    }
    ids.len()
}
