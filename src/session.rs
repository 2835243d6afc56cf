//! Caller-owned cache of the last candidate list, the element the user
//! actually interacted with, and the candidate that interaction matched.

use crate::classifier::Classifier;
use crate::core::config::Config;
use crate::core::finder::ElementFinder;
use crate::descriptor::{get_element_info, ElementDescriptor};
use crate::dom::node::{NodeId, Page};
use crate::errors::{HighlightError, Result};
use crate::highlight::{remove_highlight_listeners, remove_overlays, Highlighter};
use crate::resolve::{match_interaction, resolve_descriptor, InteractionMatch};
use crate::types::CapabilityTag;
use tracing::{debug, info};
use uuid::Uuid;

pub struct HighlightSession {
    id: String,
    config: Config,
    finder: Box<dyn ElementFinder>,
    classifier: Classifier,
    candidates: Vec<ElementDescriptor>,
    actual: Option<ElementDescriptor>,
    matching_candidate: Option<ElementDescriptor>,
    last_match: Option<InteractionMatch>,
}

impl HighlightSession {
    pub fn new(config: Config) -> Self {
        let finder = Box::new(Highlighter::new(config.clone()));
        Self::with_finder(config, finder)
    }

    pub fn with_finder(config: Config, finder: Box<dyn ElementFinder>) -> Self {
        let id = Uuid::new_v4().to_string();
        debug!("Created highlight session {}", id);
        Self {
            id,
            config,
            finder,
            classifier: Classifier::default(),
            candidates: Vec::new(),
            actual: None,
            matching_candidate: None,
            last_match: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn find_and_cache_candidates(
        &mut self,
        page: &Page,
        tags: &[CapabilityTag],
    ) -> Result<Vec<ElementDescriptor>> {
        self.candidates = self.finder.find_elements(page, tags).await?;
        info!("Session {} cached {} candidates", self.id, self.candidates.len());
        Ok(self.get_candidates())
    }

    /// Describes the element an interaction actually landed on.
    pub fn find_and_cache_actual(&mut self, page: &Page, element: NodeId) -> Result<ElementDescriptor> {
        let tag = self
            .classifier
            .classify(page, element)
            .first()
            .copied()
            .unwrap_or(CapabilityTag::NonInteractive);
        let descriptor = get_element_info(page, element, 0, tag, &self.config.selector)?;
        let detached = descriptor.detached();
        self.actual = Some(descriptor);
        self.matching_candidate = None;
        self.last_match = None;
        Ok(detached)
    }

    /// Matches the cached actual element against the cached candidates.
    pub fn find_and_cache_matching_candidate(&mut self, page: &Page) -> Result<Option<ElementDescriptor>> {
        let actual = self
            .actual
            .as_ref()
            .ok_or_else(|| HighlightError::ElementNotFound("no actual element cached".to_string()))?;
        let element = resolve_descriptor(page, actual)
            .ok_or_else(|| HighlightError::ElementNotFound(actual.primary_selector.clone()))?;

        self.last_match = match_interaction(page, &self.candidates, element);
        self.matching_candidate = self
            .last_match
            .and_then(|m| self.candidates.get(m.position).cloned());
        if let Some(found) = &self.last_match {
            debug!("Interaction matched candidate {} via {:?}", found.position, found.tier);
        }
        Ok(self.get_matching_candidate())
    }

    pub fn get_candidates(&self) -> Vec<ElementDescriptor> {
        self.candidates.iter().map(ElementDescriptor::detached).collect()
    }

    pub fn get_actual(&self) -> Option<ElementDescriptor> {
        self.actual.as_ref().map(ElementDescriptor::detached)
    }

    pub fn get_matching_candidate(&self) -> Option<ElementDescriptor> {
        self.matching_candidate.as_ref().map(ElementDescriptor::detached)
    }

    pub fn last_match(&self) -> Option<InteractionMatch> {
        self.last_match
    }

    /// Clears the cache and removes every highlight overlay and listener.
    pub fn reset(&mut self, page: &mut Page) {
        self.candidates.clear();
        self.actual = None;
        self.matching_candidate = None;
        self.last_match = None;
        let overlays = remove_overlays(page, &self.config.highlight.overlay_id);
        let listeners = remove_highlight_listeners(page);
        debug!(
            "Session {} reset, removed {} overlays and {} listeners",
            self.id, overlays, listeners
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::layout::block_layout;
    use crate::resolve::MatchTier;

    fn page() -> Page {
        let mut page = Page::from_html(
            r#"<html><body>
                <button id="submit-button"><span id="label">Send</span></button>
                <a id="contact-link" href="/contact">Contact</a>
            </body></html>"#,
            "https://app.example/",
        );
        block_layout(&mut page);
        page
    }

    #[tokio::test]
    async fn caches_candidates_actual_and_match() {
        let page = page();
        let mut session = HighlightSession::new(Config::default());
        let candidates = session
            .find_and_cache_candidates(&page, &[CapabilityTag::Clickable])
            .await
            .unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c.element().is_none()));

        let label = page.get_element_by_id(page.root(), "label").unwrap();
        let actual = session.find_and_cache_actual(&page, label).unwrap();
        assert_eq!(actual.primary_selector, "#label");
        assert!(actual.element().is_none());

        let matched = session.find_and_cache_matching_candidate(&page).unwrap().unwrap();
        assert_eq!(matched.primary_selector, "#submit-button");
        assert_eq!(session.last_match().unwrap().tier, MatchTier::Ancestor);
        assert!(session.get_matching_candidate().unwrap().element().is_none());
    }

    #[tokio::test]
    async fn reset_clears_cache_and_overlays() {
        let mut page = page();
        let mut highlighter = Highlighter::default();
        highlighter
            .execute(&mut page, &[CapabilityTag::Clickable], true)
            .await
            .unwrap();

        let mut session = HighlightSession::new(Config::default());
        session
            .find_and_cache_candidates(&page, &[CapabilityTag::Clickable])
            .await
            .unwrap();
        session.reset(&mut page);

        assert!(session.get_candidates().is_empty());
        assert!(session.get_actual().is_none());
        assert!(page.event_listeners().is_empty());
        assert!(page.get_element_by_id(page.root(), "highlight-overlay").is_none());
    }

    #[test]
    fn matching_without_actual_is_an_error() {
        let page = page();
        let mut session = HighlightSession::new(Config::default());
        assert!(session.find_and_cache_matching_candidate(&page).is_err());
        assert_ne!(session.id(), HighlightSession::new(Config::default()).id());
    }
}
