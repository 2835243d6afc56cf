//! CSS selector queries against a [`Page`], matched by the `selectors`
//! crate over the arena.
//!
//! Queries are tree-scoped like `querySelectorAll`: [`ArenaElement`] stops at
//! its tree root, so shadow and frame boundaries are never crossed.

use crate::dom::node::{NodeId, NodeKind, Page};
use crate::errors::{HighlightError, Result};
use cssparser::ParserInput;
use scraper::selector::{CssLocalName, CssString, NonTSPseudoClass, PseudoElement, Simple};
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::matching::{
    self, ElementSelectorFlags, IgnoreNthChildForInvalidation, MatchingContext, MatchingMode, NeedsSelectorFlags,
    QuirksMode,
};
use selectors::parser::{ParseRelative, SelectorImpl};
use selectors::{Element, NthIndexCache, OpaqueElement};
use std::fmt;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

type Namespace = <Simple as SelectorImpl>::NamespaceUrl;

/// An element of a [`Page`] as seen by the selector matcher.
#[derive(Clone, Copy)]
pub struct ArenaElement<'a> {
    page: &'a Page,
    id: NodeId,
}

impl fmt::Debug for ArenaElement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaElement")
            .field("id", &self.id)
            .field("tag", &self.page.tag_name(self.id))
            .finish()
    }
}

impl<'a> ArenaElement<'a> {
    pub fn new(page: &'a Page, id: NodeId) -> Option<Self> {
        page.is_element(id).then_some(Self { page, id })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    fn wrap(&self, id: Option<NodeId>) -> Option<Self> {
        id.and_then(|id| Self::new(self.page, id))
    }

    fn tag(&self) -> &'a str {
        self.page.tag_name(self.id).unwrap_or_default()
    }
}

impl<'a> Element for ArenaElement<'a> {
    type Impl = Simple;

    fn opaque(&self) -> OpaqueElement {
        OpaqueElement::new(self.page.node(self.id))
    }

    fn parent_element(&self) -> Option<Self> {
        self.wrap(self.page.parent_element(self.id))
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        self.page
            .parent(self.id)
            .is_some_and(|parent| self.page.is_shadow_root(parent))
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.wrap(self.page.previous_element_sibling(self.id))
    }

    fn next_sibling_element(&self) -> Option<Self> {
        self.wrap(self.page.next_element_sibling(self.id))
    }

    fn first_element_child(&self) -> Option<Self> {
        self.wrap(self.page.element_children(self.id).first().copied())
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, name: &CssLocalName) -> bool {
        self.tag() == &*name.0
    }

    fn has_namespace(&self, namespace: &Namespace) -> bool {
        namespace.is_empty() || &**namespace == HTML_NAMESPACE
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.tag() == other.tag()
    }

    fn attr_matches(
        &self,
        ns: &NamespaceConstraint<&Namespace>,
        local_name: &CssLocalName,
        operation: &AttrSelectorOperation<&CssString>,
    ) -> bool {
        if let NamespaceConstraint::Specific(url) = ns {
            if !url.is_empty() {
                return false;
            }
        }
        let Some(data) = self.page.element(self.id) else {
            return false;
        };
        data.attributes
            .iter()
            .any(|(name, value)| name.as_str() == &*local_name.0 && operation.eval_str(value))
    }

    fn match_non_ts_pseudo_class(
        &self,
        _pc: &NonTSPseudoClass,
        _context: &mut MatchingContext<'_, Self::Impl>,
    ) -> bool {
        false
    }

    fn match_pseudo_element(&self, _pe: &PseudoElement, _context: &mut MatchingContext<'_, Self::Impl>) -> bool {
        false
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn is_link(&self) -> bool {
        matches!(self.tag(), "a" | "area") && self.page.has_attribute(self.id, "href")
    }

    fn is_html_slot_element(&self) -> bool {
        self.tag() == "slot"
    }

    fn has_id(&self, id: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.page
            .attribute(self.id, "id")
            .is_some_and(|value| case_sensitivity.eq(id.0.as_bytes(), value.as_bytes()))
    }

    fn has_class(&self, name: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.page.element(self.id).is_some_and(|data| {
            data.classes()
                .any(|class| case_sensitivity.eq(class.as_bytes(), name.0.as_bytes()))
        })
    }

    fn imported_part(&self, _name: &CssLocalName) -> Option<CssLocalName> {
        None
    }

    fn is_part(&self, _name: &CssLocalName) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        self.page.children(self.id).iter().all(|child| match self.page.node(*child).kind() {
            NodeKind::Element(_) => false,
            NodeKind::Text(text) => text.is_empty(),
            _ => true,
        })
    }

    fn is_root(&self) -> bool {
        self.page
            .parent(self.id)
            .is_some_and(|parent| self.page.is_document(parent))
    }
}

/// A parsed, comma-separated selector list.
#[derive(Debug, Clone)]
pub struct SelectorList {
    source: String,
    selectors: selectors::SelectorList<Simple>,
}

/// Outcome of probing a selector for uniqueness within one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uniqueness {
    NoMatch,
    Unique(NodeId),
    Ambiguous(usize),
}

impl SelectorList {
    pub fn parse(selector: &str) -> Result<Self> {
        let mut input = ParserInput::new(selector);
        let mut parser = cssparser::Parser::new(&mut input);
        let selectors = selectors::SelectorList::parse(&scraper::selector::Parser, &mut parser, ParseRelative::No)
            .map_err(|err| HighlightError::UnsupportedSelector(format!("{}: {:?}", selector, err.kind)))?;
        Ok(Self {
            source: selector.to_string(),
            selectors,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, page: &Page, element: NodeId) -> bool {
        let mut cache = NthIndexCache::default();
        self.matches_cached(page, element, &mut cache)
    }

    fn matches_cached(&self, page: &Page, element: NodeId, cache: &mut NthIndexCache) -> bool {
        let Some(element) = ArenaElement::new(page, element) else {
            return false;
        };
        let mut context = MatchingContext::new(
            MatchingMode::Normal,
            None,
            cache,
            QuirksMode::NoQuirks,
            NeedsSelectorFlags::No,
            IgnoreNthChildForInvalidation::No,
        );
        self.selectors
            .0
            .iter()
            .any(|selector| matching::matches_selector(selector, 0, None, &element, &mut context))
    }

    fn matching<'p>(&'p self, page: &'p Page, root: NodeId) -> impl Iterator<Item = NodeId> + 'p {
        let mut cache = NthIndexCache::default();
        page.descendants(root)
            .into_iter()
            .filter(move |element| self.matches_cached(page, *element, &mut cache))
    }

    /// Matching elements under `root` in tree order.
    pub fn select(&self, page: &Page, root: NodeId) -> Vec<NodeId> {
        self.matching(page, root).collect()
    }

    pub fn select_first(&self, page: &Page, root: NodeId) -> Option<NodeId> {
        self.matching(page, root).next()
    }

    /// Counts matches under `root`, stopping at the second one.
    pub fn uniqueness(&self, page: &Page, root: NodeId) -> Uniqueness {
        let mut found = self.matching(page, root);
        match (found.next(), found.next()) {
            (None, _) => Uniqueness::NoMatch,
            (Some(element), None) => Uniqueness::Unique(element),
            (Some(_), Some(_)) => Uniqueness::Ambiguous(2),
        }
    }
}

pub fn query_selector_all(page: &Page, root: NodeId, selector: &str) -> Result<Vec<NodeId>> {
    Ok(SelectorList::parse(selector)?.select(page, root))
}

pub fn query_selector(page: &Page, root: NodeId, selector: &str) -> Result<Option<NodeId>> {
    Ok(SelectorList::parse(selector)?.select_first(page, root))
}

pub fn matches_selector(page: &Page, element: NodeId, selector: &str) -> Result<bool> {
    Ok(SelectorList::parse(selector)?.matches(page, element))
}

/// Nearest inclusive ancestor (same tree) matching `selector`.
pub fn closest(page: &Page, element: NodeId, selector: &str) -> Result<Option<NodeId>> {
    let list = SelectorList::parse(selector)?;
    let mut cursor = Some(element).filter(|e| page.is_element(*e));
    while let Some(current) = cursor {
        if list.matches(page, current) {
            return Ok(Some(current));
        }
        cursor = page.parent_element(current);
    }
    Ok(None)
}

/// Escapes an identifier the way `CSS.escape` does.
pub fn css_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    match cssparser::serialize_identifier(value, &mut out) {
        Ok(()) => out,
        Err(_) => value.to_string(),
    }
}
