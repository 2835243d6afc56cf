pub mod rules;

pub use rules::{builtin_rules, ElementRule};

use crate::dom::node::{NodeId, Page};
use crate::dom::traversal::all_elements_deep;
use crate::types::CapabilityTag;
use std::collections::HashSet;
use tracing::debug;

/// A raw classifier match, before filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub element: NodeId,
    pub tag: CapabilityTag,
    pub rule: &'static str,
}

pub struct Classifier {
    rules: Vec<Box<dyn ElementRule>>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::with_rules(builtin_rules())
    }
}

impl Classifier {
    pub fn with_rules(rules: Vec<Box<dyn ElementRule>>) -> Self {
        Self { rules }
    }

    pub fn push_rule(&mut self, rule: Box<dyn ElementRule>) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Box<dyn ElementRule>] {
        &self.rules
    }

    /// First rule of class `tag` matching `element`.
    pub fn matching_rule(&self, page: &Page, element: NodeId, tag: CapabilityTag) -> Option<&'static str> {
        self.rules
            .iter()
            .filter(|rule| rule.tag() == tag)
            .find(|rule| rule.matches(page, element))
            .map(|rule| rule.name())
    }

    /// Every class `element` belongs to.
    pub fn classify(&self, page: &Page, element: NodeId) -> Vec<CapabilityTag> {
        CapabilityTag::ALL
            .iter()
            .copied()
            .filter(|tag| self.matching_rule(page, element, *tag).is_some())
            .collect()
    }

    /// Union of matches for `tags` across the whole page, in request order
    /// then tree order. An element matched by several requested classes is
    /// reported once, under the first.
    pub fn find_candidates(&self, page: &Page, tags: &[CapabilityTag]) -> Vec<Candidate> {
        let elements = all_elements_deep(page, page.root());
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for tag in tags {
            let before = out.len();
            for element in &elements {
                if seen.contains(element) {
                    continue;
                }
                if let Some(rule) = self.matching_rule(page, *element, *tag) {
                    seen.insert(*element);
                    out.push(Candidate {
                        element: *element,
                        tag: *tag,
                        rule,
                    });
                }
            }
            debug!("{} raw {} candidates", out.len() - before, tag);
        }
        out
    }
}
