//! Shortest stable CSS selector for an element, found by a penalty-ordered
//! search over ancestor fragment combinations.

use crate::core::config::SelectorConfig;
use crate::dom::node::{NodeId, Page};
use crate::dom::query::{css_escape, SelectorList, Uniqueness};
use crate::errors::{HighlightError, Result};
use crate::selector::path::generate_css_path;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const ID_PENALTY: u32 = 0;
pub const CLASS_PENALTY: u32 = 1;
pub const ATTRIBUTE_PENALTY: u32 = 2;
pub const TAG_PENALTY: u32 = 5;
pub const NTH_OF_TYPE_PENALTY: u32 = 10;
pub const NTH_CHILD_PENALTY: u32 = 50;

const MAX_ATTRIBUTE_VALUE_LEN: usize = 100;
const ATTRIBUTE_ALLOW_LIST: [&str; 5] = ["role", "name", "aria-label", "rel", "href"];

/// One selector fragment at a given ancestor level (0 = the target).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathNode {
    pub name: String,
    pub penalty: u32,
    pub level: usize,
}

pub type CandidatePath = Vec<PathNode>;

/// Outcome of a search, kept for inspection by callers and tests.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub found: CandidatePath,
    pub optimized: CandidatePath,
    pub attempts: usize,
    pub exhausted_budget: bool,
}

impl SearchOutcome {
    pub fn selector(&self) -> String {
        selector_from_path(&self.optimized)
    }
}

/// Letters and hyphens only, at least three long, every hyphen/camelCase
/// token longer than two characters and without four consonants in a row.
pub fn word_like(name: &str) -> bool {
    if name.len() < 3 || !name.chars().all(|c| c.is_ascii_alphabetic() || c == '-') {
        return false;
    }

    let mut tokens: Vec<String> = Vec::new();
    for part in name.split('-') {
        let mut current = String::new();
        for c in part.chars() {
            if c.is_ascii_uppercase() && !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            current.push(c);
        }
        tokens.push(current);
    }

    tokens.iter().all(|token| {
        if token.len() <= 2 {
            return false;
        }
        let mut run = 0;
        for c in token.chars() {
            if "aeiou".contains(c.to_ascii_lowercase()) {
                run = 0;
            } else {
                run += 1;
                if run >= 4 {
                    return false;
                }
            }
        }
        true
    })
}

fn attribute_accepted(name: &str, value: &str) -> bool {
    let name_ok = ATTRIBUTE_ALLOW_LIST.contains(&name)
        || name
            .strip_prefix("data-")
            .is_some_and(|rest| word_like(rest));
    if !name_ok || value.len() >= MAX_ATTRIBUTE_VALUE_LEN {
        return false;
    }
    word_like(value) || value.strip_prefix('#').is_some_and(word_like)
}

/// Candidate fragments for `element` at `level`, cheapest first.
pub fn tie(page: &Page, element: NodeId, level: usize) -> Vec<PathNode> {
    let Some(data) = page.element(element) else {
        return Vec::new();
    };
    let tag = data.tag_name.as_str();
    let node = |name: String, penalty: u32| PathNode {
        name,
        penalty,
        level,
    };
    let mut out = Vec::new();

    if let Some(id) = data.attribute("id").filter(|id| word_like(id)) {
        out.push(node(format!("#{}", css_escape(id)), ID_PENALTY));
    }
    for class in data.classes().filter(|c| word_like(c)) {
        out.push(node(format!(".{}", css_escape(class)), CLASS_PENALTY));
    }
    for (name, value) in &data.attributes {
        if name != "id" && name != "class" && attribute_accepted(name, value) {
            out.push(node(
                format!("[{}=\"{}\"]", css_escape(name), css_escape(value)),
                ATTRIBUTE_PENALTY,
            ));
        }
    }
    out.push(node(tag.to_string(), TAG_PENALTY));
    out.push(node(
        format!("{}:nth-of-type({})", tag, page.nth_of_type(element)),
        NTH_OF_TYPE_PENALTY,
    ));
    if page.parent_element(element).is_some() {
        out.push(node(
            format!("{}:nth-child({})", tag, page.nth_child(element)),
            NTH_CHILD_PENALTY,
        ));
    }
    out
}

pub fn penalty(path: &[PathNode]) -> u32 {
    path.iter().map(|node| node.penalty).sum()
}

/// Renders a target-first path as a selector; consecutive levels are joined
/// with `>`, gaps with a descendant combinator.
pub fn selector_from_path(path: &[PathNode]) -> String {
    let Some(first) = path.first() else {
        return String::new();
    };
    let mut query = first.name.clone();
    for pair in path.windows(2) {
        let (lower, upper) = (&pair[0], &pair[1]);
        query = if upper.level == lower.level + 1 {
            format!("{} > {}", upper.name, query)
        } else {
            format!("{} {}", upper.name, query)
        };
    }
    query
}

pub struct SelectorSynthesizer<'a> {
    page: &'a Page,
    config: &'a SelectorConfig,
}

impl<'a> SelectorSynthesizer<'a> {
    pub fn new(page: &'a Page, config: &'a SelectorConfig) -> Self {
        Self { page, config }
    }

    pub fn synthesize(&self, target: NodeId) -> Result<String> {
        if !self.page.is_element(target) {
            return Err(HighlightError::NotAnElement(format!(
                "node {} cannot be selected",
                target.index()
            )));
        }
        if self.page.tag_name(target) == Some("html") {
            return Ok("html".to_string());
        }

        match self.search(target) {
            Some(outcome) => Ok(outcome.selector()),
            None => self.fallback(target),
        }
    }

    /// Runs the budgeted search and optimization. `None` means the budget ran
    /// out or no combination was unique.
    pub fn search(&self, target: NodeId) -> Option<SearchOutcome> {
        let root = self.page.tree_root(target);
        let deadline = Instant::now() + Duration::from_millis(self.config.timeout_ms);
        let mut attempts = 0usize;
        let mut combinations: Vec<CandidatePath> = vec![Vec::new()];
        let mut cursor = Some(target);
        let mut level = 0usize;

        while let Some(element) = cursor {
            let fragments = tie(self.page, element, level);
            let mut next = Vec::with_capacity(combinations.len() * fragments.len());
            for path in &combinations {
                for fragment in &fragments {
                    let mut extended = path.clone();
                    extended.push(fragment.clone());
                    next.push(extended);
                }
            }
            next.sort_by_key(|path| penalty(path));
            next.truncate(self.config.threshold.max(1));
            combinations = next;

            if level + 1 >= self.config.seed_min_length {
                for path in &combinations {
                    if Instant::now() >= deadline || attempts >= self.config.max_attempts {
                        warn!(
                            "Selector search budget exhausted after {} attempts for node {}",
                            attempts,
                            target.index()
                        );
                        return None;
                    }
                    attempts += 1;
                    match self.uniqueness_of(root, path) {
                        Uniqueness::Unique(found) if found == target => {
                            debug!("Unique selector found after {} attempts", attempts);
                            let optimized = self.optimize(root, path, target, deadline, &mut attempts);
                            return Some(SearchOutcome {
                                found: path.clone(),
                                optimized,
                                attempts,
                                exhausted_budget: false,
                            });
                        }
                        Uniqueness::NoMatch => {
                            debug!("Selector {} matched nothing", selector_from_path(path));
                        }
                        _ => {}
                    }
                }
            }

            cursor = self.page.parent_element(element);
            level += 1;
        }
        None
    }

    fn uniqueness_of(&self, root: NodeId, path: &[PathNode]) -> Uniqueness {
        match SelectorList::parse(&selector_from_path(path)) {
            Ok(list) => list.uniqueness(self.page, root),
            Err(err) => {
                debug!("Skipping unparseable candidate: {}", err);
                Uniqueness::NoMatch
            }
        }
    }

    /// Drops non-terminal segments while the path still resolves to the
    /// target, returning the cheapest surviving variant.
    fn optimize(
        &self,
        root: NodeId,
        path: &[PathNode],
        target: NodeId,
        deadline: Instant,
        attempts: &mut usize,
    ) -> CandidatePath {
        let mut best = path.to_vec();
        let mut visited: HashSet<CandidatePath> = HashSet::new();
        let mut worklist = vec![path.to_vec()];

        while let Some(current) = worklist.pop() {
            if current.len() <= 2 || current.len() <= self.config.optimized_min_length {
                continue;
            }
            for i in 1..current.len() - 1 {
                if Instant::now() >= deadline || *attempts >= self.config.max_attempts {
                    return best;
                }
                let mut shorter = current.clone();
                shorter.remove(i);
                if !visited.insert(shorter.clone()) {
                    continue;
                }
                *attempts += 1;
                if self.uniqueness_of(root, &shorter) == Uniqueness::Unique(target) {
                    if better(&shorter, &best) {
                        best = shorter.clone();
                    }
                    worklist.push(shorter);
                }
            }
        }
        best
    }

    fn fallback(&self, target: NodeId) -> Result<String> {
        let path = generate_css_path(self.page, target);
        let root = self.page.tree_root(target);
        let list = SelectorList::parse(&path)?;
        match list.uniqueness(self.page, root) {
            Uniqueness::Unique(found) if found == target => Ok(path),
            _ => Err(HighlightError::SelectorNotUnique(path)),
        }
    }
}

fn better(candidate: &[PathNode], best: &[PathNode]) -> bool {
    (penalty(candidate), candidate.len()) < (penalty(best), best.len())
}

/// Robust selector for `element`, unique within its own document or shadow root.
pub fn get_robust_selector(page: &Page, element: NodeId, config: &SelectorConfig) -> Result<String> {
    SelectorSynthesizer::new(page, config).synthesize(element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::node::ShadowRootMode;
    use crate::dom::traversal::all_elements_deep;

    fn page() -> Page {
        Page::from_html(
            r#"<html><body>
                <header class="site-header"><nav><a href="/home">Home</a><a href="/docs">Docs</a></nav></header>
                <main>
                    <form name="signup">
                        <input id="newsletter-email" type="email">
                        <button class="a1b2c3" type="submit">Join</button>
                    </form>
                    <ul class="cards">
                        <li><span>One</span></li>
                        <li><span>Two</span></li>
                        <li><span data-role="price">Three</span></li>
                    </ul>
                    <div><p>first</p><p>second</p></div>
                    <div><p>third</p></div>
                </main>
            </body></html>"#,
            "https://app.example/",
        )
    }

    #[test]
    fn word_like_rejects_generated_names() {
        assert!(word_like("newsletter-email"));
        assert!(word_like("navBar"));
        assert!(word_like("btn"));
        assert!(!word_like("a1b2c3"));
        assert!(!word_like("css-xyzw"));
        assert!(!word_like("go"));
        assert!(!word_like("my-id"));
    }

    #[test]
    fn every_element_gets_a_unique_selector() {
        let page = page();
        let config = SelectorConfig::default();
        for element in all_elements_deep(&page, page.root()) {
            let selector = get_robust_selector(&page, element, &config).unwrap();
            let list = SelectorList::parse(&selector).unwrap();
            assert_eq!(
                list.uniqueness(&page, page.tree_root(element)),
                Uniqueness::Unique(element),
                "selector {selector} is not unique"
            );
        }
    }

    #[test]
    fn prefers_ids_and_skips_hashed_classes() {
        let page = page();
        let config = SelectorConfig::default();
        let email = page.get_element_by_id(page.root(), "newsletter-email").unwrap();
        assert_eq!(get_robust_selector(&page, email, &config).unwrap(), "#newsletter-email");

        let button = query_first(&page, "button");
        let selector = get_robust_selector(&page, button, &config).unwrap();
        assert!(!selector.contains("a1b2c3"));
        assert_eq!(selector, "button");
    }

    #[test]
    fn html_short_circuits_and_text_is_rejected() {
        let mut page = page();
        let html = page.document_element(page.root()).unwrap();
        let config = SelectorConfig::default();
        assert_eq!(get_robust_selector(&page, html, &config).unwrap(), "html");

        let text = page.append_text(html, "loose");
        assert!(matches!(
            get_robust_selector(&page, text, &config),
            Err(HighlightError::NotAnElement(_))
        ));
    }

    #[test]
    fn optimization_never_increases_penalty() {
        let page = page();
        let config = SelectorConfig::default();
        let synthesizer = SelectorSynthesizer::new(&page, &config);
        for element in all_elements_deep(&page, page.root()) {
            if let Some(outcome) = synthesizer.search(element) {
                assert!(penalty(&outcome.optimized) <= penalty(&outcome.found));
                assert!(outcome.optimized.len() <= outcome.found.len());
            }
        }
    }

    #[test]
    fn exhausted_budget_falls_back_to_full_path() {
        let page = page();
        let config = SelectorConfig {
            max_attempts: 0,
            ..SelectorConfig::default()
        };
        let third = query_first(&page, "[data-role]");
        let selector = get_robust_selector(&page, third, &config).unwrap();
        assert_eq!(selector, generate_css_path(&page, third));
        assert!(selector.starts_with("html > body > main"));
    }

    #[test]
    fn shadow_elements_are_unique_within_their_shadow_root() {
        let mut page = Page::new("https://app.example/", Default::default());
        let root = page.root();
        let html = page.append_element(root, "html", &[]);
        let body = page.append_element(html, "body", &[]);
        page.append_element(body, "button", &[("class", "primary")]);
        let host = page.append_element(body, "x-widget", &[]);
        let shadow = page.attach_shadow(host, ShadowRootMode::Open);
        let inner = page.append_element(shadow, "button", &[("class", "primary")]);

        let selector = get_robust_selector(&page, inner, &SelectorConfig::default()).unwrap();
        let list = SelectorList::parse(&selector).unwrap();
        assert_eq!(list.uniqueness(&page, shadow), Uniqueness::Unique(inner));
    }

    #[test]
    fn selector_rendering_uses_child_combinator_for_adjacent_levels() {
        let path = vec![
            PathNode { name: "span".into(), penalty: TAG_PENALTY, level: 0 },
            PathNode { name: "li:nth-of-type(3)".into(), penalty: NTH_OF_TYPE_PENALTY, level: 1 },
            PathNode { name: ".cards".into(), penalty: CLASS_PENALTY, level: 3 },
        ];
        assert_eq!(selector_from_path(&path), ".cards li:nth-of-type(3) > span");
        assert_eq!(penalty(&path), 16);
    }

    fn query_first(page: &Page, selector: &str) -> NodeId {
        SelectorList::parse(selector)
            .unwrap()
            .select_first(page, page.root())
            .unwrap()
    }
}
