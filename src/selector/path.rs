use crate::dom::node::{NodeId, Page};
use crate::errors::{HighlightError, Result};

/// Ancestor-indexed CSS path within the element's own tree
/// (`html > body > div:nth-of-type(2) > button`). The index is omitted when
/// the element is the only sibling with its tag.
pub fn generate_css_path(page: &Page, element: NodeId) -> String {
    let mut segments = Vec::new();
    let mut cursor = Some(element).filter(|e| page.is_element(*e));
    while let Some(current) = cursor {
        let tag = page.tag_name(current).unwrap_or("*");
        if page.same_tag_count(current) > 1 {
            segments.push(format!("{}:nth-of-type({})", tag, page.nth_of_type(current)));
        } else {
            segments.push(tag.to_string());
        }
        cursor = page.parent_element(current);
    }
    segments.reverse();
    segments.join(" > ")
}

/// Absolute XPath within the element's own tree (`/html/body/div[2]/button`).
pub fn generate_xpath(page: &Page, element: NodeId) -> String {
    let mut segments = Vec::new();
    let mut cursor = Some(element).filter(|e| page.is_element(*e));
    while let Some(current) = cursor {
        let tag = page.tag_name(current).unwrap_or("*");
        if page.same_tag_count(current) > 1 {
            segments.push(format!("{}[{}]", tag, page.nth_of_type(current)));
        } else {
            segments.push(tag.to_string());
        }
        cursor = page.parent_element(current);
    }
    if segments.is_empty() {
        return String::new();
    }
    segments.reverse();
    format!("/{}", segments.join("/"))
}

/// Evaluates an absolute child-step XPath as produced by [`generate_xpath`]
/// against a document or shadow root.
pub fn resolve_xpath(page: &Page, root: NodeId, xpath: &str) -> Result<Option<NodeId>> {
    let unsupported = || HighlightError::UnsupportedXPath(xpath.to_string());
    let path = xpath.strip_prefix('/').ok_or_else(unsupported)?;
    if path.is_empty() || path.starts_with('/') {
        return Err(unsupported());
    }

    let mut current = root;
    for step in path.split('/') {
        let (tag, index) = match step.split_once('[') {
            Some((tag, rest)) => {
                let index = rest
                    .strip_suffix(']')
                    .and_then(|n| n.parse::<usize>().ok())
                    .filter(|n| *n > 0)
                    .ok_or_else(unsupported)?;
                (tag, index)
            }
            None => (step, 1),
        };
        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '*') {
            return Err(unsupported());
        }

        let next = page
            .element_children(current)
            .into_iter()
            .filter(|child| tag == "*" || page.tag_name(*child) == Some(tag))
            .nth(index - 1);
        match next {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}
