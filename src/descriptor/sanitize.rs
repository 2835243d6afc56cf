use crate::dom::node::{NodeId, NodeKind, Page};

pub const SVG_PLACEHOLDER: &str = "<svg>...</svg>";

const ALLOWED_ATTRIBUTES: [&str; 10] = [
    "role", "type", "class", "href", "alt", "title", "readonly", "checked", "enabled", "disabled",
];
const KEEP_WHEN_EMPTY: [&str; 5] = ["i", "span", "svg", "button", "input"];
const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];
const SKIPPED_ELEMENTS: [&str; 3] = ["script", "style", "template"];

fn is_test_id(name: &str) -> bool {
    let name = name.replace(['-', '_'], "");
    name.ends_with("testid") || name == "datatest" || name == "datacy" || name == "dataqa"
}

pub fn attribute_allowed(name: &str, value: &str) -> bool {
    ALLOWED_ATTRIBUTES.contains(&name)
        || is_test_id(name)
        || (name.starts_with("data-") && !value.is_empty())
}

/// Outer HTML of `element` reduced to semantic attributes, with SVG bodies
/// collapsed and empty presentational leaves removed.
pub fn sanitize_html(page: &Page, element: NodeId) -> String {
    render(page, element, true).unwrap_or_default()
}

fn render(page: &Page, node: NodeId, is_root: bool) -> Option<String> {
    match page.node(node).kind() {
        NodeKind::Text(text) => {
            let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if collapsed.is_empty() {
                None
            } else {
                Some(escape_text(&collapsed))
            }
        }
        NodeKind::Element(data) => {
            let tag = data.tag_name.as_str();
            if tag == "svg" {
                return Some(SVG_PLACEHOLDER.to_string());
            }
            if SKIPPED_ELEMENTS.contains(&tag) && !is_root {
                return None;
            }

            let attributes: Vec<String> = data
                .attributes
                .iter()
                .filter(|(name, value)| attribute_allowed(name, value))
                .map(|(name, value)| {
                    if value.is_empty() {
                        name.clone()
                    } else {
                        format!("{}=\"{}\"", name, escape_attribute(value))
                    }
                })
                .collect();
            let inner: String = page
                .children(node)
                .iter()
                .filter_map(|child| render(page, *child, false))
                .collect::<Vec<_>>()
                .join("");

            if !is_root && inner.is_empty() && attributes.is_empty() && !KEEP_WHEN_EMPTY.contains(&tag) {
                return None;
            }

            let open = if attributes.is_empty() {
                format!("<{}>", tag)
            } else {
                format!("<{} {}>", tag, attributes.join(" "))
            };
            if VOID_ELEMENTS.contains(&tag) {
                Some(open)
            } else {
                Some(format!("{}{}</{}>", open, inner, tag))
            }
        }
        _ => None,
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitize(html: &str, id: &str) -> String {
        let page = Page::from_html(html, "https://app.example/");
        let element = page.get_element_by_id(page.root(), id).unwrap();
        sanitize_html(&page, element)
    }

    #[test]
    fn strips_attributes_outside_the_allow_list() {
        let html = sanitize(
            r#"<button id="buy" class="btn" style="color:red" onclick="buy()" data-testid="buy-btn" data-empty="" aria-label="Buy">Buy now</button>"#,
            "buy",
        );
        assert_eq!(html, r#"<button class="btn" data-testid="buy-btn">Buy now</button>"#);
    }

    #[test]
    fn keeps_attributes_in_source_order() {
        let html = sanitize(
            r#"<a id="help" title="Help" role="link" href="/help" class="nav" type="text/html" data-section="faq">Help</a>"#,
            "help",
        );
        assert_eq!(
            html,
            r#"<a title="Help" role="link" href="/help" class="nav" type="text/html" data-section="faq">Help</a>"#
        );
    }

    #[test]
    fn collapses_svg_and_prunes_empty_wrappers() {
        let html = sanitize(
            r#"<a id="cart" href="/cart"><div><div></div></div><svg viewBox="0 0 10 10"><path d="M0 0"></path></svg><i></i><img alt="cart"> Cart</a>"#,
            "cart",
        );
        assert_eq!(html, r#"<a href="/cart"><svg>...</svg><i></i><img alt="cart">Cart</a>"#);
    }

    #[test]
    fn escapes_text_and_attribute_values() {
        let html = sanitize(r#"<span id="s" title="a &quot;b&quot;">1 &lt; 2</span>"#, "s");
        assert_eq!(html, r#"<span title="a &quot;b&quot;">1 &lt; 2</span>"#);
    }
}
