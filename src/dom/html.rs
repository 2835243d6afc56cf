use crate::dom::node::{NodeId, Page, ShadowRootMode};
use crate::dom::style::{parse_inline_style, ComputedStyle};
use crate::types::Viewport;
use scraper::{Html, Node};
use tracing::{debug, warn};

const MAX_FRAME_DEPTH: usize = 8;

impl Page {
    /// Builds a page from HTML source.
    ///
    /// Declarative shadow roots (`<template shadowrootmode>`) are attached to
    /// their parent, `srcdoc` iframes become same-origin frame documents and
    /// `src`-only iframes are recorded as unavailable. No geometry is
    /// computed; see [`crate::dom::layout::block_layout`].
    pub fn from_html(html: &str, url: &str) -> Page {
        Self::from_html_with_viewport(html, url, Viewport::default())
    }

    pub fn from_html_with_viewport(html: &str, url: &str, viewport: Viewport) -> Page {
        let mut page = Page::new(url, viewport);
        let root = page.root();
        import_document(&mut page, root, html, 0);
        page
    }
}

fn import_document(page: &mut Page, document: NodeId, source: &str, frame_depth: usize) {
    let parsed = Html::parse_document(source);
    if !parsed.errors.is_empty() {
        debug!("HTML parsed with {} recoverable errors", parsed.errors.len());
    }

    let mut stack = vec![(parsed.tree.root(), document)];
    while let Some((node, parent)) = stack.pop() {
        let mut children = Vec::new();
        for child in node.children() {
            match child.value() {
                Node::Doctype(doctype) => {
                    page.append_doctype(parent, doctype.name(), doctype.public_id(), doctype.system_id());
                }
                Node::Comment(comment) => {
                    page.append_comment(parent, comment);
                }
                Node::Text(text) => {
                    page.append_text(parent, text);
                }
                Node::Element(element) => {
                    let name = element.name().to_ascii_lowercase();
                    let attrs: Vec<(&str, &str)> = element.attrs().collect();

                    if name == "template" && page.is_element(parent) {
                        if let Some(mode) = declarative_shadow_mode(&attrs) {
                            let shadow = page.attach_shadow(parent, mode);
                            children.push((child, shadow));
                            continue;
                        }
                    }

                    let id = page.append_element(parent, &name, &attrs);
                    apply_style(page, id, parent);

                    if name == "iframe" {
                        import_frame(page, id, &attrs, frame_depth);
                    }
                    // Plain template contents stay inert.
                    if name != "template" {
                        children.push((child, id));
                    }
                }
                // Template contents hang off a fragment node.
                Node::Fragment => children.push((child, parent)),
                _ => {}
            }
        }
        // Reverse so children are visited in document order.
        for entry in children.into_iter().rev() {
            stack.push(entry);
        }
    }
}

fn declarative_shadow_mode(attrs: &[(&str, &str)]) -> Option<ShadowRootMode> {
    attrs
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("shadowrootmode"))
        .map(|(_, value)| {
            if value.eq_ignore_ascii_case("closed") {
                ShadowRootMode::Closed
            } else {
                ShadowRootMode::Open
            }
        })
}

fn import_frame(page: &mut Page, iframe: NodeId, attrs: &[(&str, &str)], frame_depth: usize) {
    let attr = |name: &str| {
        attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.to_string())
    };

    match attr("srcdoc") {
        Some(srcdoc) if frame_depth < MAX_FRAME_DEPTH => {
            let document = page.attach_frame_document(iframe, "about:srcdoc");
            import_document(page, document, &srcdoc, frame_depth + 1);
        }
        Some(_) => {
            warn!("Frame nesting deeper than {} levels, content dropped", MAX_FRAME_DEPTH);
            page.set_frame_unavailable(iframe, None);
        }
        None => page.set_frame_unavailable(iframe, attr("src")),
    }
}

fn apply_style(page: &mut Page, element: NodeId, parent: NodeId) {
    let inherited = page
        .style(parent)
        .or_else(|| page.shadow_host(parent).and_then(|host| page.style(host)))
        .map(ComputedStyle::inherit_from)
        .unwrap_or_default();

    let Some(data) = page.element(element) else {
        return;
    };
    let tag = data.tag_name.clone();
    let mut style = inherited;

    match tag.as_str() {
        "head" | "script" | "style" | "template" | "title" | "meta" | "link" | "noscript" => {
            style.display = "none".to_string()
        }
        "span" | "a" | "label" | "b" | "i" | "em" | "strong" | "small" | "code" | "img" => {
            style.display = "inline".to_string()
        }
        "button" | "input" | "select" | "textarea" => style.display = "inline-block".to_string(),
        "td" | "th" => style.display = "table-cell".to_string(),
        _ => {}
    }
    if tag == "a" && data.attribute("href").is_some() {
        style.cursor = "pointer".to_string();
    }
    if tag == "input" && data.attribute("type").is_some_and(|t| t.eq_ignore_ascii_case("hidden")) {
        style.display = "none".to_string();
    }
    if data.attribute("hidden").is_some() {
        style.display = "none".to_string();
    }
    if let Some(inline) = data.attribute("style") {
        style.apply_declarations(&parse_inline_style(inline));
    }

    if let Some(target) = page.style_mut(element) {
        *target = style;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::node::Frame;
    use crate::dom::traversal::query_all_deep;

    #[test]
    fn imports_elements_text_and_styles() {
        let page = Page::from_html(
            r#"<!DOCTYPE html><html><body>
                <div style="cursor: pointer"><span id="label">Pick me</span></div>
                <a href="/docs" id="docs">Docs</a>
                <input type="hidden" id="token">
            </body></html>"#,
            "https://app.example/",
        );
        let root = page.root();
        let label = page.get_element_by_id(root, "label").unwrap();
        let docs = page.get_element_by_id(root, "docs").unwrap();
        let token = page.get_element_by_id(root, "token").unwrap();

        assert!(page.style(label).unwrap().is_pointer());
        assert!(page.style(docs).unwrap().is_pointer());
        assert!(page.style(token).unwrap().is_display_none());
        assert_eq!(page.inner_text(label), "Pick me");
    }

    #[test]
    fn declarative_shadow_roots_and_srcdoc_frames() {
        let page = Page::from_html(
            r#"<html><body>
                <x-card><template shadowrootmode="open"><button id="inner">Go</button></template></x-card>
                <x-locked><template shadowrootmode="closed"><button>Hidden</button></template></x-locked>
                <iframe id="same" srcdoc="<button id='framed'>Framed</button>"></iframe>
                <iframe id="remote" src="https://ads.example/banner"></iframe>
            </body></html>"#,
            "https://app.example/",
        );
        let buttons = query_all_deep(&page, page.root(), "button").unwrap();
        assert_eq!(buttons.len(), 2);

        let remote = page.get_element_by_id(page.root(), "remote").unwrap();
        assert_eq!(
            page.frame(remote),
            Some(&Frame::Unavailable {
                src: Some("https://ads.example/banner".to_string())
            })
        );
    }

    #[test]
    fn template_contents_become_shadow_children() {
        let page = Page::from_html(
            r#"<html><body>
                <x-card id="host"><template shadowrootmode="open"><p>Intro</p><button id="inner">Go</button></template></x-card>
                <template id="inert"><button id="unused">No</button></template>
            </body></html>"#,
            "https://app.example/",
        );
        let host = page.get_element_by_id(page.root(), "host").unwrap();
        let shadow = page.shadow_root(host).unwrap();
        let tags: Vec<_> = page
            .element_children(shadow)
            .into_iter()
            .filter_map(|child| page.tag_name(child))
            .collect();
        assert_eq!(tags, vec!["p", "button"]);
        assert!(page.get_element_by_id(shadow, "inner").is_some());

        let inert = page.get_element_by_id(page.root(), "inert").unwrap();
        assert!(page.children(inert).is_empty());
        assert!(query_all_deep(&page, page.root(), "#unused").unwrap().is_empty());
    }
}
