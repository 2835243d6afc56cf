//! Built-in heuristics that assign capability classes to elements.

use crate::dom::node::{NodeId, Page};
use crate::dom::traversal::parent_element_deep;
use crate::types::CapabilityTag;
use regex::Regex;
use std::sync::LazyLock;

static TOGGLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)switch|toggle|slider").unwrap());
static DROPDOWN_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)dropdown|drop-down|menu|select|picker").unwrap());
static NAV_CONTAINER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(^|[\s_-])(nav|navbar|navigation|menu|sidebar)($|[\s_-])").unwrap());
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^h\d$").unwrap());
static TEXT_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)text").unwrap());

const MENU_ROLES: [&str; 7] = ["menu", "menubar", "menuitem", "menuitemcheckbox", "menuitemradio", "listbox", "option"];
const SELECT_ROLES: [&str; 6] = ["combobox", "listbox", "dropdown", "option", "menu", "menuitem"];
const DROPDOWN_TAGS: [&str; 8] = ["div", "span", "li", "a", "button", "label", "p", "ul"];
const TEXT_TAGS: [&str; 7] = ["p", "span", "div", "input", "textarea", "td", "th"];
const NAV_SEARCH_DEPTH: usize = 6;
const TOGGLE_PARENT_LEVELS: usize = 3;

/// One classification heuristic. Rules are consulted in order and an
/// element belongs to a class when any rule of that class matches.
pub trait ElementRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn tag(&self) -> CapabilityTag;
    fn matches(&self, page: &Page, element: NodeId) -> bool;
}

fn input_type(page: &Page, element: NodeId) -> Option<String> {
    if page.tag_name(element) != Some("input") {
        return None;
    }
    Some(
        page.attribute(element, "type")
            .unwrap_or("text")
            .trim()
            .to_ascii_lowercase(),
    )
}

fn role(page: &Page, element: NodeId) -> Option<String> {
    page.attribute(element, "role").map(|r| r.trim().to_ascii_lowercase())
}

fn class_or_role_matches(page: &Page, element: NodeId, re: &Regex) -> bool {
    re.is_match(page.class_name(element)) || role(page, element).is_some_and(|r| re.is_match(&r))
}

fn is_checkbox(page: &Page, element: NodeId) -> bool {
    input_type(page, element).as_deref() == Some("checkbox")
}

fn inside_svg(page: &Page, element: NodeId) -> bool {
    let mut cursor = Some(element);
    while let Some(current) = cursor {
        if page.tag_name(current) == Some("svg") {
            return true;
        }
        cursor = page.parent_element(current);
    }
    false
}

/// `a`, `button`, button-like inputs, `[role=button]` and `[onclick]`.
pub struct NativeClickable;

impl ElementRule for NativeClickable {
    fn name(&self) -> &'static str {
        "native-clickable"
    }

    fn tag(&self) -> CapabilityTag {
        CapabilityTag::Clickable
    }

    fn matches(&self, page: &Page, element: NodeId) -> bool {
        match page.tag_name(element) {
            Some("a") | Some("button") => return true,
            _ => {}
        }
        if matches!(input_type(page, element).as_deref(), Some("button" | "submit" | "reset")) {
            return true;
        }
        role(page, element).as_deref() == Some("button") || page.has_attribute(element, "onclick")
    }
}

pub struct MenuRoleClickable;

impl ElementRule for MenuRoleClickable {
    fn name(&self) -> &'static str {
        "menu-role"
    }

    fn tag(&self) -> CapabilityTag {
        CapabilityTag::Clickable
    }

    fn matches(&self, page: &Page, element: NodeId) -> bool {
        role(page, element).is_some_and(|r| MENU_ROLES.contains(&r.as_str()))
            || page.attribute(element, "data-toggle") == Some("dropdown")
            || page.class_name(element).split_whitespace().any(|c| c == "dropdown-toggle")
    }
}

/// Native checkboxes and radios.
pub struct NativeToggle;

impl ElementRule for NativeToggle {
    fn name(&self) -> &'static str {
        "native-toggle"
    }

    fn tag(&self) -> CapabilityTag {
        CapabilityTag::Clickable
    }

    fn matches(&self, page: &Page, element: NodeId) -> bool {
        matches!(input_type(page, element).as_deref(), Some("checkbox" | "radio"))
    }
}

/// A styled wrapper whose single real checkbox is collapsed to at most 1px.
pub struct DecoyCheckbox;

impl ElementRule for DecoyCheckbox {
    fn name(&self) -> &'static str {
        "decoy-checkbox"
    }

    fn tag(&self) -> CapabilityTag {
        CapabilityTag::Clickable
    }

    fn matches(&self, page: &Page, element: NodeId) -> bool {
        if page.tag_name(element) == Some("input")
            || !page.class_name(element).to_ascii_lowercase().contains("checkbox")
        {
            return false;
        }
        let inputs: Vec<NodeId> = page
            .descendants(element)
            .into_iter()
            .filter(|d| is_checkbox(page, *d))
            .collect();
        match inputs.as_slice() {
            [input] => {
                let rect = page.rect(*input);
                rect.width <= 1.0 || rect.height <= 1.0
            }
            _ => false,
        }
    }
}

/// Checkboxes styled as switches: the input itself, an ancestor within three
/// levels or its next sibling carries a switch/toggle/slider class or role.
pub struct ToggleSwitch;

impl ElementRule for ToggleSwitch {
    fn name(&self) -> &'static str {
        "toggle-switch"
    }

    fn tag(&self) -> CapabilityTag {
        CapabilityTag::Clickable
    }

    fn matches(&self, page: &Page, element: NodeId) -> bool {
        if !is_checkbox(page, element) {
            return false;
        }
        if class_or_role_matches(page, element, &TOGGLE_RE) {
            return true;
        }
        let mut cursor = page.parent_element(element);
        for _ in 0..TOGGLE_PARENT_LEVELS {
            let Some(parent) = cursor else { break };
            if class_or_role_matches(page, parent, &TOGGLE_RE) {
                return true;
            }
            cursor = page.parent_element(parent);
        }
        page.next_element_sibling(element)
            .is_some_and(|sibling| class_or_role_matches(page, sibling, &TOGGLE_RE))
    }
}

/// Computed `cursor: pointer`, except SVG content.
pub struct PointerCursor;

impl ElementRule for PointerCursor {
    fn name(&self) -> &'static str {
        "pointer-cursor"
    }

    fn tag(&self) -> CapabilityTag {
        CapabilityTag::Clickable
    }

    fn matches(&self, page: &Page, element: NodeId) -> bool {
        page.style(element).is_some_and(|s| s.is_pointer()) && !inside_svg(page, element)
    }
}

/// Text inputs of any kind other than radio/checkbox, `textarea`, and
/// `[contenteditable=true]`.
pub struct FillableField;

impl ElementRule for FillableField {
    fn name(&self) -> &'static str {
        "fillable-field"
    }

    fn tag(&self) -> CapabilityTag {
        CapabilityTag::Fillable
    }

    fn matches(&self, page: &Page, element: NodeId) -> bool {
        if let Some(kind) = input_type(page, element) {
            return kind != "radio" && kind != "checkbox";
        }
        page.tag_name(element) == Some("textarea")
            || page
                .attribute(element, "contenteditable")
                .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

pub struct NativeSelect;

impl ElementRule for NativeSelect {
    fn name(&self) -> &'static str {
        "native-select"
    }

    fn tag(&self) -> CapabilityTag {
        CapabilityTag::Selectable
    }

    fn matches(&self, page: &Page, element: NodeId) -> bool {
        page.tag_name(element) == Some("select")
    }
}

pub struct AriaSelect;

impl ElementRule for AriaSelect {
    fn name(&self) -> &'static str {
        "aria-select"
    }

    fn tag(&self) -> CapabilityTag {
        CapabilityTag::Selectable
    }

    fn matches(&self, page: &Page, element: NodeId) -> bool {
        if matches!(input_type(page, element).as_deref(), Some("checkbox" | "radio" | "button")) {
            return false;
        }
        role(page, element).is_some_and(|r| SELECT_ROLES.contains(&r.as_str()))
    }
}

/// Dropdown-named classes on pointer elements, links or buttons.
pub struct DropdownClass;

impl ElementRule for DropdownClass {
    fn name(&self) -> &'static str {
        "dropdown-class"
    }

    fn tag(&self) -> CapabilityTag {
        CapabilityTag::Selectable
    }

    fn matches(&self, page: &Page, element: NodeId) -> bool {
        let Some(tag) = page.tag_name(element) else {
            return false;
        };
        DROPDOWN_CLASS_RE.is_match(page.class_name(element))
            && DROPDOWN_TAGS.contains(&tag)
            && (tag == "a" || tag == "button" || page.style(element).is_some_and(|s| s.is_pointer()))
    }
}

pub struct HasPopup;

impl ElementRule for HasPopup {
    fn name(&self) -> &'static str {
        "aria-haspopup"
    }

    fn tag(&self) -> CapabilityTag {
        CapabilityTag::Selectable
    }

    fn matches(&self, page: &Page, element: NodeId) -> bool {
        page.attribute(element, "aria-haspopup")
            .is_some_and(|v| !v.eq_ignore_ascii_case("false"))
    }
}

/// `nav li` and links inside `.nav`, `.menu` or `.sidebar` containers.
pub struct NavigationLink;

impl ElementRule for NavigationLink {
    fn name(&self) -> &'static str {
        "navigation-link"
    }

    fn tag(&self) -> CapabilityTag {
        CapabilityTag::Selectable
    }

    fn matches(&self, page: &Page, element: NodeId) -> bool {
        let tag = page.tag_name(element);
        if tag != Some("li") && tag != Some("a") {
            return false;
        }
        let mut cursor = parent_element_deep(page, element);
        for _ in 0..NAV_SEARCH_DEPTH {
            let Some(ancestor) = cursor else { break };
            if tag == Some("li") && page.tag_name(ancestor) == Some("nav") {
                return true;
            }
            if NAV_CONTAINER_RE.is_match(page.class_name(ancestor)) {
                return true;
            }
            cursor = parent_element_deep(page, ancestor);
        }
        false
    }
}

/// Leaf text carriers larger than 1x1.
pub struct TextLeaf;

impl ElementRule for TextLeaf {
    fn name(&self) -> &'static str {
        "text-leaf"
    }

    fn tag(&self) -> CapabilityTag {
        CapabilityTag::NonInteractive
    }

    fn matches(&self, page: &Page, element: NodeId) -> bool {
        let Some(tag) = page.tag_name(element) else {
            return false;
        };
        if matches!(tag, "select" | "button" | "a") || !page.element_children(element).is_empty() {
            return false;
        }
        let rect = page.rect(element);
        (TEXT_TAGS.contains(&tag) || HEADING_RE.is_match(tag) || TEXT_TAG_RE.is_match(tag))
            && rect.width > 1.0
            && rect.height > 1.0
    }
}

/// The default rule list, in evaluation order.
pub fn builtin_rules() -> Vec<Box<dyn ElementRule>> {
    vec![
        Box::new(NativeClickable),
        Box::new(MenuRoleClickable),
        Box::new(NativeToggle),
        Box::new(DecoyCheckbox),
        Box::new(ToggleSwitch),
        Box::new(PointerCursor),
        Box::new(FillableField),
        Box::new(NativeSelect),
        Box::new(AriaSelect),
        Box::new(DropdownClass),
        Box::new(HasPopup),
        Box::new(NavigationLink),
        Box::new(TextLeaf),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::layout::block_layout;

    fn laid_out(html: &str) -> Page {
        let mut page = Page::from_html(html, "https://app.example/");
        block_layout(&mut page);
        page
    }

    fn by_id(page: &Page, id: &str) -> NodeId {
        page.get_element_by_id(page.root(), id).unwrap()
    }

    #[test]
    fn clickable_heuristics() {
        let page = laid_out(
            r#"<html><body>
                <div id="handler" onclick="go()">Go</div>
                <div id="role" role="button">Role</div>
                <input id="reset" type="reset">
                <div id="pointer" style="cursor:pointer">Pointer</div>
                <svg id="icon" style="cursor:pointer"><path id="shape"></path></svg>
                <p id="plain">Plain</p>
            </body></html>"#,
        );
        assert!(NativeClickable.matches(&page, by_id(&page, "handler")));
        assert!(NativeClickable.matches(&page, by_id(&page, "role")));
        assert!(NativeClickable.matches(&page, by_id(&page, "reset")));
        assert!(PointerCursor.matches(&page, by_id(&page, "pointer")));
        assert!(!PointerCursor.matches(&page, by_id(&page, "icon")));
        assert!(!PointerCursor.matches(&page, by_id(&page, "shape")));
        assert!(!NativeClickable.matches(&page, by_id(&page, "plain")));
    }

    #[test]
    fn decoy_checkbox_requires_single_collapsed_input() {
        let page = laid_out(
            r#"<html><body>
                <div id="decoy" class="custom-checkbox"><input type="checkbox" style="width:1px;height:1px"><span>Agree</span></div>
                <div id="visible" class="checkbox-row"><input type="checkbox"></div>
                <div id="double" class="checkbox-group">
                    <input type="checkbox" style="width:0px;height:0px">
                    <input type="checkbox" style="width:0px;height:0px">
                </div>
            </body></html>"#,
        );
        assert!(DecoyCheckbox.matches(&page, by_id(&page, "decoy")));
        assert!(!DecoyCheckbox.matches(&page, by_id(&page, "visible")));
        assert!(!DecoyCheckbox.matches(&page, by_id(&page, "double")));
    }

    #[test]
    fn toggle_switch_looks_at_parents_and_siblings() {
        let page = laid_out(
            r#"<html><body>
                <label class="switch"><span><input id="nested" type="checkbox"></span></label>
                <div><input id="sibling" type="checkbox"><span class="slider"></span></div>
                <div><input id="plain" type="checkbox"></div>
            </body></html>"#,
        );
        assert!(ToggleSwitch.matches(&page, by_id(&page, "nested")));
        assert!(ToggleSwitch.matches(&page, by_id(&page, "sibling")));
        assert!(!ToggleSwitch.matches(&page, by_id(&page, "plain")));
    }

    #[test]
    fn fillable_excludes_radio_and_checkbox() {
        let page = laid_out(
            r#"<html><body>
                <input id="email" type="email">
                <input id="bare">
                <input id="radio" type="radio">
                <textarea id="notes"></textarea>
                <div id="editor" contenteditable="true"></div>
            </body></html>"#,
        );
        for id in ["email", "bare", "notes", "editor"] {
            assert!(FillableField.matches(&page, by_id(&page, id)), "{id}");
        }
        assert!(!FillableField.matches(&page, by_id(&page, "radio")));
    }

    #[test]
    fn selectable_heuristics() {
        let page = laid_out(
            r#"<html><body>
                <select id="native"><option>A</option></select>
                <div id="combo" role="combobox">Pick</div>
                <input id="checkbox-option" type="checkbox" role="option">
                <div id="menu" class="dropdown-menu" style="cursor:pointer">Menu</div>
                <div id="inert-menu" class="dropdown-menu">Menu</div>
                <button id="popup" aria-haspopup="true">More</button>
                <nav><ul><li id="nav-item">Home</li></ul></nav>
                <div class="sidebar"><a id="side-link" href="/a">A</a></div>
            </body></html>"#,
        );
        assert!(NativeSelect.matches(&page, by_id(&page, "native")));
        assert!(AriaSelect.matches(&page, by_id(&page, "combo")));
        assert!(!AriaSelect.matches(&page, by_id(&page, "checkbox-option")));
        assert!(DropdownClass.matches(&page, by_id(&page, "menu")));
        assert!(!DropdownClass.matches(&page, by_id(&page, "inert-menu")));
        assert!(HasPopup.matches(&page, by_id(&page, "popup")));
        assert!(NavigationLink.matches(&page, by_id(&page, "nav-item")));
        assert!(NavigationLink.matches(&page, by_id(&page, "side-link")));
    }

    #[test]
    fn text_leaves() {
        let page = laid_out(
            r#"<html><body>
                <h2 id="title">Title</h2>
                <div id="wrapper"><p id="para">Body</p></div>
                <span id="tiny" style="width:1px;height:1px">x</span>
                <a id="link" href="/x">Link</a>
            </body></html>"#,
        );
        assert!(TextLeaf.matches(&page, by_id(&page, "title")));
        assert!(TextLeaf.matches(&page, by_id(&page, "para")));
        assert!(!TextLeaf.matches(&page, by_id(&page, "wrapper")));
        assert!(!TextLeaf.matches(&page, by_id(&page, "tiny")));
        assert!(!TextLeaf.matches(&page, by_id(&page, "link")));
    }
}
