use crate::descriptor::ElementDescriptor;
use crate::dom::layout::block_layout;
use crate::dom::node::{NodeId, Page};
use crate::dom::traversal::all_elements_deep;
use crate::errors::Result;
use crate::highlight::{Highlighter, PageReport};
use crate::types::{CapabilityTag, Viewport};

pub const FIXTURE_URL: &str = "https://fixtures.example/";

pub struct TestHelper;

impl TestHelper {
    /// Parses `html` and gives it naive block geometry.
    pub fn load_html(html: &str) -> Page {
        let mut page = Page::from_html_with_viewport(html, FIXTURE_URL, Viewport::default());
        block_layout(&mut page);
        page
    }

    pub fn newsletter_page() -> Page {
        Self::load_html(
            r#"<!DOCTYPE html><html><body>
                <h1>Stay in touch</h1>
                <form>
                    <input id="newsletter-email" type="email" placeholder="Email">
                    <button id="submit-button" type="submit">Subscribe</button>
                </form>
                <a id="contact-link" href="/contact">Contact us</a>
            </body></html>"#,
        )
    }

    pub fn modal_page() -> Page {
        Self::load_html(
            r#"<html><body>
                <button id="buy">Buy</button>
                <div id="tip" class="tooltip" onclick="showTip()">Tip</div>
                <div id="modal" style="position:fixed;left:0px;top:0px;width:1280px;height:720px;z-index:100">
                    <button id="close">Close</button>
                </div>
            </body></html>"#,
        )
    }

    pub fn form_controls_page() -> Page {
        Self::load_html(
            r#"<html><body>
                <div id="terms" class="custom-checkbox">
                    <input id="terms-input" type="checkbox" style="width:1px;height:1px">
                    <span>I agree</span>
                </div>
                <label id="plan-monthly" class="radio-option" style="cursor:pointer">
                    <input id="plan-monthly-input" type="radio" name="plan" style="opacity:0;width:16px;height:16px">
                    Monthly
                </label>
                <div id="card" onclick="openCard()">Open card</div>
            </body></html>"#,
        )
    }

    pub fn element(page: &Page, id: &str) -> Option<NodeId> {
        all_elements_deep(page, page.root())
            .into_iter()
            .find(|e| page.attribute(*e, "id") == Some(id))
    }

    /// `id` attributes of the descriptors' live elements, `-` when absent.
    pub fn ids(page: &Page, descriptors: &[ElementDescriptor]) -> Vec<String> {
        descriptors
            .iter()
            .map(|d| {
                d.element()
                    .and_then(|e| page.attribute(e, "id"))
                    .unwrap_or("-")
                    .to_string()
            })
            .collect()
    }

    pub async fn find(page: &Page, tags: &[CapabilityTag]) -> Result<Vec<ElementDescriptor>> {
        Highlighter::default().find_elements(page, tags).await
    }

    pub fn report_stats(report: &PageReport) -> ReportStats {
        ReportStats {
            clickable: report.clickable.len(),
            fillable: report.fillable.len(),
            selectable: report.selectable.len(),
            non_interactive: report.non_interactive.len(),
            in_iframes: CapabilityTag::ALL
                .iter()
                .flat_map(|tag| report.descriptors(*tag))
                .filter(|d| d.is_inside_iframe())
                .count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportStats {
    pub clickable: usize,
    pub fillable: usize,
    pub selectable: usize,
    pub non_interactive: usize,
    pub in_iframes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{find_element, resolve_descriptor};

    #[tokio::test]
    async fn newsletter_scenario() {
        let page = TestHelper::newsletter_page();

        let fillable = TestHelper::find(&page, &[CapabilityTag::Fillable]).await.unwrap();
        assert_eq!(fillable.len(), 1);
        assert_eq!(fillable[0].primary_selector, "#newsletter-email");
        let email = TestHelper::element(&page, "newsletter-email").unwrap();
        assert_eq!(find_element(&page, "", &fillable[0].primary_selector).unwrap(), Some(email));

        let clickable = TestHelper::find(&page, &[CapabilityTag::Clickable]).await.unwrap();
        let mut ids = TestHelper::ids(&page, &clickable);
        ids.sort();
        assert_eq!(ids, vec!["contact-link", "submit-button"]);
    }

    #[tokio::test]
    async fn div_with_onclick_is_clickable() {
        let page = TestHelper::form_controls_page();
        let clickable = TestHelper::find(&page, &[CapabilityTag::Clickable]).await.unwrap();
        assert!(TestHelper::ids(&page, &clickable).contains(&"card".to_string()));
    }

    #[tokio::test]
    async fn decoy_wrapper_survives_while_its_input_does_not() {
        let page = TestHelper::form_controls_page();
        let clickable = TestHelper::find(&page, &[CapabilityTag::Clickable]).await.unwrap();
        let ids = TestHelper::ids(&page, &clickable);
        assert!(ids.contains(&"terms".to_string()));
        assert!(!ids.contains(&"terms-input".to_string()));
    }

    #[tokio::test]
    async fn radio_label_replaces_its_input() {
        let page = TestHelper::form_controls_page();
        let clickable = TestHelper::find(&page, &[CapabilityTag::Clickable]).await.unwrap();
        let ids = TestHelper::ids(&page, &clickable);
        assert!(ids.contains(&"plan-monthly".to_string()));
        assert!(!ids.contains(&"plan-monthly-input".to_string()));
    }

    #[tokio::test]
    async fn modal_hides_covered_elements_except_tooltips() {
        let page = TestHelper::modal_page();
        let clickable = TestHelper::find(&page, &[CapabilityTag::Clickable]).await.unwrap();
        let mut ids = TestHelper::ids(&page, &clickable);
        ids.sort();
        assert_eq!(ids, vec!["close", "tip"]);
    }

    #[tokio::test]
    async fn descriptors_resolve_after_detaching() {
        let page = TestHelper::newsletter_page();
        let found = TestHelper::find(&page, &CapabilityTag::ALL).await.unwrap();
        assert!(!found.is_empty());
        for descriptor in &found {
            let live = descriptor.element().unwrap();
            let json = serde_json::to_string(descriptor).unwrap();
            let restored: ElementDescriptor = serde_json::from_str(&json).unwrap();
            assert_eq!(resolve_descriptor(&page, &restored), Some(live));
        }
    }

    #[tokio::test]
    async fn snapshot_pages_classify_like_the_original() {
        let page = TestHelper::newsletter_page();
        let restored = Page::from_snapshot(&page.to_snapshot_json().unwrap()).unwrap();

        let before = TestHelper::find(&page, &CapabilityTag::ALL).await.unwrap();
        let after = TestHelper::find(&restored, &CapabilityTag::ALL).await.unwrap();
        let selectors = |d: &[ElementDescriptor]| d.iter().map(|x| x.primary_selector.clone()).collect::<Vec<_>>();
        assert_eq!(selectors(&before), selectors(&after));
    }

    #[test]
    fn report_stats_count_each_class() {
        let page = TestHelper::newsletter_page();
        let report = tokio_test::block_on(Highlighter::default().generate_report(&page)).unwrap();
        let stats = TestHelper::report_stats(&report);
        assert_eq!(stats.fillable, 1);
        assert_eq!(stats.clickable, 2);
        assert_eq!(stats.in_iframes, 0);
    }
}
