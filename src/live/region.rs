use crate::diagnostics::PassLog;
use crate::dom::{Document, NodeId, Selector};
use crate::frame::FrameResolver;
use crate::patch::{MorphStats, PatchOptions};
use crate::transport::Notification;

use super::context::PassContext;
use super::events::{UpdateEvent, UpdateOperation};
use super::page::Page;

pub const REGION_TAG: &str = "updates-for";

/// Written on a region while its patch is in progress.
pub const UPDATING_ATTRIBUTE: &str = "updating";

/// Region opt-in to ignore notifications caused by its own nested updates.
const IGNORE_INNER_UPDATES: &str = "ignore-inner-updates";
const PERFORMING_INNER_UPDATE: &str = "performing-inner-update";

/// `updates-for[identifier="…"]`, used for the live page and for fetched
/// responses alike.
pub fn region_selector(identifier: &str) -> Selector {
    Selector::tag(REGION_TAG).with_attr_eq("identifier", identifier)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionOutcome {
    Patched(MorphStats),
    /// The response held no fragment at this region's position.
    Aborted { found: usize },
    /// A `before-update` listener left the operation pointing at nodes that
    /// do not exist.
    Discarded,
}

/// A live region element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    element: NodeId,
}

impl Region {
    pub fn new(element: NodeId) -> Self {
        Self { element }
    }

    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn identifier<'d>(&self, document: &'d Document) -> Option<&'d str> {
        document.attr(self.element, "identifier")
    }

    /// The `url` attribute, else `location`.
    pub fn url(&self, document: &Document, location: &str) -> String {
        document
            .attr(self.element, "url")
            .unwrap_or(location)
            .to_string()
    }

    /// Set while the region is both opted in and mid self-triggered update.
    pub fn ignores_inner_updates(&self, document: &Document) -> bool {
        document.has_attr(self.element, IGNORE_INNER_UPDATES)
            && document.has_attr(self.element, PERFORMING_INNER_UPDATE)
    }

    /// False only when the region has an `only` list, the notification
    /// names its changes, and the two share no tag.
    pub fn has_changes_selected_for_update(&self, document: &Document, notification: &Notification) -> bool {
        let Some(only) = document.attr(self.element, "only") else {
            return true;
        };
        let Some(changed) = &notification.changed else {
            return true;
        };
        let mut allowed = only.split_whitespace().peekable();
        if allowed.peek().is_none() {
            return true;
        }
        allowed.any(|tag| changed.iter().any(|c| c == tag))
    }

    pub fn should_update(&self, document: &Document, notification: &Notification) -> bool {
        !self.ignores_inner_updates(document) && self.has_changes_selected_for_update(document, notification)
    }

    /// Patch this region from the pass's fetched document for `url`, taking
    /// the fragment at `index`.
    pub async fn process(&self, page: &Page, ctx: &PassContext, url: &str, index: usize) -> RegionOutcome {
        let identifier = {
            let mut document = page.document();
            document.set_attr(self.element, UPDATING_ATTRIBUTE, UPDATING_ATTRIBUTE);
            self.identifier(&document).unwrap_or_default().to_string()
        };

        let mut html = Document::parse(ctx.store.get(url).unwrap_or_default());
        FrameResolver::new(page.fetcher())
            .with_max_depth(page.settings().max_frame_depth)
            .resolve(&mut html)
            .await;

        let fragments = html.query_selector_all(html.root(), &region_selector(&identifier));
        let Some(&source) = fragments.get(index) else {
            page.log().aborted(ctx.pass, url, index, fragments.len());
            page.document().remove_attr(self.element, UPDATING_ATTRIBUTE);
            return RegionOutcome::Aborted {
                found: fragments.len(),
            };
        };

        let mut operation = UpdateOperation {
            element: self.element,
            html,
            source,
            permanent_attribute_name: page.settings().permanent_attribute.clone(),
            focus_selector: None,
        };

        let mut document = page.document();
        let listeners = page.listeners();
        listeners.dispatch(UpdateEvent::BeforeUpdate, &mut operation, &document);
        if !operation.html.contains(operation.source) || !document.contains(operation.element) {
            crate::log!("warn"; "before-update left `{}` with an unknown node, update discarded", identifier);
            document.remove_attr(self.element, UPDATING_ATTRIBUTE);
            return RegionOutcome::Discarded;
        }

        let log: &PassLog = page.log();
        log.morph_start(ctx.pass, self.element);
        let stats = page.patcher().patch(
            &mut document,
            operation.element,
            &operation.html,
            operation.source,
            &PatchOptions {
                children_only: true,
                permanent_attribute: &operation.permanent_attribute_name,
            },
        );
        document.remove_attr(self.element, UPDATING_ATTRIBUTE);
        listeners.dispatch(UpdateEvent::AfterUpdate, &mut operation, &document);
        ctx.restore_focus(&mut document, operation.focus_selector.as_deref());
        log.morph_end(ctx.pass, self.element, stats);

        RegionOutcome::Patched(stats)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::diagnostics::{PassEvent, PassId};
    use crate::testing::MockFetcher;

    fn region_in(doc: &Document) -> Region {
        Region::new(doc.query_selector(doc.root(), &Selector::tag(REGION_TAG)).unwrap())
    }

    #[test]
    fn test_url_defaults_to_location() {
        let doc = Document::parse(r#"<updates-for identifier="a"></updates-for>"#);
        assert_eq!(region_in(&doc).url(&doc, "http://x.test/page"), "http://x.test/page");

        let doc = Document::parse(r#"<updates-for identifier="a" url="/other"></updates-for>"#);
        assert_eq!(region_in(&doc).url(&doc, "http://x.test/page"), "/other");
    }

    #[test]
    fn test_only_filter() {
        let doc = Document::parse(r#"<updates-for identifier="a" only="title author"></updates-for>"#);
        let region = region_in(&doc);

        assert!(region.should_update(&doc, &Notification::new("a").with_changed(["author"])));
        assert!(!region.should_update(&doc, &Notification::new("a").with_changed(["body"])));
        assert!(!region.should_update(&doc, &Notification::new("a").with_changed(Vec::<String>::new())));
        assert!(region.should_update(&doc, &Notification::new("a")));
    }

    #[test]
    fn test_without_only_never_excluded() {
        let doc = Document::parse(r#"<updates-for identifier="a"></updates-for>"#);
        let region = region_in(&doc);
        assert!(region.should_update(&doc, &Notification::new("a").with_changed(["anything"])));

        let doc = Document::parse(r#"<updates-for identifier="a" only=""></updates-for>"#);
        let region = region_in(&doc);
        assert!(region.should_update(&doc, &Notification::new("a").with_changed(["anything"])));
    }

    #[test]
    fn test_inner_update_suppression_needs_both_flags() {
        let doc = Document::parse(
            r#"<updates-for identifier="a" ignore-inner-updates performing-inner-update></updates-for>"#,
        );
        assert!(!region_in(&doc).should_update(&doc, &Notification::new("a")));

        let doc = Document::parse(r#"<updates-for identifier="a" performing-inner-update></updates-for>"#);
        assert!(region_in(&doc).should_update(&doc, &Notification::new("a")));

        let doc = Document::parse(r#"<updates-for identifier="a" ignore-inner-updates></updates-for>"#);
        assert!(region_in(&doc).should_update(&doc, &Notification::new("a")));
    }

    async fn page_with(live: &str, url: &str, body: &str) -> (Page, PassContext) {
        let fetcher = MockFetcher::new().route(url, body);
        let mut ctx = PassContext::new(PassId::next(), None);
        ctx.store.fetch_all(&fetcher, &[url]).await;
        let page = Page::new(Document::parse(live), "/", Arc::new(fetcher)).with_log(PassLog::recording());
        (page, ctx)
    }

    #[tokio::test]
    async fn test_process_patches_children_and_clears_marker() {
        let (page, ctx) = page_with(
            r#"<main><updates-for identifier="a" url="/x"><p>old</p></updates-for></main>"#,
            "/x",
            r#"<html><body><updates-for identifier="a"><p>new</p></updates-for></body></html>"#,
        )
        .await;
        let region = region_in(&page.document());

        let outcome = region.process(&page, &ctx, "/x", 0).await;

        assert!(matches!(outcome, RegionOutcome::Patched(_)));
        let document = page.document();
        assert_eq!(document.inner_html(region.element()), "<p>new</p>");
        assert!(!document.has_attr(region.element(), UPDATING_ATTRIBUTE));
        assert_eq!(document.attr(region.element(), "url"), Some("/x"));
    }

    #[tokio::test]
    async fn test_process_aborts_on_missing_fragment() {
        let (page, ctx) = page_with(
            r#"<updates-for identifier="a" url="/x"><p>old</p></updates-for>"#,
            "/x",
            r#"<updates-for identifier="a"><p>only one</p></updates-for>"#,
        )
        .await;
        let region = region_in(&page.document());

        let outcome = region.process(&page, &ctx, "/x", 1).await;

        assert_eq!(outcome, RegionOutcome::Aborted { found: 1 });
        assert_eq!(page.document().inner_html(region.element()), "<p>old</p>");
        assert!(page.log().entries().iter().any(|e| matches!(
            &e.event,
            PassEvent::Aborted { url, index: 1, found: 1 } if url == "/x"
        )));
    }

    #[tokio::test]
    async fn test_process_without_response_aborts() {
        let (page, ctx) = page_with(
            r#"<updates-for identifier="a" url="/down"><p>old</p></updates-for>"#,
            "/elsewhere",
            "",
        )
        .await;
        let region = region_in(&page.document());

        let outcome = region.process(&page, &ctx, "/down", 0).await;

        assert_eq!(outcome, RegionOutcome::Aborted { found: 0 });
    }

    #[tokio::test]
    async fn test_replaced_html_without_source_is_discarded() {
        let (page, ctx) = page_with(
            r#"<updates-for identifier="a" url="/x"><p>old</p></updates-for>"#,
            "/x",
            r#"<div><section><updates-for identifier="a"><p>new</p></updates-for></section></div>"#,
        )
        .await;
        page.on_update(Box::new(|event, op, _| {
            if event == UpdateEvent::BeforeUpdate {
                op.html = Document::parse("<p>tiny</p>");
            }
        }));
        let region = region_in(&page.document());

        let outcome = region.process(&page, &ctx, "/x", 0).await;

        assert_eq!(outcome, RegionOutcome::Discarded);
        let document = page.document();
        assert_eq!(document.inner_html(region.element()), "<p>old</p>");
        assert!(!document.has_attr(region.element(), UPDATING_ATTRIBUTE));
    }

    #[tokio::test]
    async fn test_before_update_listener_sets_focus_target() {
        let (page, ctx) = page_with(
            r#"<updates-for identifier="a" url="/x"><input id="name"/></updates-for>"#,
            "/x",
            r#"<updates-for identifier="a"><input id="name"/><input id="email"/></updates-for>"#,
        )
        .await;
        page.on_update(Box::new(|event, op, _| {
            if event == UpdateEvent::BeforeUpdate {
                op.focus_selector = Some("#email".to_string());
            }
        }));
        let region = region_in(&page.document());

        region.process(&page, &ctx, "/x", 0).await;

        let document = page.document();
        let focused = document.active_element().unwrap();
        assert_eq!(document.attr(focused, "id"), Some("email"));
    }
}
