//! Applies the persisted section order for one page load.

use crate::client::ContentSource;
use crate::config::SiteConfig;
use crate::document::{with_document, SharedDocument};
use crate::error::ApplyError;
use crate::ordering::{plan_order, OrderPlan, SectionId};
use crate::readiness::PageSignals;
use crate::sections::{find_container, find_duplicate, has_sections, reorder_sections, section_ids};
use crate::slug::PageSlug;
use alliance_dom::Document;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum OrderOutcome {
    /// `initialize` already ran for this page load
    AlreadyInitialized,
    FetchFailed,
    /// No order is stored for the page
    NoConfiguredOrder,
    /// The document could not be ordered (no container, duplicate ids)
    Skipped(ApplyError),
    Applied(OrderPlan),
}

pub struct SectionOrderApplier {
    page: PageSlug,
    client: Arc<dyn ContentSource>,
    document: SharedDocument,
    pinned: HashSet<SectionId>,
    signals: PageSignals,
    config: Arc<SiteConfig>,
    /// A loader will fire `sections_loaded` for this page load
    loader_attached: bool,
    initialized: AtomicBool,
}

impl SectionOrderApplier {
    pub fn new(
        page: PageSlug,
        client: Arc<dyn ContentSource>,
        document: SharedDocument,
        pinned: HashSet<SectionId>,
        signals: PageSignals,
        config: Arc<SiteConfig>,
    ) -> Self {
        Self {
            page,
            client,
            document,
            pinned,
            signals,
            config,
            loader_attached: false,
            initialized: AtomicBool::new(false),
        }
    }

    /// Order only after the dynamic section loader has finished inserting
    pub fn after_loader(mut self) -> Self {
        self.loader_attached = true;
        self
    }

    /// Wait for the page, fetch its stored order and apply it.
    ///
    /// Runs once; every failure degrades to leaving the document as it is.
    #[instrument(skip(self), fields(page = %self.page))]
    pub async fn initialize(&self) -> OrderOutcome {
        if self.initialized.swap(true, Ordering::SeqCst) {
            info!("Section order already initialized");
            return OrderOutcome::AlreadyInitialized;
        }

        self.signals.dom_ready.wait().await;

        let wait_for_sections = self.loader_attached
            || !with_document(&self.document, |doc| {
                has_sections(doc, &self.config.section_attribute)
            });
        if wait_for_sections
            && !self
                .signals
                .sections_loaded
                .wait_timeout(self.config.sections_timeout())
                .await
        {
            debug!(
                timeout_ms = self.config.sections_timeout_ms,
                "No sections signalled in time, ordering what is present"
            );
        }

        let desired = match self.client.fetch_section_order(&self.page).await {
            Ok(order) => order,
            Err(e) => {
                warn!(error = %e, "Could not fetch section order - leaving page order unchanged");
                return OrderOutcome::FetchFailed;
            }
        };

        if desired.is_empty() {
            debug!("No section order configured");
            return OrderOutcome::NoConfiguredOrder;
        }

        with_document(&self.document, |doc| self.apply(doc, &desired))
    }

    fn apply(&self, document: &mut Document, desired: &[SectionId]) -> OrderOutcome {
        let attribute = self.config.section_attribute.as_str();

        let container_path = match find_container(document, &self.config.container_selector) {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "Section container unavailable");
                return OrderOutcome::Skipped(e);
            }
        };
        let Some(container) = document.node_at_mut(&container_path) else {
            let e = ApplyError::ContainerNotFound(self.config.container_selector.clone());
            warn!(error = %e, "Section container unavailable");
            return OrderOutcome::Skipped(e);
        };

        let current = section_ids(container, attribute);
        if let Some(duplicate) = find_duplicate(&current) {
            let e = ApplyError::DuplicateSection(duplicate.clone());
            warn!(error = %e, "Refusing to reorder ambiguous sections");
            return OrderOutcome::Skipped(e);
        }

        let plan = plan_order(&current, desired, &self.pinned);
        for id in &plan.missing {
            warn!(section = %id, "Ordered section is not on the page");
        }

        if !plan.is_unchanged() {
            if let Err(e) = reorder_sections(container, attribute, &plan.order) {
                warn!(error = %e, "Section reorder rejected");
                return OrderOutcome::Skipped(e);
            }
        }

        info!(
            sections = current.len(),
            moved = plan.moved,
            missing = plan.missing.len(),
            "Section order applied"
        );
        OrderOutcome::Applied(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::StaticContentSource;
    use crate::document::shared;
    use alliance_dom::parse_document;
    use std::time::Duration;

    const PAGE: &str = r#"<main><section data-section-id="a"></section><section data-section-id="b"></section><section data-section-id="c"></section><section data-section-id="hero"></section></main>"#;

    fn applier(
        source: StaticContentSource,
        html: &str,
        pinned: &[&str],
    ) -> (SectionOrderApplier, SharedDocument, PageSignals) {
        let document = shared(parse_document(html).unwrap());
        let signals = PageSignals::new();
        let applier = SectionOrderApplier::new(
            PageSlug::new("index"),
            Arc::new(source),
            document.clone(),
            pinned.iter().map(|s| s.to_string()).collect(),
            signals.clone(),
            Arc::new(SiteConfig::default()),
        );
        (applier, document, signals)
    }

    fn order_of(document: &SharedDocument) -> Vec<SectionId> {
        with_document(document, |doc| {
            let main = doc.node_at(&doc.find_tag("main").unwrap()).unwrap();
            section_ids(main, "data-section-id")
        })
    }

    #[tokio::test]
    async fn test_pinned_hero_stays_last() {
        let source = StaticContentSource::new().with_section_order("index", &["hero", "b", "a", "c"]);
        let (applier, document, signals) = applier(source, PAGE, &["hero"]);
        signals.dom_ready.mark_ready();

        let outcome = applier.initialize().await;
        assert!(matches!(outcome, OrderOutcome::Applied(_)));
        assert_eq!(order_of(&document), vec!["b", "a", "c", "hero"]);
    }

    #[tokio::test]
    async fn test_second_initialize_is_a_no_op() {
        let source = StaticContentSource::new().with_section_order("index", &["c", "b", "a"]);
        let (applier, document, signals) = applier(source, PAGE, &[]);
        signals.dom_ready.mark_ready();

        applier.initialize().await;
        let after_first = order_of(&document);
        assert_eq!(applier.initialize().await, OrderOutcome::AlreadyInitialized);
        assert_eq!(order_of(&document), after_first);
    }

    #[tokio::test]
    async fn test_empty_order_leaves_document_alone() {
        let (applier, document, signals) = applier(StaticContentSource::new(), PAGE, &[]);
        signals.dom_ready.mark_ready();
        let before = with_document(&document, |doc| doc.clone());

        assert_eq!(applier.initialize().await, OrderOutcome::NoConfiguredOrder);
        assert_eq!(with_document(&document, |doc| doc.clone()), before);
    }

    #[tokio::test]
    async fn test_missing_container_is_skipped() {
        let source = StaticContentSource::new().with_section_order("index", &["a"]);
        let (applier, _, signals) = applier(source, r#"<div data-section-id="a"></div>"#, &[]);
        signals.dom_ready.mark_ready();

        assert_eq!(
            applier.initialize().await,
            OrderOutcome::Skipped(ApplyError::ContainerNotFound("main".to_string()))
        );
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_not_reordered() {
        let source = StaticContentSource::new().with_section_order("index", &["b", "a"]);
        let html = r#"<main><div data-section-id="a"></div><div data-section-id="b"></div><div data-section-id="a"></div></main>"#;
        let (applier, document, signals) = applier(source, html, &[]);
        signals.dom_ready.mark_ready();

        assert_eq!(
            applier.initialize().await,
            OrderOutcome::Skipped(ApplyError::DuplicateSection("a".to_string()))
        );
        assert_eq!(order_of(&document), vec!["a", "b", "a"]);
    }

    #[tokio::test]
    async fn test_waits_for_loaded_signal_when_page_has_no_sections() {
        let source = StaticContentSource::new().with_section_order("index", &["y", "x"]);
        let (applier, document, signals) = applier(source, "<main></main>", &[]);
        signals.dom_ready.mark_ready();

        let loader_document = document.clone();
        let loader_signals = signals.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            with_document(&loader_document, |doc| {
                let path = doc.find_tag("main").unwrap();
                let main = doc.node_at_mut(&path).unwrap();
                for id in ["x", "y"] {
                    crate::sections::append_section(main, "data-section-id", id, alliance_dom::VNode::element("section"));
                }
            });
            loader_signals.sections_loaded.mark_ready();
        });

        applier.initialize().await;
        assert_eq!(order_of(&document), vec!["y", "x"]);
    }

    #[tokio::test]
    async fn test_unsignalled_sections_do_not_block_ordering() {
        let document = shared(parse_document("<main></main>").unwrap());
        let signals = PageSignals::new();
        let config = SiteConfig {
            sections_timeout_ms: 20,
            ..SiteConfig::default()
        };
        let applier = SectionOrderApplier::new(
            PageSlug::new("index"),
            Arc::new(StaticContentSource::new().with_section_order("index", &["x"])),
            document.clone(),
            HashSet::new(),
            signals.clone(),
            Arc::new(config),
        );
        signals.dom_ready.mark_ready();

        let outcome = tokio::time::timeout(Duration::from_secs(1), applier.initialize())
            .await
            .unwrap();
        match outcome {
            OrderOutcome::Applied(plan) => assert_eq!(plan.missing, vec!["x".to_string()]),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(order_of(&document).is_empty());
    }
}
