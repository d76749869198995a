//! Wiring for one page load: document, signals, loader and appliers.

use crate::client::{ContentSource, HttpContentClient};
use crate::config::SiteConfig;
use crate::document::{shared, with_document, SharedDocument};
use crate::error::ClientError;
use crate::loader::{DynamicSectionLoader, LoadOutcome};
use crate::order_applier::{OrderOutcome, SectionOrderApplier};
use crate::override_applier::{ContentOverrideApplier, OverrideOutcome};
use crate::readiness::PageSignals;
use crate::slug::PageSlug;
use alliance_dom::{parse_document, to_html, Document, ParseError};
use std::sync::Arc;
use tracing::info;

/// Builds a [`PageSession`] per page load against one content source
#[derive(Clone)]
pub struct PageBootstrap {
    config: Arc<SiteConfig>,
    client: Arc<dyn ContentSource>,
}

impl PageBootstrap {
    pub fn new(config: SiteConfig, client: Arc<dyn ContentSource>) -> Self {
        Self {
            config: Arc::new(config),
            client,
        }
    }

    /// Bootstrap against the HTTP content API named in `config`
    pub fn from_config(config: SiteConfig) -> Result<Self, ClientError> {
        let client = HttpContentClient::from_config(&config)?;
        Ok(Self::new(config, Arc::new(client)))
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn session(&self, document: Document, path: &str) -> PageSession {
        let page = PageSlug::for_document(&document, path);
        let document = shared(document);
        let signals = PageSignals::new();

        let loader = DynamicSectionLoader::new(
            page.clone(),
            Arc::clone(&self.client),
            document.clone(),
            signals.clone(),
            Arc::clone(&self.config),
        );
        let order = SectionOrderApplier::new(
            page.clone(),
            Arc::clone(&self.client),
            document.clone(),
            self.config.pinned_for(&page),
            signals.clone(),
            Arc::clone(&self.config),
        )
        .after_loader();
        let overrides = ContentOverrideApplier::new(
            page.clone(),
            Arc::clone(&self.client),
            document.clone(),
            signals.clone(),
            Arc::clone(&self.config),
        );

        PageSession {
            page,
            document,
            signals,
            loader,
            order,
            overrides,
        }
    }

    /// Parse, enhance and re-serialize a page.
    ///
    /// Content failures never surface here; only unparseable input does.
    pub async fn enhance_html(&self, html: &str, path: &str) -> Result<String, ParseError> {
        let session = self.session(parse_document(html)?, path);
        session.run().await;
        Ok(session.to_html())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageReport {
    pub page: PageSlug,
    pub sections: LoadOutcome,
    pub order: OrderOutcome,
    pub overrides: OverrideOutcome,
}

pub struct PageSession {
    page: PageSlug,
    document: SharedDocument,
    signals: PageSignals,
    loader: DynamicSectionLoader,
    order: SectionOrderApplier,
    overrides: ContentOverrideApplier,
}

impl PageSession {
    pub fn page(&self) -> &PageSlug {
        &self.page
    }

    /// Mark the document ready and run the loader and both appliers together
    pub async fn run(&self) -> PageReport {
        self.signals.dom_ready.mark_ready();

        let (sections, order, overrides) = tokio::join!(
            self.loader.load(),
            self.order.initialize(),
            self.overrides.initialize()
        );

        info!(page = %self.page, "Page enhanced");
        PageReport {
            page: self.page.clone(),
            sections,
            order,
            overrides,
        }
    }

    pub fn to_html(&self) -> String {
        with_document(&self.document, |doc| to_html(doc))
    }
}
