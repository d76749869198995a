//! Applies the page's content overrides for one page load.

use crate::client::ContentSource;
use crate::config::SiteConfig;
use crate::descriptor::Override;
use crate::document::{with_document, SharedDocument};
use crate::overrides::{apply_overrides, OverrideSummary};
use crate::readiness::PageSignals;
use crate::slug::PageSlug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideOutcome {
    AlreadyInitialized,
    FetchFailed,
    /// Nothing usable was served for the page
    NothingToApply { rejected: usize },
    Applied {
        summary: OverrideSummary,
        /// Descriptors dropped before application (unknown type, missing field)
        rejected: usize,
    },
}

pub struct ContentOverrideApplier {
    page: PageSlug,
    client: Arc<dyn ContentSource>,
    document: SharedDocument,
    signals: PageSignals,
    config: Arc<SiteConfig>,
    initialized: AtomicBool,
}

impl ContentOverrideApplier {
    pub fn new(
        page: PageSlug,
        client: Arc<dyn ContentSource>,
        document: SharedDocument,
        signals: PageSignals,
        config: Arc<SiteConfig>,
    ) -> Self {
        Self {
            page,
            client,
            document,
            signals,
            config,
            initialized: AtomicBool::new(false),
        }
    }

    #[instrument(skip(self), fields(page = %self.page))]
    pub async fn initialize(&self) -> OverrideOutcome {
        if self.initialized.swap(true, Ordering::SeqCst) {
            info!("Content overrides already initialized");
            return OverrideOutcome::AlreadyInitialized;
        }

        self.signals.dom_ready.wait().await;

        // Dynamic sections can be override targets too
        if self.config.overrides_wait_for_sections
            && !self
                .signals
                .sections_loaded
                .wait_timeout(self.config.sections_timeout())
                .await
        {
            debug!("Sections not loaded in time, applying overrides to current content");
        }

        let records = match self.client.fetch_overrides(&self.page).await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Could not fetch content overrides - keeping static content");
                return OverrideOutcome::FetchFailed;
            }
        };

        let mut rejected = 0;
        let overrides: Vec<Override> = records
            .into_iter()
            .filter_map(|wire| match Override::try_from(wire) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed override");
                    rejected += 1;
                    None
                }
            })
            .collect();

        if overrides.is_empty() {
            debug!(rejected, "No content overrides to apply");
            return OverrideOutcome::NothingToApply { rejected };
        }

        let summary = with_document(&self.document, |doc| {
            apply_overrides(doc, &overrides, &self.config.managed_attribute)
        });

        info!(
            overrides = summary.overrides,
            applied = summary.applied,
            unmatched = summary.unmatched,
            failed = summary.failed,
            rejected,
            "Content overrides applied"
        );
        OverrideOutcome::Applied { summary, rejected }
    }
}
