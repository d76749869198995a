//! Inserts server-provided sections into the content container.

use crate::client::{ContentSource, SectionRecord};
use crate::config::SiteConfig;
use crate::document::{with_document, SharedDocument};
use crate::error::ApplyError;
use crate::readiness::PageSignals;
use crate::sections::{append_section, find_container};
use crate::slug::PageSlug;
use alliance_dom::{parse_fragment, Document, VNode};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    AlreadyLoaded,
    FetchFailed,
    Skipped(ApplyError),
    Loaded { inserted: usize, skipped: usize },
}

pub struct DynamicSectionLoader {
    page: PageSlug,
    client: Arc<dyn ContentSource>,
    document: SharedDocument,
    signals: PageSignals,
    config: Arc<SiteConfig>,
    initialized: AtomicBool,
}

impl DynamicSectionLoader {
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

    /// Fetch and insert the page's sections, then fire `sections_loaded`.
    ///
    /// The signal fires on every path, failures included.
    #[instrument(skip(self), fields(page = %self.page))]
    pub async fn load(&self) -> LoadOutcome {
        if self.initialized.swap(true, Ordering::SeqCst) {
            info!("Sections already loaded");
            return LoadOutcome::AlreadyLoaded;
        }

        self.signals.dom_ready.wait().await;

        let outcome = match self.client.fetch_sections(&self.page).await {
            Ok(records) => with_document(&self.document, |doc| self.insert(doc, &records)),
            Err(e) => {
                warn!(error = %e, "Could not fetch dynamic sections");
                LoadOutcome::FetchFailed
            }
        };

        self.signals.sections_loaded.mark_ready();
        outcome
    }

    fn insert(&self, document: &mut Document, records: &[SectionRecord]) -> LoadOutcome {
        if records.is_empty() {
            return LoadOutcome::Loaded {
                inserted: 0,
                skipped: 0,
            };
        }

        let attribute = self.config.section_attribute.as_str();
        let container_path = match find_container(document, &self.config.container_selector) {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "No container for dynamic sections");
                return LoadOutcome::Skipped(e);
            }
        };

        let mut existing: HashSet<String> = document
            .elements_with_attr(attribute)
            .iter()
            .filter_map(|path| document.node_at(path))
            .filter_map(|node| node.attr(attribute))
            .map(str::to_string)
            .collect();

        let Some(container) = document.node_at_mut(&container_path) else {
            return LoadOutcome::Skipped(ApplyError::ContainerNotFound(
                self.config.container_selector.clone(),
            ));
        };

        let (mut inserted, mut skipped) = (0, 0);
        for record in records {
            let id = record.section_id.trim();
            if id.is_empty() || existing.contains(id) {
                debug!(section = id, "Section already present");
                skipped += 1;
                continue;
            }

            match section_root(&record.html) {
                Ok(Some(section)) => {
                    append_section(container, attribute, id, section);
                    existing.insert(id.to_string());
                    inserted += 1;
                }
                Ok(None) => {
                    warn!(section = id, "Section markup has no element");
                    skipped += 1;
                }
                Err(e) => {
                    warn!(section = id, error = %e, "Section markup rejected");
                    skipped += 1;
                }
            }
        }

        info!(inserted, skipped, "Dynamic sections loaded");
        LoadOutcome::Loaded { inserted, skipped }
    }
}

/// First element of the fragment; surrounding text and comments are dropped
fn section_root(html: &str) -> Result<Option<VNode>, ApplyError> {
    Ok(parse_fragment(html)?
        .into_iter()
        .find(VNode::is_element))
}
