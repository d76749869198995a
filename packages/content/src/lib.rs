//! # Alliance Content
//!
//! Per-page enhancement of server-rendered pages: admin-authored content
//! overrides, persisted section order and dynamically served sections.
//!
//! ```text
//!                      ┌── DynamicSectionLoader ──┐ sections_loaded
//! PageSession::run ────┼── SectionOrderApplier ◀──┤
//!   (dom_ready)        └── ContentOverrideApplier ◀┘
//!                                 │
//!                    ContentSource (HTTP / static)
//! ```
//!
//! Every failure degrades to leaving the page as served.

pub mod client;
pub mod config;
pub mod descriptor;
pub mod document;
pub mod error;
pub mod loader;
pub mod order_applier;
pub mod ordering;
pub mod override_applier;
pub mod overrides;
pub mod page;
pub mod readiness;
pub mod sections;
pub mod slug;

pub use client::{ContentSource, HttpContentClient, SectionRecord, StaticContentSource};
pub use config::{SiteConfig, API_URL_ENV, DEFAULT_CONFIG_NAME};
pub use descriptor::{CallToAction, Override, OverrideContent, WireOverride};
pub use document::{shared, with_document, SharedDocument};
pub use error::{ApplyError, ClientError, ConfigError, DescriptorError};
pub use loader::{DynamicSectionLoader, LoadOutcome};
pub use order_applier::{OrderOutcome, SectionOrderApplier};
pub use ordering::{plan_order, OrderPlan, SectionId};
pub use override_applier::{ContentOverrideApplier, OverrideOutcome};
pub use overrides::{apply_override, apply_overrides, ApplyReport, OverrideSummary};
pub use page::{PageBootstrap, PageReport, PageSession};
pub use readiness::{PageSignals, ReadySignal};
pub use slug::PageSlug;
