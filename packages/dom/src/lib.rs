//! # Alliance DOM
//!
//! In-memory document model the page enhancers operate on.
//!
//! ```text
//! server-rendered HTML ──parse──▶ Document (VNode tree) ──serialize──▶ HTML
//!                                      ▲
//!                      Selector::select_all → NodePath
//! ```
//!
//! Nodes are addressed by [`NodePath`] (child indices from the roots), which
//! stays valid as long as no sibling list on the path is reordered.

pub mod error;
pub mod parser;
pub mod selector;
pub mod serializer;
pub mod vdom;

pub use error::{ParseError, ParseResult, SelectorError, SelectorResult};
pub use parser::{decode_entities, parse_document, parse_fragment};
pub use selector::Selector;
pub use serializer::{inner_html, node_to_html, to_html};
pub use vdom::{Attributes, Document, NodePath, VNode};

impl Document {
    /// Paths of all elements matching a CSS selector, in document order
    pub fn query_selector_all(&self, selector: &str) -> SelectorResult<Vec<NodePath>> {
        Ok(Selector::parse(selector)?.select_all(self))
    }

    pub fn query_selector(&self, selector: &str) -> SelectorResult<Option<NodePath>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }
}
