//! The page document shared by the loader and both appliers.
//!
//! The lock is only ever held for a synchronous mutation pass, never across
//! an `.await`.

use alliance_dom::Document;
use std::sync::{Arc, Mutex, PoisonError};

pub type SharedDocument = Arc<Mutex<Document>>;

pub fn shared(document: Document) -> SharedDocument {
    Arc::new(Mutex::new(document))
}

/// Run `f` with exclusive access to the document.
///
/// A pass that panicked cannot leave the tree half-linked (every mutation
/// swaps whole child lists), so a poisoned lock is recovered.
pub fn with_document<R>(document: &SharedDocument, f: impl FnOnce(&mut Document) -> R) -> R {
    let mut guard = document.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alliance_dom::VNode;

    #[test]
    fn test_with_document_mutates_in_place() {
        let document = shared(Document::new());
        with_document(&document, |doc| doc.add_node(VNode::element("main")));
        let count = with_document(&document, |doc| doc.nodes.len());
        assert_eq!(count, 1);
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let document = shared(Document::new());
        let clone = Arc::clone(&document);
        let _ = std::thread::spawn(move || {
            with_document(&clone, |_| panic!("boom"));
        })
        .join();
        assert!(document.is_poisoned());
        assert!(with_document(&document, |doc| doc.nodes.is_empty()));
    }
}
