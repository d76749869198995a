//! Thin DOM adapter for section ordering and insertion.
//!
//! Sections are the direct children of the content container that carry the
//! section attribute. Everything else under the container is left in place.

use crate::error::ApplyError;
use crate::ordering::SectionId;
use alliance_dom::{Document, NodePath, VNode};
use std::collections::{HashMap, HashSet};

/// Path of the content container, or `ContainerNotFound`
pub fn find_container(document: &Document, selector: &str) -> Result<NodePath, ApplyError> {
    document
        .query_selector(selector)?
        .ok_or_else(|| ApplyError::ContainerNotFound(selector.to_string()))
}

/// Ids of the tagged children of `container`, in sibling order
pub fn section_ids(container: &VNode, attribute: &str) -> Vec<SectionId> {
    container
        .children()
        .iter()
        .filter_map(|child| child.attr(attribute))
        .map(str::to_string)
        .collect()
}

/// First id that occurs twice
pub fn find_duplicate(ids: &[SectionId]) -> Option<&SectionId> {
    let mut seen = HashSet::new();
    ids.iter().find(|id| !seen.insert(id.as_str()))
}

/// Whether any tagged section exists anywhere in the document
pub fn has_sections(document: &Document, attribute: &str) -> bool {
    !document.elements_with_attr(attribute).is_empty()
}

/// Rearrange the tagged children of `container` into `order`.
///
/// `order` must be a permutation of the current section ids; untagged
/// children keep their indices. Nothing is changed on error.
pub fn reorder_sections(
    container: &mut VNode,
    attribute: &str,
    order: &[SectionId],
) -> Result<(), ApplyError> {
    let current = section_ids(container, attribute);
    if let Some(duplicate) = find_duplicate(&current) {
        return Err(ApplyError::DuplicateSection(duplicate.clone()));
    }
    let mut expected: Vec<&SectionId> = current.iter().collect();
    let mut requested: Vec<&SectionId> = order.iter().collect();
    expected.sort();
    requested.sort();
    if expected != requested {
        return Err(ApplyError::InvalidOrder);
    }

    let Some(children) = container.children_mut() else {
        return Err(ApplyError::InvalidOrder);
    };

    // `None` marks a slot that belongs to some section
    let mut pool: HashMap<SectionId, VNode> = HashMap::with_capacity(order.len());
    let mut layout: Vec<Option<VNode>> = Vec::with_capacity(children.len());
    for child in std::mem::take(children) {
        match child.attr(attribute).map(str::to_string) {
            Some(id) => {
                pool.insert(id, child);
                layout.push(None);
            }
            None => layout.push(Some(child)),
        }
    }

    let mut next = order.iter().filter_map(|id| pool.remove(id));
    for slot in layout {
        match slot {
            Some(fixed) => children.push(fixed),
            None => children.extend(next.next()),
        }
    }

    Ok(())
}

/// Append `section` to `container`, tagging it with `id`
pub fn append_section(container: &mut VNode, attribute: &str, id: &str, mut section: VNode) {
    section.set_attr(attribute, id);
    if let Some(children) = container.children_mut() {
        children.push(section);
    }
}
