//! Section ordering as a pure permutation.
//!
//! Pinned sections, and sections the persisted order does not mention, keep
//! their exact index. The slots held by the remaining listed sections are
//! refilled in list order. A pinned entry inside the list never moves; the
//! listed sections around it are ordered through the slots they already hold.

use std::collections::HashSet;

pub type SectionId = String;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderPlan {
    /// Section ids in their new sibling order (a permutation of the input)
    pub order: Vec<SectionId>,
    /// Listed ids with no live section, in list order
    pub missing: Vec<SectionId>,
    /// Number of positions whose section changed
    pub moved: usize,
}

impl OrderPlan {
    pub fn is_unchanged(&self) -> bool {
        self.moved == 0
    }
}

/// Compute the sibling order that brings `current` in line with `desired`
pub fn plan_order(
    current: &[SectionId],
    desired: &[SectionId],
    pinned: &HashSet<SectionId>,
) -> OrderPlan {
    let present: HashSet<&str> = current.iter().map(String::as_str).collect();

    let mut listed_once: HashSet<&str> = HashSet::new();
    let mut reorderable: Vec<&SectionId> = Vec::new();
    let mut missing = Vec::new();

    for id in desired {
        if !listed_once.insert(id.as_str()) {
            continue;
        }
        if !present.contains(id.as_str()) {
            missing.push(id.clone());
        } else if !pinned.contains(id) {
            reorderable.push(id);
        }
    }

    let movable: HashSet<&str> = reorderable.iter().map(|id| id.as_str()).collect();
    let mut fill = reorderable.into_iter();
    let mut claimed: HashSet<&str> = HashSet::new();

    let order: Vec<SectionId> = current
        .iter()
        .map(|id| {
            if movable.contains(id.as_str()) && claimed.insert(id.as_str()) {
                fill.next().unwrap_or(id).clone()
            } else {
                id.clone()
            }
        })
        .collect();

    let moved = order.iter().zip(current).filter(|(a, b)| a != b).count();

    OrderPlan {
        order,
        missing,
        moved,
    }
}
