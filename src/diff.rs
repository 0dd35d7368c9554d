//! Snapshot differ.
//!
//! Multiset difference over incident values: an incident present twice in
//! one snapshot must be matched twice before it counts as unchanged.

use std::collections::HashMap;

use crate::incident::{Incident, Snapshot};

/// Changes between two consecutive snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffResult {
    /// In the later snapshot but not the earlier one, in the later feed order.
    pub added: Vec<Incident>,
    /// In the earlier snapshot but not the later one, in the earlier feed order.
    pub removed: Vec<Incident>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

pub fn diff(previous: &Snapshot, current: &Snapshot) -> DiffResult {
    DiffResult {
        added: unmatched(current, previous),
        removed: unmatched(previous, current),
    }
}

/// Elements of `from` left over after pairing each with an equal element of `against`.
fn unmatched(from: &Snapshot, against: &Snapshot) -> Vec<Incident> {
    let mut remaining: HashMap<&Incident, usize> = HashMap::with_capacity(against.len());
    for incident in against {
        *remaining.entry(incident).or_insert(0) += 1;
    }

    from.iter()
        .filter(|incident| match remaining.get_mut(*incident) {
            Some(count) if *count > 0 => {
                *count -= 1;
                false
            }
            _ => true,
        })
        .cloned()
        .collect()
}
