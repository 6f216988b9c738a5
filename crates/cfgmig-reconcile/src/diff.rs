//! Net name changes between a baseline and a working list

use cfgmig_model::Element;
use serde::Serialize;
use std::collections::BTreeSet;

/// Names added to and removed from a group
///
/// Computed by set difference over element names, so it says nothing about
/// order or payloads. Sets are sorted for deterministic reporting.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DiffResult {
    /// Names in the target but not in the baseline
    pub added: BTreeSet<String>,

    /// Names in the baseline but not in the target
    pub removed: BTreeSet<String>,
}

impl DiffResult {
    /// Diff a target list against its baseline
    #[must_use]
    pub fn compute(source: &[Element], target: &[Element]) -> Self {
        let source_names: BTreeSet<&str> = source.iter().map(Element::name).collect();
        let target_names: BTreeSet<&str> = target.iter().map(Element::name).collect();

        Self {
            added: target_names
                .difference(&source_names)
                .map(|name| (*name).to_string())
                .collect(),
            removed: source_names
                .difference(&target_names)
                .map(|name| (*name).to_string())
                .collect(),
        }
    }

    /// Check if nothing was added or removed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Fold another diff into this one (set union)
    pub fn merge(&mut self, other: &Self) {
        self.added.extend(other.added.iter().cloned());
        self.removed.extend(other.removed.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(names: &[&str]) -> Vec<Element> {
        names.iter().map(|n| Element::bare(*n)).collect()
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn identical_lists_have_empty_diff() {
        let source = list(&["PING", "MERGE3"]);
        assert!(DiffResult::compute(&source, &source.clone()).is_empty());
    }

    #[test]
    fn reordering_alone_is_not_a_change() {
        let diff = DiffResult::compute(&list(&["A", "B"]), &list(&["B", "A"]));
        assert!(diff.is_empty());
    }

    #[test]
    fn duplicate_names_collapse() {
        let diff = DiffResult::compute(&list(&["A"]), &list(&["A", "A"]));
        assert!(diff.is_empty());
    }

    #[test]
    fn added_and_removed() {
        let diff = DiffResult::compute(
            &list(&["PING", "MERGE3", "FD_SOCK"]),
            &list(&["PING", "MERGE2", "VERIFY_SUSPECT"]),
        );
        assert_eq!(diff.added, set(&["MERGE2", "VERIFY_SUSPECT"]));
        assert_eq!(diff.removed, set(&["FD_SOCK", "MERGE3"]));
    }

    #[test]
    fn merge_is_union() {
        let mut total = DiffResult {
            added: set(&["A"]),
            removed: set(&["X"]),
        };
        total.merge(&DiffResult {
            added: set(&["A", "B"]),
            removed: set(&["Y"]),
        });
        assert_eq!(total.added, set(&["A", "B"]));
        assert_eq!(total.removed, set(&["X", "Y"]));
    }
}
