//! Group reconciliation
//!
//! Applies an [`OperationSequence`] to a working copy of each group and
//! diffs the result against the untouched baseline.

use crate::diff::DiffResult;
use crate::operation::{EditOperation, OperationSequence};
use cfgmig_model::{Element, GroupSnapshot, ResourceAddress, SubtreeSnapshot};

/// A group being edited
///
/// Holds the baseline and the working list as two independent vectors;
/// only the working list is ever mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingGroup {
    name: String,
    source: Vec<Element>,
    target: Vec<Element>,
}

impl WorkingGroup {
    /// Start editing from a snapshot
    #[must_use]
    pub fn from_snapshot(snapshot: &GroupSnapshot) -> Self {
        Self {
            name: snapshot.name().to_string(),
            source: snapshot.elements().to_vec(),
            target: snapshot.elements().to_vec(),
        }
    }

    /// Apply one operation to the working list
    #[inline]
    pub fn apply(&mut self, operation: &EditOperation) -> bool {
        operation.apply(&mut self.target)
    }

    /// Append an element with the empty payload
    #[inline]
    pub fn add(&mut self, name: &str) {
        self.apply(&EditOperation::add(name));
    }

    /// Rename every `old_name` to `new_name`, in place
    #[inline]
    pub fn replace(&mut self, old_name: &str, new_name: &str) -> bool {
        self.apply(&EditOperation::replace(old_name, new_name))
    }

    /// Remove the first `name`; returns whether anything was removed
    #[inline]
    pub fn remove(&mut self, name: &str) -> bool {
        self.apply(&EditOperation::remove(name))
    }

    /// Group name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Baseline elements
    #[inline]
    #[must_use]
    pub fn source(&self) -> &[Element] {
        &self.source
    }

    /// Working elements
    #[inline]
    #[must_use]
    pub fn target(&self) -> &[Element] {
        &self.target
    }

    /// Current diff against the baseline
    #[inline]
    #[must_use]
    pub fn diff(&self) -> DiffResult {
        DiffResult::compute(&self.source, &self.target)
    }

    /// Stop editing and freeze the result
    #[must_use]
    pub fn finish(self) -> ReconciledGroup {
        let diff = self.diff();
        ReconciledGroup {
            name: self.name,
            source: self.source,
            target: self.target,
            diff,
        }
    }
}

/// Final state of one reconciled group
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledGroup {
    name: String,
    source: Vec<Element>,
    target: Vec<Element>,
    diff: DiffResult,
}

impl ReconciledGroup {
    /// Group name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Baseline elements, in original order
    #[inline]
    #[must_use]
    pub fn source(&self) -> &[Element] {
        &self.source
    }

    /// Final elements, in target order
    #[inline]
    #[must_use]
    pub fn target(&self) -> &[Element] {
        &self.target
    }

    /// Final element names, in target order
    #[inline]
    pub fn target_names(&self) -> impl Iterator<Item = &str> {
        self.target.iter().map(Element::name)
    }

    /// Names added and removed
    #[inline]
    #[must_use]
    pub fn diff(&self) -> &DiffResult {
        &self.diff
    }

    /// Check if the group needs to be rewritten
    #[inline]
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.diff.is_empty()
    }
}

/// Applies one operation sequence to every group
///
/// # Characteristics
/// - Sequential (later operations see earlier results)
/// - Groups are independent of each other
/// - Deterministic
#[derive(Debug, Clone, Default)]
pub struct GroupReconciler {
    operations: OperationSequence,
}

impl GroupReconciler {
    /// Create reconciler for an operation sequence
    #[inline]
    #[must_use]
    pub fn new(operations: OperationSequence) -> Self {
        Self { operations }
    }

    /// Operations applied to each group
    #[inline]
    #[must_use]
    pub fn operations(&self) -> &OperationSequence {
        &self.operations
    }

    /// Reconcile a single group
    #[must_use]
    pub fn reconcile(&self, snapshot: &GroupSnapshot) -> ReconciledGroup {
        let mut group = WorkingGroup::from_snapshot(snapshot);
        self.operations.apply_all(&mut group.target);
        let reconciled = group.finish();

        tracing::debug!(
            group = reconciled.name(),
            added = ?reconciled.diff.added,
            removed = ?reconciled.diff.removed,
            "reconciled group"
        );
        reconciled
    }

    /// Reconcile every group of a subtree, in enumeration order
    #[must_use]
    pub fn reconcile_subtree(&self, snapshot: &SubtreeSnapshot) -> Reconciliation {
        Reconciliation {
            subtree: snapshot.address().clone(),
            groups: snapshot.groups().map(|group| self.reconcile(group)).collect(),
        }
    }
}

/// Reconciliation of a whole subtree
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    subtree: ResourceAddress,
    groups: Vec<ReconciledGroup>,
}

impl Reconciliation {
    /// Assemble a reconciliation from already reconciled groups
    #[inline]
    #[must_use]
    pub fn new(subtree: ResourceAddress, groups: Vec<ReconciledGroup>) -> Self {
        Self { subtree, groups }
    }

    /// Subtree address
    #[inline]
    #[must_use]
    pub fn subtree(&self) -> &ResourceAddress {
        &self.subtree
    }

    /// All groups, in enumeration order
    #[inline]
    #[must_use]
    pub fn groups(&self) -> &[ReconciledGroup] {
        &self.groups
    }

    /// Groups with a non-empty diff, in enumeration order
    #[inline]
    pub fn changed_groups(&self) -> impl Iterator<Item = &ReconciledGroup> {
        self.groups.iter().filter(|group| group.has_changes())
    }

    /// Check if no group changed
    #[inline]
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.groups.iter().all(|group| !group.has_changes())
    }

    /// Union of every group's diff
    #[must_use]
    pub fn total_diff(&self) -> DiffResult {
        let mut total = DiffResult::default();
        for group in self.changed_groups() {
            total.merge(group.diff());
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgmig_model::Payload;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn snapshot(name: &str, names: &[&str]) -> GroupSnapshot {
        GroupSnapshot::new(name, names.iter().map(|n| Element::bare(*n)).collect())
    }

    fn scenario() -> OperationSequence {
        OperationSequence::new()
            .replace("MERGE3", "MERGE2")
            .add("VERIFY_SUSPECT")
            .remove("FD_SOCK")
    }

    #[test]
    fn working_group_mutates_only_target() {
        let mut group = WorkingGroup::from_snapshot(&snapshot("tcp", &["PING", "FD_SOCK"]));
        assert!(group.remove("FD_SOCK"));
        assert!(!group.remove("FD_SOCK"));
        group.add("MPING");
        assert!(group.replace("PING", "TCPPING"));

        let source: Vec<_> = group.source().iter().map(Element::name).collect();
        let target: Vec<_> = group.target().iter().map(Element::name).collect();
        assert_eq!(source, vec!["PING", "FD_SOCK"]);
        assert_eq!(target, vec!["TCPPING", "MPING"]);
    }

    #[test]
    fn no_operations_means_empty_diff() {
        let reconciler = GroupReconciler::default();
        let group = reconciler.reconcile(&snapshot("tcp", &["PING", "MERGE3"]));
        assert!(!group.has_changes());
        assert_eq!(group.target(), group.source());
    }

    #[test]
    fn protocol_stack_scenario() {
        let reconciler = GroupReconciler::new(scenario());
        let group = reconciler.reconcile(&snapshot("tcp", &["PING", "MERGE3", "FD_SOCK"]));

        assert_eq!(
            group.target_names().collect::<Vec<_>>(),
            vec!["PING", "MERGE2", "VERIFY_SUSPECT"]
        );
        assert_eq!(
            group.diff().added.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["MERGE2", "VERIFY_SUSPECT"]
        );
        assert_eq!(
            group.diff().removed.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["FD_SOCK", "MERGE3"]
        );
    }

    #[test]
    fn add_then_remove_cancels_out() {
        let reconciler = GroupReconciler::new(OperationSequence::new().add("X").remove("X"));
        let group = reconciler.reconcile(&snapshot("udp", &["PING", "UNICAST3"]));
        assert!(!group.has_changes());
    }

    #[test]
    fn untouched_elements_keep_payload() {
        let ping = Element::new("PING", Payload::new(json!({"timeout": 3000})));
        let reconciler = GroupReconciler::new(OperationSequence::new().add("MPING"));
        let group = reconciler.reconcile(&GroupSnapshot::new("tcp", vec![ping.clone()]));

        assert_eq!(group.target()[0], ping);
        assert!(group.target()[1].payload().is_empty());
    }

    #[test]
    fn subtree_reconciliation_tracks_changed_groups() {
        let subtree = SubtreeSnapshot::from_groups(
            ResourceAddress::single("subsystem", "jgroups"),
            vec![
                ("udp".to_string(), vec![Element::bare("PING")]),
                ("tcp".to_string(), vec![Element::bare("MERGE3")]),
            ],
        )
        .unwrap();

        let reconciliation = GroupReconciler::new(scenario()).reconcile_subtree(&subtree);

        // udp still gains VERIFY_SUSPECT, tcp also swaps MERGE3
        assert_eq!(reconciliation.groups().len(), 2);
        assert!(!reconciliation.is_unchanged());

        let total = reconciliation.total_diff();
        assert!(total.added.contains("MERGE2"));
        assert!(total.added.contains("VERIFY_SUSPECT"));
        assert!(total.removed.contains("MERGE3"));
    }

    #[test]
    fn subtree_with_only_unchanged_groups() {
        let subtree = SubtreeSnapshot::from_groups(
            ResourceAddress::root(),
            vec![("tcp".to_string(), vec![Element::bare("PING")])],
        )
        .unwrap();

        let reconciliation =
            GroupReconciler::new(OperationSequence::new().remove("FD_SOCK")).reconcile_subtree(&subtree);
        assert!(reconciliation.is_unchanged());
        assert_eq!(reconciliation.changed_groups().count(), 0);
        assert!(reconciliation.total_diff().is_empty());
    }
}
