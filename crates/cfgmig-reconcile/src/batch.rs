//! Atomic batches of store commands
//!
//! Turns reconciled groups into one ordered [`Batch`] of delete/create
//! steps. Every changed group is torn down completely and rebuilt in
//! target order; this is what keeps the relative order of untouched
//! elements exact in stores that keep children in insertion order.

use crate::reconciler::{ReconciledGroup, Reconciliation};
use cfgmig_model::{Payload, ResourceAddress};
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// Kind of a [`BatchCommand`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Remove a resource
    Delete,
    /// Create a resource
    Create,
}

/// One low-level step of a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum BatchCommand {
    /// Remove the resource at `address`
    Delete {
        /// Resource to remove
        address: ResourceAddress,
    },

    /// Create a resource at `address` from `payload`
    Create {
        /// Resource to create
        address: ResourceAddress,
        /// Attributes of the new resource
        payload: Payload,
    },
}

impl BatchCommand {
    /// Create a delete step
    #[inline]
    #[must_use]
    pub fn delete(address: ResourceAddress) -> Self {
        Self::Delete { address }
    }

    /// Create a create step
    #[inline]
    #[must_use]
    pub fn create(address: ResourceAddress, payload: Payload) -> Self {
        Self::Create { address, payload }
    }

    /// Step kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Delete { .. } => CommandKind::Delete,
            Self::Create { .. } => CommandKind::Create,
        }
    }

    /// Target address
    #[inline]
    #[must_use]
    pub fn address(&self) -> &ResourceAddress {
        match self {
            Self::Delete { address } | Self::Create { address, .. } => address,
        }
    }

    /// Payload, for create steps
    #[inline]
    #[must_use]
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Self::Delete { .. } => None,
            Self::Create { payload, .. } => Some(payload),
        }
    }
}

impl Display for BatchCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete { address } => write!(f, "{address}:remove"),
            Self::Create { address, .. } => write!(f, "{address}:add"),
        }
    }
}

/// Ordered steps submitted as one atomic unit
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Batch {
    steps: Vec<BatchCommand>,
}

impl Batch {
    /// Build the batch for a whole reconciliation
    ///
    /// `address_of` maps `(group, element)` to the element's store address.
    #[must_use]
    pub fn from_reconciliation<F>(reconciliation: &Reconciliation, address_of: F) -> Self
    where
        F: FnMut(&str, &str) -> ResourceAddress,
    {
        let mut builder = BatchBuilder::new();
        builder.add_reconciliation(reconciliation, address_of);
        builder.build()
    }

    /// Steps in execution order
    #[inline]
    #[must_use]
    pub fn steps(&self) -> &[BatchCommand] {
        &self.steps
    }

    /// Iterate steps in execution order
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, BatchCommand> {
        self.steps.iter()
    }

    /// Consume into the steps
    #[inline]
    #[must_use]
    pub fn into_steps(self) -> Vec<BatchCommand> {
        self.steps
    }

    /// Number of steps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if batch has no steps
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a BatchCommand;
    type IntoIter = std::slice::Iter<'a, BatchCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

impl IntoIterator for Batch {
    type Item = BatchCommand;
    type IntoIter = std::vec::IntoIter<BatchCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}

/// Accumulates steps for a [`Batch`]
#[derive(Debug, Default)]
pub struct BatchBuilder {
    steps: Vec<BatchCommand>,
}

impl BatchBuilder {
    /// Create new builder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a single step
    #[inline]
    pub fn add_step(&mut self, step: BatchCommand) -> &mut Self {
        self.steps.push(step);
        self
    }

    /// Append the teardown and rebuild of one group
    ///
    /// Unchanged groups contribute nothing. Otherwise every baseline
    /// element is deleted, then every target element is created in target
    /// order. Returns the number of steps appended.
    pub fn add_group<F>(&mut self, group: &ReconciledGroup, mut address_of: F) -> usize
    where
        F: FnMut(&str, &str) -> ResourceAddress,
    {
        if !group.has_changes() {
            return 0;
        }

        let before = self.steps.len();
        for element in group.source() {
            self.steps
                .push(BatchCommand::delete(address_of(group.name(), element.name())));
        }
        for element in group.target() {
            self.steps.push(BatchCommand::create(
                address_of(group.name(), element.name()),
                element.payload().clone(),
            ));
        }
        self.steps.len() - before
    }

    /// Append every changed group of a reconciliation, in enumeration order
    pub fn add_reconciliation<F>(&mut self, reconciliation: &Reconciliation, mut address_of: F) -> usize
    where
        F: FnMut(&str, &str) -> ResourceAddress,
    {
        reconciliation
            .groups()
            .iter()
            .map(|group| self.add_group(group, &mut address_of))
            .sum()
    }

    /// Number of steps so far
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if no steps were added
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Finish the batch
    #[inline]
    #[must_use]
    pub fn build(self) -> Batch {
        Batch { steps: self.steps }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationSequence;
    use crate::reconciler::GroupReconciler;
    use cfgmig_model::{Element, GroupSnapshot, SubtreeSnapshot};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn jgroups() -> ResourceAddress {
        ResourceAddress::single("subsystem", "jgroups")
    }

    fn address_of(group: &str, element: &str) -> ResourceAddress {
        jgroups().append("stack", group).append("protocol", element)
    }

    fn rendered(batch: &Batch) -> Vec<String> {
        batch.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn scenario_batch_tears_down_then_rebuilds() {
        let reconciler = GroupReconciler::new(
            OperationSequence::new()
                .replace("MERGE3", "MERGE2")
                .add("VERIFY_SUSPECT")
                .remove("FD_SOCK"),
        );
        let group = reconciler.reconcile(&GroupSnapshot::new(
            "tcp",
            vec![Element::bare("PING"), Element::bare("MERGE3"), Element::bare("FD_SOCK")],
        ));

        let mut builder = BatchBuilder::new();
        assert_eq!(builder.add_group(&group, address_of), 6);
        let batch = builder.build();

        assert_eq!(
            rendered(&batch),
            vec![
                "/subsystem=jgroups/stack=tcp/protocol=PING:remove",
                "/subsystem=jgroups/stack=tcp/protocol=MERGE3:remove",
                "/subsystem=jgroups/stack=tcp/protocol=FD_SOCK:remove",
                "/subsystem=jgroups/stack=tcp/protocol=PING:add",
                "/subsystem=jgroups/stack=tcp/protocol=MERGE2:add",
                "/subsystem=jgroups/stack=tcp/protocol=VERIFY_SUSPECT:add",
            ]
        );
    }

    #[test]
    fn unchanged_group_emits_nothing() {
        let group = GroupReconciler::default()
            .reconcile(&GroupSnapshot::new("tcp", vec![Element::bare("PING")]));

        let mut builder = BatchBuilder::new();
        assert_eq!(builder.add_group(&group, address_of), 0);
        assert!(builder.build().is_empty());
    }

    #[test]
    fn create_carries_baseline_payload() {
        let ping = Element::new("PING", Payload::new(json!({"timeout": 3000})));
        let group = GroupReconciler::new(OperationSequence::new().add("MPING"))
            .reconcile(&GroupSnapshot::new("tcp", vec![ping]));

        let batch = Batch::from_reconciliation(
            &Reconciliation::new(jgroups(), vec![group]),
            address_of,
        );
        let creates: Vec<_> = batch
            .iter()
            .filter(|step| step.kind() == CommandKind::Create)
            .collect();
        assert_eq!(creates[0].payload().unwrap().get("/timeout"), Some(&json!(3000)));
        assert!(creates[1].payload().unwrap().is_empty());
    }

    #[test]
    fn only_changed_groups_across_subtree() {
        let subtree = SubtreeSnapshot::from_groups(
            jgroups(),
            vec![
                ("udp".to_string(), vec![Element::bare("PING"), Element::bare("MERGE2")]),
                ("tcp".to_string(), vec![Element::bare("PING"), Element::bare("MERGE3")]),
            ],
        )
        .unwrap();

        let reconciliation =
            GroupReconciler::new(OperationSequence::new().replace("MERGE3", "MERGE2"))
                .reconcile_subtree(&subtree);
        let batch = Batch::from_reconciliation(&reconciliation, address_of);

        assert_eq!(batch.len(), 4);
        assert!(batch
            .iter()
            .all(|step| step.address().to_string().contains("stack=tcp")));
    }

    #[test]
    fn command_accessors_and_serialization() {
        let delete = BatchCommand::delete(address_of("tcp", "PING"));
        assert_eq!(delete.kind(), CommandKind::Delete);
        assert!(delete.payload().is_none());

        let json = serde_json::to_value(&delete).unwrap();
        assert_eq!(
            json,
            json!({"operation": "delete", "address": "/subsystem=jgroups/stack=tcp/protocol=PING"})
        );
    }
}
