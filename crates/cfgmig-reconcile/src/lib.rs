//! cfgmig Reconciliation Engine
//!
//! Applies declarative edits to ordered groups and turns the net change
//! into one atomic batch of store commands.
//!
//! # Core Concepts
//!
//! - [`EditOperation`]: `Add`, `Replace` or `Remove` on a working list
//! - [`OperationSequence`]: ordered operations, reused for every group
//! - [`GroupReconciler`]: applies a sequence to each group and diffs it
//! - [`DiffResult`]: names added and removed relative to the baseline
//! - [`BatchBuilder`]: full teardown/rebuild of every changed group
//!
//! # Example
//!
//! ```rust
//! use cfgmig_model::{Element, GroupSnapshot, ResourceAddress};
//! use cfgmig_reconcile::{BatchBuilder, GroupReconciler, OperationSequence};
//!
//! let reconciler = GroupReconciler::new(
//!     OperationSequence::new()
//!         .replace("MERGE3", "MERGE2")
//!         .add("VERIFY_SUSPECT")
//!         .remove("FD_SOCK"),
//! );
//!
//! let stack = GroupSnapshot::new(
//!     "tcp",
//!     vec![Element::bare("PING"), Element::bare("MERGE3"), Element::bare("FD_SOCK")],
//! );
//! let group = reconciler.reconcile(&stack);
//! assert_eq!(group.target_names().collect::<Vec<_>>(), ["PING", "MERGE2", "VERIFY_SUSPECT"]);
//!
//! let subsystem = ResourceAddress::single("subsystem", "jgroups");
//! let mut builder = BatchBuilder::new();
//! builder.add_group(&group, |stack, protocol| {
//!     subsystem.append("stack", stack).append("protocol", protocol)
//! });
//! assert_eq!(builder.build().len(), 6);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod batch;
mod diff;
mod operation;
mod reconciler;

// Re-exports
pub use batch::{Batch, BatchBuilder, BatchCommand, CommandKind};
pub use diff::DiffResult;
pub use operation::{EditOperation, OperationSequence};
pub use reconciler::{GroupReconciler, ReconciledGroup, Reconciliation, WorkingGroup};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use cfgmig_model::{Element, ResourceAddress, SubtreeSnapshot};

    fn subtree() -> SubtreeSnapshot {
        SubtreeSnapshot::from_groups(
            ResourceAddress::single("subsystem", "jgroups"),
            vec![
                (
                    "udp".to_string(),
                    vec![Element::bare("PING"), Element::bare("MERGE3")],
                ),
                (
                    "tcp".to_string(),
                    vec![Element::bare("MPING"), Element::bare("FD_SOCK")],
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn reconcile_then_batch() {
        let snapshot = subtree();
        let reconciliation = GroupReconciler::new(OperationSequence::new().remove("FD_SOCK"))
            .reconcile_subtree(&snapshot);

        let batch = Batch::from_reconciliation(&reconciliation, |group, element| {
            snapshot.address().append("stack", group).append("protocol", element)
        });

        // Only tcp changed: two deletes, one create
        assert_eq!(batch.len(), 3);
        let kinds: Vec<_> = batch.iter().map(BatchCommand::kind).collect();
        assert_eq!(
            kinds,
            vec![CommandKind::Delete, CommandKind::Delete, CommandKind::Create]
        );
    }

    #[test]
    fn empty_sequence_builds_empty_batch() {
        let snapshot = subtree();
        let reconciliation = GroupReconciler::default().reconcile_subtree(&snapshot);
        assert!(reconciliation.is_unchanged());

        let batch = Batch::from_reconciliation(&reconciliation, |group, element| {
            snapshot.address().append("stack", group).append("protocol", element)
        });
        assert!(batch.is_empty());
    }
}
