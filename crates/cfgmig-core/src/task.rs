//! Migration task
//!
//! Reads a subtree's groups once, reconciles every group against the
//! configured operations and submits the net change as a single batch.
//!
//! # Execution Flow
//!
//! ```text
//! NotStarted → Running ─┬→ read_groups ─ none ────────────────→ Skipped
//!                       ├→ reconcile ─── no diff ─────────────→ Skipped
//!                       └→ submit_batch ─┬ accepted ──────────→ Success
//!                                        └ rejected ──────────→ Failed
//! ```

use crate::config::MigrationConfig;
use crate::state::{validate_transition, IllegalTransition, TaskState};
use crate::store::{ConfigStore, StoreError, SubtreeHandle};
use cfgmig_model::{Element, ResourceAddress, SnapshotError, SubtreeSnapshot};
use cfgmig_reconcile::{Batch, DiffResult, GroupReconciler, OperationSequence, Reconciliation};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use tracing::Instrument;

/// Errors from running a migration task
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Store read or submission failed; carries the store's error as is
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Task was run outside its lifecycle
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),

    /// Store reported an inconsistent subtree
    #[error("invalid subtree snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

impl TaskError {
    /// The store's error, if that is what failed the task
    #[inline]
    #[must_use]
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store(error) => Some(error),
            _ => None,
        }
    }
}

/// Terminal outcome reported by a task that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Batch submitted and accepted
    Success,
    /// Nothing to do
    Skipped,
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "SUCCESS",
            Self::Skipped => "SKIPPED",
        };
        f.write_str(name)
    }
}

/// Net change of one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupChange {
    /// Group name
    pub group: String,
    /// Names added and removed
    #[serde(flatten)]
    pub diff: DiffResult,
}

/// What a run looked at and changed
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MigrationSummary {
    /// Groups read from the store
    pub groups_scanned: usize,
    /// Groups with a non-empty diff, in enumeration order
    pub changed_groups: Vec<GroupChange>,
    /// Steps in the submitted batch
    pub commands: usize,
}

/// Result of a task that did not fail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskResult {
    status: TaskStatus,
    attributes: IndexMap<String, JsonValue>,
    summary: MigrationSummary,
}

impl TaskResult {
    /// Start a successful result
    #[inline]
    #[must_use]
    pub fn success() -> TaskResultBuilder {
        TaskResultBuilder::new(TaskStatus::Success)
    }

    /// Start a skipped result
    #[inline]
    #[must_use]
    pub fn skipped() -> TaskResultBuilder {
        TaskResultBuilder::new(TaskStatus::Skipped)
    }

    /// Outcome
    #[inline]
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Reported attributes, in insertion order
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &IndexMap<String, JsonValue> {
        &self.attributes
    }

    /// One attribute
    #[inline]
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&JsonValue> {
        self.attributes.get(key)
    }

    /// Typed summary of the run
    #[inline]
    #[must_use]
    pub fn summary(&self) -> &MigrationSummary {
        &self.summary
    }
}

/// Builder for [`TaskResult`]
#[derive(Debug)]
pub struct TaskResultBuilder {
    result: TaskResult,
}

impl TaskResultBuilder {
    fn new(status: TaskStatus) -> Self {
        Self {
            result: TaskResult {
                status,
                attributes: IndexMap::new(),
                summary: MigrationSummary::default(),
            },
        }
    }

    /// Add an attribute
    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.result.attributes.insert(key.into(), value.into());
        self
    }

    /// Attach the run summary
    #[must_use]
    pub fn summary(mut self, summary: MigrationSummary) -> Self {
        self.result.summary = summary;
        self
    }

    /// Finish the result
    #[must_use]
    pub fn build(self) -> TaskResult {
        self.result
    }
}

/// Reconciliation of a subtree and the batch that applies it
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationPlan {
    reconciliation: Reconciliation,
    batch: Batch,
}

impl MigrationPlan {
    /// Per-group results
    #[inline]
    #[must_use]
    pub fn reconciliation(&self) -> &Reconciliation {
        &self.reconciliation
    }

    /// Batch to submit
    #[inline]
    #[must_use]
    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    /// Check if there is nothing to submit
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.batch.is_empty()
    }

    /// Summary of the plan
    #[must_use]
    pub fn summary(&self) -> MigrationSummary {
        MigrationSummary {
            groups_scanned: self.reconciliation.groups().len(),
            changed_groups: self
                .reconciliation
                .changed_groups()
                .map(|group| GroupChange {
                    group: group.name().to_string(),
                    diff: group.diff().clone(),
                })
                .collect(),
            commands: self.batch.len(),
        }
    }

    /// Consume into the batch
    #[inline]
    #[must_use]
    pub fn into_batch(self) -> Batch {
        self.batch
    }
}

/// Single-use migration of one subtree
///
/// # Example
///
/// ```rust
/// use cfgmig_core::{MemoryStore, MigrationConfig, MigrationTask, TaskStatus};
/// use cfgmig_model::Element;
/// use cfgmig_reconcile::OperationSequence;
///
/// # async fn example() -> Result<(), cfgmig_core::TaskError> {
/// let config = MigrationConfig::new()
///     .with_operations(OperationSequence::new().replace("MERGE3", "MERGE2"));
/// let store = MemoryStore::new();
/// store.insert_subtree(&config.handle(), vec![("tcp".to_string(), vec![Element::bare("MERGE3")])]);
///
/// let mut task = MigrationTask::from_config(&config);
/// let result = task.run(&store, &config.handle()).await?;
/// assert_eq!(result.status(), TaskStatus::Success);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MigrationTask {
    name: String,
    report_label: String,
    reconciler: GroupReconciler,
    state: TaskState,
}

impl MigrationTask {
    /// Create a task
    #[must_use]
    pub fn new(name: impl Into<String>, operations: OperationSequence) -> Self {
        Self {
            name: name.into(),
            report_label: "protocols".to_string(),
            reconciler: GroupReconciler::new(operations),
            state: TaskState::NotStarted,
        }
    }

    /// Create a task from configuration
    #[must_use]
    pub fn from_config(config: &MigrationConfig) -> Self {
        Self::new(&config.task_name, config.operations.clone())
            .with_report_label(&config.report_label)
    }

    /// With report label
    #[inline]
    #[must_use]
    pub fn with_report_label(mut self, label: impl Into<String>) -> Self {
        self.report_label = label.into();
        self
    }

    /// Task name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state
    #[inline]
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Operations applied to every group
    #[inline]
    #[must_use]
    pub fn operations(&self) -> &OperationSequence {
        self.reconciler.operations()
    }

    /// Name of the removed-elements attribute
    #[must_use]
    pub fn removed_key(&self) -> String {
        format!("{}-removed", self.report_label)
    }

    /// Name of the added-elements attribute
    #[must_use]
    pub fn added_key(&self) -> String {
        format!("{}-added", self.report_label)
    }

    /// Reconcile groups and build the batch without touching any store
    ///
    /// # Errors
    /// Returns [`TaskError::Snapshot`] if a group name appears twice
    pub fn plan<F>(
        &self,
        subtree: &SubtreeHandle,
        groups: Vec<(String, Vec<Element>)>,
        address_of: F,
    ) -> Result<MigrationPlan, TaskError>
    where
        F: FnMut(&str, &str) -> ResourceAddress,
    {
        let snapshot = SubtreeSnapshot::from_groups(subtree.address().clone(), groups)?;
        let reconciliation = self.reconciler.reconcile_subtree(&snapshot);
        let batch = Batch::from_reconciliation(&reconciliation, address_of);
        Ok(MigrationPlan {
            reconciliation,
            batch,
        })
    }

    /// Run the migration against a store
    ///
    /// # Errors
    /// - [`TaskError::IllegalTransition`] if the task already ran
    /// - [`TaskError::Store`] with the store's error if reading or
    ///   submitting failed; the task is then `Failed`
    pub async fn run<S>(&mut self, store: &S, subtree: &SubtreeHandle) -> Result<TaskResult, TaskError>
    where
        S: ConfigStore + ?Sized,
    {
        self.transition(TaskState::Running)?;

        let span = tracing::info_span!("migration_task", task = %self.name, subtree = %subtree.address());
        let outcome = self.execute(store, subtree).instrument(span).await;

        let next = match &outcome {
            Ok(result) if result.status() == TaskStatus::Skipped => TaskState::Skipped,
            Ok(_) => TaskState::Success,
            Err(_) => TaskState::Failed,
        };
        self.transition(next)?;
        outcome
    }

    fn transition(&mut self, to: TaskState) -> Result<(), TaskError> {
        validate_transition(self.state, to)?;
        tracing::trace!(task = %self.name, from = %self.state, %to, "task state change");
        self.state = to;
        Ok(())
    }

    async fn execute<S>(&self, store: &S, subtree: &SubtreeHandle) -> Result<TaskResult, TaskError>
    where
        S: ConfigStore + ?Sized,
    {
        tracing::info!(operations = self.operations().len(), "starting migration");

        let groups = store.read_groups(subtree).await?;
        if groups.is_empty() {
            tracing::debug!(group_key = subtree.group_key(), "No groups defined.");
            return Ok(TaskResult::skipped().build());
        }

        let plan = self.plan(subtree, groups, |group, element| {
            store.address_of(subtree, group, element)
        })?;
        let summary = plan.summary();
        if plan.is_noop() {
            tracing::debug!(label = %self.report_label, "No elements removed or added.");
            return Ok(TaskResult::skipped().summary(summary).build());
        }

        let total = plan.reconciliation().total_diff();
        tracing::info!(
            steps = summary.commands,
            groups = summary.changed_groups.len(),
            "submitting batch"
        );
        store.submit_batch(plan.into_batch()).await?;
        tracing::info!(
            added = ?total.added,
            removed = ?total.removed,
            "migration applied"
        );

        Ok(TaskResult::success()
            .attribute(self.removed_key(), names(&total.removed))
            .attribute(self.added_key(), names(&total.added))
            .summary(summary)
            .build())
    }
}

fn names(set: &BTreeSet<String>) -> JsonValue {
    set.iter().cloned().collect::<Vec<_>>().into()
}
