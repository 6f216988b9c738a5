//! In-memory transactional store
//!
//! Keeps each registered subtree as ordered groups of ordered elements.
//! Submissions run against a scratch copy and are committed only when
//! every step succeeds, so a rejected batch leaves no trace.

use crate::document::SubtreeDocument;
use crate::store::{ConfigStore, StoreError, SubtreeHandle};
use cfgmig_model::{Element, Payload, ResourceAddress};
use cfgmig_reconcile::{Batch, BatchCommand};
use indexmap::IndexMap;
use parking_lot::Mutex;

type Members = IndexMap<String, Payload>;

#[derive(Debug, Clone)]
struct StoredSubtree {
    handle: SubtreeHandle,
    groups: IndexMap<String, Members>,
}

impl StoredSubtree {
    fn new(handle: SubtreeHandle, groups: Vec<(String, Vec<Element>)>) -> Self {
        let groups = groups
            .into_iter()
            .map(|(name, elements)| {
                let members = elements.into_iter().map(Element::into_parts).collect();
                (name, members)
            })
            .collect();
        Self { handle, groups }
    }

    fn snapshot(&self) -> Vec<(String, Vec<Element>)> {
        self.groups
            .iter()
            .map(|(name, members)| {
                let elements = members
                    .iter()
                    .map(|(element, payload)| Element::new(element.clone(), payload.clone()))
                    .collect();
                (name.clone(), elements)
            })
            .collect()
    }

    /// Group and element names addressed by `address`, if it points at an
    /// element of this subtree
    fn locate(&self, address: &ResourceAddress) -> Option<(String, String)> {
        let relative = address.relative_to(self.handle.address()).ok()?;
        match relative.elements() {
            [group, element]
                if group.key() == self.handle.group_key()
                    && element.key() == self.handle.element_key() =>
            {
                Some((group.value().to_string(), element.value().to_string()))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    subtrees: IndexMap<ResourceAddress, StoredSubtree>,
    pending_rejection: Option<String>,
    submissions: usize,
}

impl Inner {
    fn owner_of(&self, address: &ResourceAddress) -> Option<(ResourceAddress, String, String)> {
        self.subtrees.iter().find_map(|(root, subtree)| {
            subtree
                .locate(address)
                .map(|(group, element)| (root.clone(), group, element))
        })
    }

    fn apply(&mut self, step_index: usize, step: BatchCommand) -> Result<(), StoreError> {
        let address = step.address().clone();
        let invalid = || StoreError::InvalidAddress {
            step: step_index,
            address: address.clone(),
        };

        let (root, group, element) = self.owner_of(&address).ok_or_else(invalid)?;
        let members = self
            .subtrees
            .get_mut(&root)
            .and_then(|subtree| subtree.groups.get_mut(&group))
            .ok_or_else(invalid)?;

        match step {
            BatchCommand::Delete { .. } => {
                members
                    .shift_remove(&element)
                    .ok_or(StoreError::ResourceNotFound {
                        step: step_index,
                        address,
                    })?;
            }
            BatchCommand::Create { payload, .. } => {
                if members.contains_key(&element) {
                    return Err(StoreError::DuplicateResource {
                        step: step_index,
                        address,
                    });
                }
                members.insert(element, payload);
            }
        }
        Ok(())
    }
}

/// Configuration store held entirely in memory
///
/// # Example
///
/// ```rust
/// use cfgmig_core::{ConfigStore, MemoryStore, SubtreeHandle};
/// use cfgmig_model::{Element, ResourceAddress};
///
/// # async fn example() -> Result<(), cfgmig_core::StoreError> {
/// let handle = SubtreeHandle::new(ResourceAddress::single("subsystem", "jgroups"), "stack", "protocol");
/// let store = MemoryStore::new();
/// store.insert_subtree(&handle, vec![("tcp".to_string(), vec![Element::bare("PING")])]);
///
/// let groups = store.read_groups(&handle).await?;
/// assert_eq!(groups[0].1[0].name(), "PING");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subtree with its groups, replacing any previous content
    pub fn insert_subtree(&self, handle: &SubtreeHandle, groups: Vec<(String, Vec<Element>)>) {
        self.inner.lock().subtrees.insert(
            handle.address().clone(),
            StoredSubtree::new(handle.clone(), groups),
        );
    }

    /// Register a subtree from its document form
    pub fn import(&self, handle: &SubtreeHandle, document: &SubtreeDocument) {
        let groups = document.groups(handle.group_key(), handle.element_key());
        self.insert_subtree(handle, groups);
    }

    /// Current groups of a registered subtree
    ///
    /// # Errors
    /// Returns [`StoreError::SubtreeNotFound`] if the subtree was never registered
    pub fn snapshot(&self, handle: &SubtreeHandle) -> Result<Vec<(String, Vec<Element>)>, StoreError> {
        self.inner
            .lock()
            .subtrees
            .get(handle.address())
            .map(StoredSubtree::snapshot)
            .ok_or_else(|| StoreError::SubtreeNotFound(handle.address().clone()))
    }

    /// Current element names of one group
    #[must_use]
    pub fn element_names(&self, handle: &SubtreeHandle, group: &str) -> Option<Vec<String>> {
        self.inner
            .lock()
            .subtrees
            .get(handle.address())
            .and_then(|subtree| subtree.groups.get(group))
            .map(|members| members.keys().cloned().collect())
    }

    /// Current content of a subtree as a document
    ///
    /// # Errors
    /// Returns [`StoreError::SubtreeNotFound`] if the subtree was never registered
    pub fn export(&self, handle: &SubtreeHandle) -> Result<SubtreeDocument, StoreError> {
        let groups = self.snapshot(handle)?;
        Ok(SubtreeDocument::from_groups(
            handle.group_key(),
            handle.element_key(),
            groups,
        ))
    }

    /// Make the next submission fail with [`StoreError::Rejected`]
    pub fn reject_next_submit(&self, reason: impl Into<String>) {
        self.inner.lock().pending_rejection = Some(reason.into());
    }

    /// Number of batches submitted so far, accepted or not
    #[must_use]
    pub fn submission_count(&self) -> usize {
        self.inner.lock().submissions
    }

    fn commit(&self, batch: Batch) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.submissions += 1;

        if let Some(reason) = inner.pending_rejection.take() {
            return Err(StoreError::Rejected(reason));
        }

        let mut scratch = Inner {
            subtrees: inner.subtrees.clone(),
            ..Inner::default()
        };
        for (index, step) in batch.into_iter().enumerate() {
            scratch.apply(index, step)?;
        }

        inner.subtrees = scratch.subtrees;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ConfigStore for MemoryStore {
    /// An unregistered subtree reads as having no groups
    async fn read_groups(
        &self,
        subtree: &SubtreeHandle,
    ) -> Result<Vec<(String, Vec<Element>)>, StoreError> {
        match self.snapshot(subtree) {
            Err(StoreError::SubtreeNotFound(address)) => {
                tracing::debug!(%address, "subtree not registered");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    async fn submit_batch(&self, batch: Batch) -> Result<(), StoreError> {
        let steps = batch.len();
        let result = self.commit(batch);
        match &result {
            Ok(()) => tracing::debug!(steps, "memory store committed batch"),
            Err(error) => tracing::debug!(steps, %error, "memory store rejected batch"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgmig_reconcile::BatchBuilder;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn handle() -> SubtreeHandle {
        SubtreeHandle::new(ResourceAddress::single("subsystem", "jgroups"), "stack", "protocol")
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_subtree(
            &handle(),
            vec![
                (
                    "tcp".to_string(),
                    vec![Element::bare("PING"), Element::bare("MERGE3"), Element::bare("FD_SOCK")],
                ),
                ("udp".to_string(), vec![Element::bare("PING")]),
            ],
        );
        store
    }

    fn address(group: &str, element: &str) -> ResourceAddress {
        handle().element_address(group, element)
    }

    fn batch(steps: Vec<BatchCommand>) -> Batch {
        let mut builder = BatchBuilder::new();
        for step in steps {
            builder.add_step(step);
        }
        builder.build()
    }

    #[tokio::test]
    async fn read_groups_in_insertion_order() {
        let groups = seeded().read_groups(&handle()).await.unwrap();
        let names: Vec<_> = groups.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["tcp", "udp"]);
        assert_eq!(groups[0].1.len(), 3);
    }

    #[tokio::test]
    async fn unknown_subtree_has_no_groups() {
        let other = SubtreeHandle::new(ResourceAddress::single("subsystem", "ejb3"), "stack", "protocol");
        let store = seeded();
        assert!(store.read_groups(&other).await.unwrap().is_empty());
        assert!(matches!(
            store.export(&other),
            Err(StoreError::SubtreeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_then_create_appends_in_order() {
        let store = seeded();
        store
            .submit_batch(batch(vec![
                BatchCommand::delete(address("tcp", "PING")),
                BatchCommand::create(address("tcp", "PING"), Payload::empty()),
            ]))
            .await
            .unwrap();

        assert_eq!(
            store.element_names(&handle(), "tcp").unwrap(),
            vec!["MERGE3", "FD_SOCK", "PING"]
        );
        assert_eq!(store.submission_count(), 1);
    }

    #[tokio::test]
    async fn failing_step_rolls_back_whole_batch() {
        let store = seeded();
        let err = store
            .submit_batch(batch(vec![
                BatchCommand::delete(address("tcp", "PING")),
                BatchCommand::delete(address("tcp", "MISSING")),
            ]))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            StoreError::ResourceNotFound {
                step: 1,
                address: address("tcp", "MISSING")
            }
        );
        assert_eq!(
            store.element_names(&handle(), "tcp").unwrap(),
            vec!["PING", "MERGE3", "FD_SOCK"]
        );
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = seeded();
        let err = store
            .submit_batch(batch(vec![BatchCommand::create(
                address("udp", "PING"),
                Payload::empty(),
            )]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateResource { step: 0, .. }));
    }

    #[tokio::test]
    async fn foreign_address_is_invalid() {
        let store = seeded();
        let foreign = ResourceAddress::single("subsystem", "ejb3").append("stack", "tcp");
        let err = store
            .submit_batch(batch(vec![BatchCommand::delete(foreign)]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidAddress { step: 0, .. }));

        let missing_group = address("sctp", "PING");
        let err = store
            .submit_batch(batch(vec![BatchCommand::create(missing_group, Payload::empty())]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidAddress { .. }));
    }

    #[tokio::test]
    async fn injected_rejection_applies_once() {
        let store = seeded();
        store.reject_next_submit("server reload required");

        let step = || batch(vec![BatchCommand::delete(address("udp", "PING"))]);
        let err = store.submit_batch(step()).await.unwrap_err();
        assert_eq!(err, StoreError::Rejected("server reload required".into()));
        assert_eq!(store.element_names(&handle(), "udp").unwrap(), vec!["PING"]);

        store.submit_batch(step()).await.unwrap();
        assert!(store.element_names(&handle(), "udp").unwrap().is_empty());
        assert_eq!(store.submission_count(), 2);
    }

    #[test]
    fn export_preserves_payloads() {
        let store = MemoryStore::new();
        store.insert_subtree(
            &handle(),
            vec![(
                "tcp".to_string(),
                vec![Element::new("PING", Payload::new(json!({"timeout": 3000})))],
            )],
        );

        let document = store.export(&handle()).unwrap();
        let groups = document.groups("stack", "protocol");
        assert_eq!(groups[0].1[0].payload().get("/timeout"), Some(&json!(3000)));

        let copy = MemoryStore::new();
        copy.import(&handle(), &document);
        assert_eq!(copy.snapshot(&handle()).unwrap(), store.snapshot(&handle()).unwrap());
    }
}
