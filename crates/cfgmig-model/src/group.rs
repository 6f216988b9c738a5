//! Ordered group snapshots
//!
//! A [`GroupSnapshot`] is the immutable baseline of one named group as it
//! was read from the store. A [`SubtreeSnapshot`] holds every group found
//! under one configuration subtree, in enumeration order.

use crate::address::ResourceAddress;
use crate::element::Element;
use indexmap::map::Entry;
use indexmap::IndexMap;

/// Baseline of one ordered group
///
/// # Invariants
/// - Element order is the order the store reported
/// - Immutable after construction
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSnapshot {
    name: String,
    elements: Vec<Element>,
}

impl GroupSnapshot {
    /// Create new snapshot
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, elements: Vec<Element>) -> Self {
        Self {
            name: name.into(),
            elements,
        }
    }

    /// Group name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Elements in baseline order
    #[inline]
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Element names in baseline order
    #[inline]
    pub fn element_names(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(Element::name)
    }

    /// Number of elements
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the group has no elements
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// All groups of one configuration subtree, read once
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubtreeSnapshot {
    address: ResourceAddress,
    groups: IndexMap<String, GroupSnapshot>,
}

impl SubtreeSnapshot {
    /// Create an empty snapshot for a subtree
    #[inline]
    #[must_use]
    pub fn new(address: ResourceAddress) -> Self {
        Self {
            address,
            groups: IndexMap::new(),
        }
    }

    /// Build a snapshot from `(group name, elements)` pairs in store order
    ///
    /// # Errors
    /// Returns error if the same group name is reported twice
    pub fn from_groups<I>(address: ResourceAddress, groups: I) -> Result<Self, SnapshotError>
    where
        I: IntoIterator<Item = (String, Vec<Element>)>,
    {
        let mut snapshot = Self::new(address);
        for (name, elements) in groups {
            snapshot.insert(GroupSnapshot::new(name, elements))?;
        }
        Ok(snapshot)
    }

    /// Add a group
    ///
    /// # Errors
    /// Returns error if a group with the same name was already captured
    pub fn insert(&mut self, group: GroupSnapshot) -> Result<(), SnapshotError> {
        match self.groups.entry(group.name.clone()) {
            Entry::Occupied(_) => Err(SnapshotError::DuplicateGroup {
                subtree: self.address.to_string(),
                group: group.name,
            }),
            Entry::Vacant(slot) => {
                slot.insert(group);
                Ok(())
            }
        }
    }

    /// Subtree address
    #[inline]
    #[must_use]
    pub fn address(&self) -> &ResourceAddress {
        &self.address
    }

    /// Look up a group by name
    #[inline]
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&GroupSnapshot> {
        self.groups.get(name)
    }

    /// Groups in enumeration order
    #[inline]
    pub fn groups(&self) -> impl Iterator<Item = &GroupSnapshot> {
        self.groups.values()
    }

    /// Group names in enumeration order
    #[inline]
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Number of groups
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Check if no groups are defined under the subtree
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Snapshot construction errors
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Store reported a group twice
    #[error("group '{group}' reported twice under {subtree}")]
    DuplicateGroup { subtree: String, group: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elements(names: &[&str]) -> Vec<Element> {
        names.iter().map(|n| Element::bare(*n)).collect()
    }

    #[test]
    fn group_snapshot_keeps_order() {
        let group = GroupSnapshot::new("tcp", elements(&["PING", "MERGE3", "FD_SOCK"]));
        assert_eq!(group.name(), "tcp");
        assert_eq!(group.len(), 3);
        assert_eq!(
            group.element_names().collect::<Vec<_>>(),
            vec!["PING", "MERGE3", "FD_SOCK"]
        );
    }

    #[test]
    fn subtree_from_groups_preserves_enumeration_order() {
        let snapshot = SubtreeSnapshot::from_groups(
            ResourceAddress::single("subsystem", "jgroups"),
            vec![
                ("udp".to_string(), elements(&["PING"])),
                ("tcp".to_string(), elements(&["MPING"])),
            ],
        )
        .unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.group_names().collect::<Vec<_>>(), vec!["udp", "tcp"]);
        assert_eq!(snapshot.group("tcp").unwrap().len(), 1);
    }

    #[test]
    fn subtree_rejects_duplicate_group() {
        let result = SubtreeSnapshot::from_groups(
            ResourceAddress::root(),
            vec![
                ("tcp".to_string(), elements(&["PING"])),
                ("tcp".to_string(), elements(&["MPING"])),
            ],
        );
        assert!(matches!(
            result,
            Err(SnapshotError::DuplicateGroup { ref group, .. }) if group == "tcp"
        ));
    }

    #[test]
    fn subtree_empty() {
        let snapshot = SubtreeSnapshot::new(ResourceAddress::root());
        assert!(snapshot.is_empty());
        assert!(snapshot.group("tcp").is_none());
    }
}
