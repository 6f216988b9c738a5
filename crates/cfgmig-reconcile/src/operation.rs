//! Edit operations on ordered groups
//!
//! Provides [`EditOperation`], the three declarative edits a migration can
//! make to a group, and [`OperationSequence`], the ordered list applied to
//! every group of a subtree.

use cfgmig_model::Element;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// One declarative edit of a group's working element list
///
/// Operations are stateless and reusable: the same value is applied to
/// every group. Names that do not occur in the list make `Replace` and
/// `Remove` no-ops.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditOperation {
    /// Append an element with the empty payload
    ///
    /// Never deduplicates: adding a name that is already present appends a
    /// second element with that name.
    Add {
        /// Name of the new element
        name: String,
    },

    /// Rename every element called `old_name`, in place
    ///
    /// Each match is replaced by a fresh element with the empty payload.
    Replace {
        /// Name to look for
        old_name: String,
        /// Name of the replacement element
        new_name: String,
    },

    /// Remove the first element called `name`
    Remove {
        /// Name to remove
        name: String,
    },
}

impl EditOperation {
    /// Create an `Add` operation
    #[inline]
    #[must_use]
    pub fn add(name: impl Into<String>) -> Self {
        Self::Add { name: name.into() }
    }

    /// Create a `Replace` operation
    #[inline]
    #[must_use]
    pub fn replace(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self::Replace {
            old_name: old_name.into(),
            new_name: new_name.into(),
        }
    }

    /// Create a `Remove` operation
    #[inline]
    #[must_use]
    pub fn remove(name: impl Into<String>) -> Self {
        Self::Remove { name: name.into() }
    }

    /// Apply the operation to a working list
    ///
    /// Returns whether the list changed.
    pub fn apply(&self, target: &mut Vec<Element>) -> bool {
        match self {
            Self::Add { name } => {
                target.push(Element::bare(name.as_str()));
                true
            }
            Self::Replace { old_name, new_name } => {
                let mut replaced = false;
                for slot in target.iter_mut().filter(|e| e.name() == old_name) {
                    *slot = Element::bare(new_name.as_str());
                    replaced = true;
                }
                replaced
            }
            Self::Remove { name } => match target.iter().position(|e| e.name() == name) {
                Some(index) => {
                    target.remove(index);
                    true
                }
                None => false,
            },
        }
    }

    /// Check if operation only ever appends
    #[inline]
    #[must_use]
    pub fn is_additive(&self) -> bool {
        matches!(self, Self::Add { .. })
    }
}

impl Display for EditOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add { name } => write!(f, "add({name})"),
            Self::Replace { old_name, new_name } => write!(f, "replace({old_name}, {new_name})"),
            Self::Remove { name } => write!(f, "remove({name})"),
        }
    }
}

/// Ordered list of edit operations
///
/// Built once at configuration time and reused for every group.
///
/// # Example
/// ```rust
/// use cfgmig_reconcile::OperationSequence;
///
/// let operations = OperationSequence::new()
///     .replace("MERGE3", "MERGE2")
///     .add("VERIFY_SUSPECT")
///     .remove("FD_SOCK");
/// assert_eq!(operations.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationSequence(Vec<EditOperation>);

impl OperationSequence {
    /// Create empty sequence
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append an `Add`
    #[inline]
    #[must_use]
    pub fn add(self, name: impl Into<String>) -> Self {
        self.then(EditOperation::add(name))
    }

    /// Append a `Replace`
    #[inline]
    #[must_use]
    pub fn replace(self, old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        self.then(EditOperation::replace(old_name, new_name))
    }

    /// Append a `Remove`
    #[inline]
    #[must_use]
    pub fn remove(self, name: impl Into<String>) -> Self {
        self.then(EditOperation::remove(name))
    }

    /// Append any operation
    #[inline]
    #[must_use]
    pub fn then(mut self, operation: EditOperation) -> Self {
        self.0.push(operation);
        self
    }

    /// Apply every operation, in order, to a working list
    ///
    /// Returns the number of operations that changed the list.
    pub fn apply_all(&self, target: &mut Vec<Element>) -> usize {
        let mut changes = 0;
        for operation in &self.0 {
            let changed = operation.apply(target);
            tracing::trace!(%operation, changed, "applied edit operation");
            if changed {
                changes += 1;
            }
        }
        changes
    }

    /// Operations in application order
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[EditOperation] {
        &self.0
    }

    /// Iterate in application order
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, EditOperation> {
        self.0.iter()
    }

    /// Number of operations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if sequence is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<EditOperation>> for OperationSequence {
    fn from(operations: Vec<EditOperation>) -> Self {
        Self(operations)
    }
}

impl FromIterator<EditOperation> for OperationSequence {
    fn from_iter<I: IntoIterator<Item = EditOperation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a OperationSequence {
    type Item = &'a EditOperation;
    type IntoIter = std::slice::Iter<'a, EditOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgmig_model::Payload;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn list(names: &[&str]) -> Vec<Element> {
        names.iter().map(|n| Element::bare(*n)).collect()
    }

    fn names(list: &[Element]) -> Vec<&str> {
        list.iter().map(Element::name).collect()
    }

    #[test]
    fn add_appends_with_empty_payload() {
        let mut target = list(&["PING"]);
        assert!(EditOperation::add("VERIFY_SUSPECT").apply(&mut target));
        assert_eq!(names(&target), vec!["PING", "VERIFY_SUSPECT"]);
        assert!(target[1].payload().is_empty());
    }

    #[test]
    fn add_does_not_deduplicate() {
        let mut target = list(&["PING"]);
        EditOperation::add("PING").apply(&mut target);
        assert_eq!(names(&target), vec!["PING", "PING"]);
    }

    #[test]
    fn replace_renames_all_occurrences_in_place() {
        let mut target = list(&["a", "x", "a"]);
        assert!(EditOperation::replace("a", "b").apply(&mut target));
        assert_eq!(names(&target), vec!["b", "x", "b"]);
    }

    #[test]
    fn replace_drops_payload() {
        let mut target = vec![Element::new("MERGE3", Payload::new(json!({"max_interval": 30000})))];
        EditOperation::replace("MERGE3", "MERGE2").apply(&mut target);
        assert_eq!(target, vec![Element::bare("MERGE2")]);
    }

    #[test]
    fn replace_absent_is_noop() {
        let mut target = list(&["PING"]);
        assert!(!EditOperation::replace("MERGE3", "MERGE2").apply(&mut target));
        assert_eq!(names(&target), vec!["PING"]);
    }

    #[test]
    fn remove_only_first_occurrence() {
        let mut target = list(&["x", "y", "x"]);
        assert!(EditOperation::remove("x").apply(&mut target));
        assert_eq!(names(&target), vec!["y", "x"]);
    }

    #[test]
    fn remove_absent_reports_not_removed() {
        let mut target = list(&["PING", "MERGE3"]);
        let before = target.clone();
        assert!(!EditOperation::remove("FD_SOCK").apply(&mut target));
        assert_eq!(target, before);
    }

    #[test]
    fn sequence_builder_keeps_order() {
        let operations = OperationSequence::new()
            .replace("MERGE3", "MERGE2")
            .add("VERIFY_SUSPECT")
            .remove("FD_SOCK");

        assert_eq!(
            operations.as_slice(),
            &[
                EditOperation::replace("MERGE3", "MERGE2"),
                EditOperation::add("VERIFY_SUSPECT"),
                EditOperation::remove("FD_SOCK"),
            ]
        );
    }

    #[test]
    fn sequence_apply_all_composes_left_to_right() {
        // Later operations see the effects of earlier ones
        let operations = OperationSequence::new().add("X").replace("X", "Y").remove("PING");
        let mut target = list(&["PING"]);

        assert_eq!(operations.apply_all(&mut target), 3);
        assert_eq!(names(&target), vec!["Y"]);
    }

    #[test]
    fn operation_display() {
        assert_eq!(EditOperation::add("A").to_string(), "add(A)");
        assert_eq!(EditOperation::replace("A", "B").to_string(), "replace(A, B)");
        assert_eq!(EditOperation::remove("A").to_string(), "remove(A)");
        assert!(EditOperation::add("A").is_additive());
    }

    #[test]
    fn sequence_deserializes_from_yaml() {
        let yaml = "
- replace: {old_name: MERGE3, new_name: MERGE2}
- add: {name: VERIFY_SUSPECT}
- remove: {name: FD_SOCK}
";
        let operations: OperationSequence = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            operations,
            OperationSequence::new()
                .replace("MERGE3", "MERGE2")
                .add("VERIFY_SUSPECT")
                .remove("FD_SOCK")
        );
    }
}
