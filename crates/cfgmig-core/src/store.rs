//! Configuration store boundary
//!
//! The migration task only ever talks to the store through
//! [`ConfigStore`]: one read of the subtree's groups and one atomic batch
//! submission.

use cfgmig_model::{Element, ResourceAddress};
use cfgmig_reconcile::Batch;
use serde::{Deserialize, Serialize};

/// Location of a subtree and the keys used to address its children
///
/// Elements live at `{address}/{group_key}={group}/{element_key}={element}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubtreeHandle {
    address: ResourceAddress,
    group_key: String,
    element_key: String,
}

impl SubtreeHandle {
    /// Create a handle
    #[inline]
    #[must_use]
    pub fn new(
        address: ResourceAddress,
        group_key: impl Into<String>,
        element_key: impl Into<String>,
    ) -> Self {
        Self {
            address,
            group_key: group_key.into(),
            element_key: element_key.into(),
        }
    }

    /// Subtree address
    #[inline]
    #[must_use]
    pub fn address(&self) -> &ResourceAddress {
        &self.address
    }

    /// Key naming groups below the subtree
    #[inline]
    #[must_use]
    pub fn group_key(&self) -> &str {
        &self.group_key
    }

    /// Key naming elements below a group
    #[inline]
    #[must_use]
    pub fn element_key(&self) -> &str {
        &self.element_key
    }

    /// Address of a group
    #[must_use]
    pub fn group_address(&self, group: &str) -> ResourceAddress {
        self.address.append(&self.group_key, group)
    }

    /// Address of an element
    #[must_use]
    pub fn element_address(&self, group: &str, element: &str) -> ResourceAddress {
        self.group_address(group).append(&self.element_key, element)
    }
}

/// Errors raised by a configuration store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Subtree is not known to the store
    #[error("subtree not found: {0}")]
    SubtreeNotFound(ResourceAddress),

    /// Batch step addressed a resource that does not exist
    #[error("step {step} failed: resource not found: {address}")]
    ResourceNotFound {
        /// Zero-based step index
        step: usize,
        /// Missing resource
        address: ResourceAddress,
    },

    /// Batch step tried to create a resource that already exists
    #[error("step {step} failed: duplicate resource: {address}")]
    DuplicateResource {
        /// Zero-based step index
        step: usize,
        /// Existing resource
        address: ResourceAddress,
    },

    /// Batch step addressed something outside any known group
    #[error("step {step} failed: invalid address: {address}")]
    InvalidAddress {
        /// Zero-based step index
        step: usize,
        /// Offending address
        address: ResourceAddress,
    },

    /// Store refused the whole batch
    #[error("batch rejected: {0}")]
    Rejected(String),

    /// Transport or backend failure
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Remote configuration store
///
/// `submit_batch` is all-or-nothing: either every step takes effect or
/// none does.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ConfigStore: Send + Sync {
    /// Read every group below the subtree, each in stored order
    async fn read_groups(
        &self,
        subtree: &SubtreeHandle,
    ) -> Result<Vec<(String, Vec<Element>)>, StoreError>;

    /// Submit a batch as one atomic transaction
    async fn submit_batch(&self, batch: Batch) -> Result<(), StoreError>;

    /// Address of an element below the subtree
    fn address_of(&self, subtree: &SubtreeHandle, group: &str, element: &str) -> ResourceAddress {
        subtree.element_address(group, element)
    }
}
