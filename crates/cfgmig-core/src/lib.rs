//! cfgmig Core - Migration Task Shell
//!
//! Drives one migration of a configuration subtree:
//! - Reads every group once through the [`ConfigStore`] boundary
//! - Reconciles each group against the configured edit operations
//! - Submits the net change as a single atomic batch
//! - Reports the outcome as a [`TaskResult`]
//!
//! # Core Concepts
//!
//! - [`MigrationTask`]: single-use task with a [`TaskState`] lifecycle
//! - [`ConfigStore`]: async store boundary, [`MemoryStore`] in memory
//! - [`MigrationConfig`]: task name, subtree, keys and operations
//! - [`StandaloneServer`]: picks the migration for a source product
//!
//! # Example
//!
//! ```rust
//! use cfgmig_core::prelude::*;
//! use cfgmig_model::Element;
//! use cfgmig_reconcile::OperationSequence;
//!
//! # async fn example() -> Result<(), TaskError> {
//! let config = MigrationConfig::new().with_operations(
//!     OperationSequence::new()
//!         .replace("MERGE3", "MERGE2")
//!         .add("VERIFY_SUSPECT")
//!         .remove("FD_SOCK"),
//! );
//! let handle = config.handle();
//!
//! let store = MemoryStore::new();
//! store.insert_subtree(
//!     &handle,
//!     vec![(
//!         "tcp".to_string(),
//!         vec![Element::bare("PING"), Element::bare("MERGE3"), Element::bare("FD_SOCK")],
//!     )],
//! );
//!
//! let mut task = MigrationTask::from_config(&config);
//! let result = task.run(&store, &handle).await?;
//! assert_eq!(result.status(), TaskStatus::Success);
//! assert_eq!(
//!     store.element_names(&handle, "tcp").unwrap(),
//!     ["PING", "MERGE2", "VERIFY_SUSPECT"]
//! );
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod document;
pub mod memory;
pub mod server;
pub mod state;
pub mod store;
pub mod task;

// Re-exports for convenience
pub use config::{ConfigError, MigrationConfig, DEFAULT_TASK_NAME};
pub use document::{DocumentError, DocumentFormat, SubtreeDocument};
pub use memory::MemoryStore;
pub use server::{ProductInfo, Server, ServerError, StandaloneServer};
pub use state::{allowed_transitions, validate_transition, IllegalTransition, TaskState};
pub use store::{ConfigStore, StoreError, SubtreeHandle};
pub use task::{
    GroupChange, MigrationPlan, MigrationSummary, MigrationTask, TaskError, TaskResult,
    TaskResultBuilder, TaskStatus,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running migrations
    pub use crate::{
        ConfigStore, MemoryStore, MigrationConfig, MigrationTask, StoreError, SubtreeHandle,
        TaskError, TaskResult, TaskState, TaskStatus,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use cfgmig_model::Element;
    use cfgmig_reconcile::OperationSequence;

    #[tokio::test]
    async fn document_in_migrated_document_out() {
        let config = MigrationConfig::new()
            .with_operations(OperationSequence::new().replace("MERGE3", "MERGE2"));
        let handle = config.handle();

        let store = MemoryStore::new();
        store.import(
            &handle,
            &SubtreeDocument::from_yaml(
                "stack:\n  tcp:\n    protocol:\n      PING: {}\n      MERGE3: {}\n",
            )
            .unwrap(),
        );

        let result = MigrationTask::from_config(&config)
            .run(&store, &handle)
            .await
            .unwrap();
        assert_eq!(result.status(), TaskStatus::Success);

        let exported = store.export(&handle).unwrap();
        let groups = exported.groups("stack", "protocol");
        let names: Vec<_> = groups[0].1.iter().map(Element::name).collect();
        assert_eq!(names, vec!["PING", "MERGE2"]);
    }
}
