//! Migration configuration
//!
//! Describes one migration: which subtree to visit, how its children are
//! keyed, and which edit operations to apply to every group. Loaded from
//! YAML or JSON.

use crate::document::{self, DocumentError};
use crate::store::SubtreeHandle;
use cfgmig_model::ResourceAddress;
use cfgmig_reconcile::OperationSequence;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default task name
pub const DEFAULT_TASK_NAME: &str = "update-protocols";

/// Errors loading or validating a [`MigrationConfig`]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read or parsed
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Required text field is empty
    #[error("configuration field `{0}` must not be empty")]
    EmptyField(&'static str),

    /// Groups and elements must be keyed differently
    #[error("group key and element key are both `{0}`")]
    KeyClash(String),
}

/// One migration, as loaded from a configuration file
///
/// # Example
///
/// ```rust
/// use cfgmig_core::MigrationConfig;
///
/// let config = MigrationConfig::from_yaml(
///     "subtree: /subsystem=jgroups\n\
///      operations:\n\
///      - replace: {old_name: MERGE3, new_name: MERGE2}\n\
///      - add: {name: VERIFY_SUSPECT}\n",
/// )
/// .unwrap();
/// assert_eq!(config.task_name, "update-protocols");
/// assert_eq!(config.operations.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    /// Name reported by the task
    pub task_name: String,
    /// Subtree whose groups are migrated
    pub subtree: ResourceAddress,
    /// Key naming groups below the subtree
    pub group_key: String,
    /// Key naming elements below each group
    pub element_key: String,
    /// Prefix of the result attributes (`{label}-added`, `{label}-removed`)
    pub report_label: String,
    /// Edits applied, in order, to every group
    pub operations: OperationSequence,
}

impl MigrationConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With task name
    #[inline]
    #[must_use]
    pub fn with_task_name(mut self, name: impl Into<String>) -> Self {
        self.task_name = name.into();
        self
    }

    /// With subtree address
    #[inline]
    #[must_use]
    pub fn with_subtree(mut self, subtree: ResourceAddress) -> Self {
        self.subtree = subtree;
        self
    }

    /// With group and element keys
    #[inline]
    #[must_use]
    pub fn with_keys(mut self, group_key: impl Into<String>, element_key: impl Into<String>) -> Self {
        self.group_key = group_key.into();
        self.element_key = element_key.into();
        self
    }

    /// With report label
    #[inline]
    #[must_use]
    pub fn with_report_label(mut self, label: impl Into<String>) -> Self {
        self.report_label = label.into();
        self
    }

    /// With operations
    #[inline]
    #[must_use]
    pub fn with_operations(mut self, operations: OperationSequence) -> Self {
        self.operations = operations;
        self
    }

    /// Handle for the configured subtree
    #[must_use]
    pub fn handle(&self) -> SubtreeHandle {
        SubtreeHandle::new(self.subtree.clone(), &self.group_key, &self.element_key)
    }

    /// Check the configuration is usable
    ///
    /// # Errors
    /// Returns [`ConfigError`] for empty names or identical keys
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("task_name", &self.task_name),
            ("group_key", &self.group_key),
            ("element_key", &self.element_key),
            ("report_label", &self.report_label),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyField(field));
            }
        }
        if self.group_key == self.element_key {
            return Err(ConfigError::KeyClash(self.group_key.clone()));
        }
        Ok(())
    }

    /// Parse and validate YAML text
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the text does not parse or validate
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = document::DocumentFormat::Yaml.parse(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a file, YAML or JSON by extension
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file cannot be read, parsed or validated
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = document::read_file(path.as_ref())?;
        config.validate()?;
        tracing::debug!(
            path = %path.as_ref().display(),
            task = %config.task_name,
            operations = config.operations.len(),
            "loaded migration configuration"
        );
        Ok(config)
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            task_name: DEFAULT_TASK_NAME.to_string(),
            subtree: ResourceAddress::single("subsystem", "jgroups"),
            group_key: "stack".to_string(),
            element_key: "protocol".to_string(),
            report_label: "protocols".to_string(),
            operations: OperationSequence::new(),
        }
    }
}
