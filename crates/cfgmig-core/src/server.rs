//! Server descriptors
//!
//! A [`Server`] is a migration source or target. A target knows which
//! source products it can migrate from and builds the task for them.

use crate::config::MigrationConfig;
use crate::task::MigrationTask;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

/// Product name and version of a server installation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductInfo {
    name: String,
    version: String,
}

impl ProductInfo {
    /// Create product info
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Product name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Product version
    #[inline]
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl Display for ProductInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// Errors from server descriptors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServerError {
    /// Target cannot migrate from this source
    #[error("{target} cannot migrate from {origin}")]
    UnsupportedSource {
        /// Server asked to migrate
        target: ProductInfo,
        /// Server to migrate from
        origin: ProductInfo,
    },
}

/// A migration source or target
pub trait Server: Send + Sync {
    /// Installation directory
    fn base_dir(&self) -> &Path;

    /// Product name and version
    fn product_info(&self) -> &ProductInfo;

    /// Task migrating configuration from `source` into this server
    ///
    /// # Errors
    /// Returns [`ServerError::UnsupportedSource`] if `source` is not a
    /// product this server migrates from
    fn migration_task(&self, source: &dyn Server) -> Result<MigrationTask, ServerError>;
}

/// Standalone server installation
///
/// Holds one migration configuration per supported source product name.
#[derive(Debug, Clone)]
pub struct StandaloneServer {
    base_dir: PathBuf,
    product: ProductInfo,
    migrations: IndexMap<String, MigrationConfig>,
}

impl StandaloneServer {
    /// Create a server that migrates from nothing yet
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>, product: ProductInfo) -> Self {
        Self {
            base_dir: base_dir.into(),
            product,
            migrations: IndexMap::new(),
        }
    }

    /// Accept `source_product` as a migration source
    #[must_use]
    pub fn with_migration(mut self, source_product: impl Into<String>, config: MigrationConfig) -> Self {
        self.migrations.insert(source_product.into(), config);
        self
    }

    /// Source product names this server migrates from
    pub fn supported_sources(&self) -> impl Iterator<Item = &str> {
        self.migrations.keys().map(String::as_str)
    }

    /// Migration configuration for a source
    ///
    /// # Errors
    /// Returns [`ServerError::UnsupportedSource`] for unknown products
    pub fn migration_config(&self, source: &dyn Server) -> Result<&MigrationConfig, ServerError> {
        self.migrations
            .get(source.product_info().name())
            .ok_or_else(|| ServerError::UnsupportedSource {
                target: self.product.clone(),
                origin: source.product_info().clone(),
            })
    }
}

impl Server for StandaloneServer {
    fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn product_info(&self) -> &ProductInfo {
        &self.product
    }

    fn migration_task(&self, source: &dyn Server) -> Result<MigrationTask, ServerError> {
        let config = self.migration_config(source)?;
        tracing::debug!(
            source = %source.product_info(),
            target = %self.product,
            task = %config.task_name,
            "selected migration task"
        );
        Ok(MigrationTask::from_config(config))
    }
}
