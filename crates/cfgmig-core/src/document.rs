//! Subtree documents
//!
//! A subtree's groups serialized as YAML or JSON, keeping insertion order:
//!
//! ```yaml
//! stack:
//!   tcp:
//!     protocol:
//!       PING: {}
//!       MERGE3: {}
//! ```

use cfgmig_model::{Element, Payload};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors reading or writing documents
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// File could not be read or written
    #[error("{path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// YAML parse or render failure
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parse or render failure
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// `.yaml` / `.yml`, and anything unrecognized
    Yaml,
    /// `.json`
    Json,
}

impl DocumentFormat {
    /// Pick the format for a path
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }

    /// Parse text in this format
    ///
    /// # Errors
    /// Returns [`DocumentError::Yaml`] or [`DocumentError::Json`] if the text
    /// is malformed or does not match `T`
    pub fn parse<T: DeserializeOwned>(self, text: &str) -> Result<T, DocumentError> {
        Ok(match self {
            Self::Yaml => serde_yaml::from_str(text)?,
            Self::Json => serde_json::from_str(text)?,
        })
    }

    /// Render a value in this format
    ///
    /// # Errors
    /// Returns [`DocumentError::Yaml`] or [`DocumentError::Json`] if `value`
    /// cannot be serialized
    pub fn render<T: Serialize>(self, value: &T) -> Result<String, DocumentError> {
        Ok(match self {
            Self::Yaml => serde_yaml::to_string(value)?,
            Self::Json => {
                let mut text = serde_json::to_string_pretty(value)?;
                text.push('\n');
                text
            }
        })
    }
}

/// Read and parse a file, format chosen by extension
///
/// # Errors
/// Returns [`DocumentError::Io`] if the file cannot be read, or a parse
/// error as for [`DocumentFormat::parse`]
pub fn read_file<T: DeserializeOwned>(path: &Path) -> Result<T, DocumentError> {
    let text = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    DocumentFormat::from_path(path).parse(&text)
}

/// Render and write a file, format chosen by extension
///
/// # Errors
/// Returns a render error as for [`DocumentFormat::render`], or
/// [`DocumentError::Io`] if the file cannot be written
pub fn write_file<T: Serialize>(path: &Path, value: &T) -> Result<(), DocumentError> {
    let text = DocumentFormat::from_path(path).render(value)?;
    std::fs::write(path, text).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })
}

type ElementMap = IndexMap<String, Payload>;
type GroupBody = IndexMap<String, ElementMap>;

/// Serialized form of one subtree
///
/// `group_key → group → element_key → element → payload`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubtreeDocument {
    children: IndexMap<String, IndexMap<String, GroupBody>>,
}

impl SubtreeDocument {
    /// Empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from ordered groups
    #[must_use]
    pub fn from_groups<I>(group_key: &str, element_key: &str, groups: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<Element>)>,
    {
        let mut document = Self::new();
        let bucket = document.children.entry(group_key.to_string()).or_default();
        for (group, elements) in groups {
            let mut body = GroupBody::new();
            let members = body.entry(element_key.to_string()).or_default();
            for element in elements {
                let (name, payload) = element.into_parts();
                members.insert(name, payload);
            }
            bucket.insert(group, body);
        }
        document
    }

    /// Ordered groups stored under `group_key`, elements under `element_key`
    ///
    /// A group without an `element_key` entry has no elements.
    #[must_use]
    pub fn groups(&self, group_key: &str, element_key: &str) -> Vec<(String, Vec<Element>)> {
        self.children
            .get(group_key)
            .map(|bucket| {
                bucket
                    .iter()
                    .map(|(group, body)| {
                        let elements = body
                            .get(element_key)
                            .map(|members| {
                                members
                                    .iter()
                                    .map(|(name, payload)| Element::new(name.clone(), payload.clone()))
                                    .collect()
                            })
                            .unwrap_or_default();
                        (group.clone(), elements)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Parse YAML text
    ///
    /// # Errors
    /// Returns [`DocumentError::Yaml`] if the text is not a nested mapping
    pub fn from_yaml(text: &str) -> Result<Self, DocumentError> {
        DocumentFormat::Yaml.parse(text)
    }

    /// Parse JSON text
    ///
    /// # Errors
    /// Returns [`DocumentError::Json`] if the text is not a nested object
    pub fn from_json(text: &str) -> Result<Self, DocumentError> {
        DocumentFormat::Json.parse(text)
    }

    /// Render as YAML
    ///
    /// # Errors
    /// Returns [`DocumentError::Yaml`] if a payload cannot be rendered
    pub fn to_yaml(&self) -> Result<String, DocumentError> {
        DocumentFormat::Yaml.render(self)
    }

    /// Render as JSON
    ///
    /// # Errors
    /// Returns [`DocumentError::Json`] if a payload cannot be rendered
    pub fn to_json(&self) -> Result<String, DocumentError> {
        DocumentFormat::Json.render(self)
    }

    /// Load from a file
    ///
    /// # Errors
    /// Returns [`DocumentError::Io`] if the file cannot be read, or a parse
    /// error for its extension's format
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        read_file(path.as_ref())
    }

    /// Save to a file
    ///
    /// # Errors
    /// Returns [`DocumentError::Io`] if the file cannot be written
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        write_file(path.as_ref(), self)
    }

    /// Check if the document has no children at all
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
