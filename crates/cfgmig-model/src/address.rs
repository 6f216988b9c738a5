//! Resource addresses for configuration stores
//!
//! Provides [`ResourceAddress`] for hierarchical addressing of resources
//! within a server's configuration model.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter, Write as _};
use std::str::FromStr;

/// One `key=value` step of a [`ResourceAddress`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddressElement {
    key: String,
    value: String,
}

impl AddressElement {
    /// Create new address element
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Resource type key (e.g. `stack`)
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Resource name (e.g. `tcp`)
    #[inline]
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Display for AddressElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_escaped(f, &self.key)?;
        f.write_char('=')?;
        write_escaped(f, &self.value)
    }
}

const ESCAPE: char = '\\';

/// Write `text` with every separator and backslash escaped
fn write_escaped(f: &mut Formatter<'_>, text: &str) -> fmt::Result {
    for c in text.chars() {
        if matches!(c, ESCAPE | '/' | '=') {
            f.write_char(ESCAPE)?;
        }
        f.write_char(c)?;
    }
    Ok(())
}

/// Byte offsets of every `separator` not preceded by an escape
fn unescaped_positions(text: &str, separator: char) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut escaped = false;
    for (index, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == ESCAPE {
            escaped = true;
        } else if c == separator {
            positions.push(index);
        }
    }
    positions
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == ESCAPE {
            out.push(chars.next().unwrap_or(ESCAPE));
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_element(segment: &str) -> Result<AddressElement, AddressError> {
    let split = unescaped_positions(segment, '=')
        .first()
        .copied()
        .ok_or_else(|| AddressError::MissingSeparator(segment.to_string()))?;
    let (key, value) = (&segment[..split], &segment[split + 1..]);
    if key.is_empty() || value.is_empty() {
        return Err(AddressError::EmptySegment(segment.to_string()));
    }
    Ok(AddressElement::new(unescape(key), unescape(value)))
}

/// Address of a resource within a configuration tree
///
/// An ordered list of `key=value` pairs, rendered the way management
/// consoles print them. A `/`, `=` or backslash inside a key or value is
/// written with a leading backslash.
///
/// # Examples
/// - `[(subsystem, jgroups)]` → `/subsystem=jgroups`
/// - `[(subsystem, jgroups), (stack, tcp), (protocol, PING)]` →
///   `/subsystem=jgroups/stack=tcp/protocol=PING`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceAddress(Vec<AddressElement>);

impl ResourceAddress {
    /// Create new address from elements
    #[inline]
    #[must_use]
    pub fn new(elements: Vec<AddressElement>) -> Self {
        Self(elements)
    }

    /// Address with a single element
    #[inline]
    #[must_use]
    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self(vec![AddressElement::new(key, value)])
    }

    /// Empty address (root of the model)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get address elements
    #[inline]
    #[must_use]
    pub fn elements(&self) -> &[AddressElement] {
        &self.0
    }

    /// Get number of elements
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if address is the root
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get parent address (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Get last element (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&AddressElement> {
        self.0.last()
    }

    /// Append a `key=value` element, returning new address
    #[inline]
    #[must_use]
    pub fn append(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(AddressElement::new(key, value));
        new
    }

    /// Check if this address is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0 == other.0[..self.0.len()]
    }

    /// Check if this address is a strict ancestor of another
    #[inline]
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && self.is_prefix_of(other)
    }

    /// Get relative address from ancestor
    ///
    /// # Errors
    /// Returns error if `self` is not below `ancestor`
    pub fn relative_to(&self, ancestor: &Self) -> Result<Self, AddressError> {
        if !ancestor.is_prefix_of(self) {
            return Err(AddressError::NotDescendant {
                address: self.to_string(),
                ancestor: ancestor.to_string(),
            });
        }
        Ok(Self(self.0[ancestor.0.len()..].to_vec()))
    }

    /// Iterator over elements from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &AddressElement> {
        self.0.iter()
    }
}

impl Display for ResourceAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for element in &self.0 {
            write!(f, "/{element}")?;
        }
        Ok(())
    }
}

impl FromStr for ResourceAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix('/').unwrap_or(trimmed);
        if body.is_empty() {
            return Ok(Self::root());
        }

        let mut elements = Vec::new();
        let mut start = 0;
        for end in unescaped_positions(body, '/') {
            elements.push(parse_element(&body[start..end])?);
            start = end + 1;
        }
        elements.push(parse_element(&body[start..])?);

        Ok(Self(elements))
    }
}

impl TryFrom<String> for ResourceAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceAddress> for String {
    fn from(address: ResourceAddress) -> Self {
        address.to_string()
    }
}

impl From<Vec<AddressElement>> for ResourceAddress {
    fn from(elements: Vec<AddressElement>) -> Self {
        Self(elements)
    }
}

impl Default for ResourceAddress {
    fn default() -> Self {
        Self::root()
    }
}

/// Errors related to resource addresses
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    /// Segment without `=`
    #[error("address segment '{0}' is not of the form key=value")]
    MissingSeparator(String),

    /// Empty key or value
    #[error("address segment '{0}' has an empty key or value")]
    EmptySegment(String),

    /// Not a descendant address
    #[error("address '{address}' is not below '{ancestor}'")]
    NotDescendant { address: String, ancestor: String },
}
