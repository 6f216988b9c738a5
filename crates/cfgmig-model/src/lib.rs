//! cfgmig Model
//!
//! Data model shared by the reconciliation engine and the migration shell.
//!
//! # Core Concepts
//!
//! - [`Element`]: one named entry of an ordered group, with an opaque [`Payload`]
//! - [`GroupSnapshot`]: immutable baseline of one ordered group
//! - [`SubtreeSnapshot`]: every group under one configuration subtree
//! - [`ResourceAddress`]: hierarchical `key=value` addressing in the store
//!
//! # Example
//!
//! ```rust
//! use cfgmig_model::{Element, GroupSnapshot, ResourceAddress};
//!
//! let stack = GroupSnapshot::new("tcp", vec![Element::bare("PING"), Element::bare("MERGE3")]);
//! assert_eq!(stack.element_names().collect::<Vec<_>>(), ["PING", "MERGE3"]);
//!
//! let address = ResourceAddress::single("subsystem", "jgroups").append("stack", "tcp");
//! assert_eq!(address.to_string(), "/subsystem=jgroups/stack=tcp");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod address;
mod element;
mod group;

pub use address::{AddressElement, AddressError, ResourceAddress};
pub use element::{Element, Payload, PayloadError};
pub use group::{GroupSnapshot, SnapshotError, SubtreeSnapshot};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
