//! Testing utilities for the cfgmig workspace
//!
//! Shared fixtures: protocol stacks, element builders and seeded stores.

#![allow(missing_docs)]

use cfgmig_core::{MemoryStore, MigrationConfig, SubtreeHandle};
use cfgmig_model::{Element, Payload, ResourceAddress};
use cfgmig_reconcile::OperationSequence;
use serde_json::Value as JsonValue;

pub fn element(name: &str) -> Element {
    Element::bare(name)
}

pub fn element_with(name: &str, payload: JsonValue) -> Element {
    Element::new(name, Payload::new(payload))
}

pub fn elements(names: &[&str]) -> Vec<Element> {
    names.iter().map(|name| element(name)).collect()
}

pub fn group(name: &str, names: &[&str]) -> (String, Vec<Element>) {
    (name.to_string(), elements(names))
}

pub fn names(elements: &[Element]) -> Vec<String> {
    elements.iter().map(|element| element.name().to_string()).collect()
}

/// `tcp = [PING, MERGE3, FD_SOCK]`
pub fn tcp_stack() -> (String, Vec<Element>) {
    group("tcp", &["PING", "MERGE3", "FD_SOCK"])
}

pub fn jgroups() -> ResourceAddress {
    ResourceAddress::single("subsystem", "jgroups")
}

pub fn jgroups_handle() -> SubtreeHandle {
    SubtreeHandle::new(jgroups(), "stack", "protocol")
}

/// `[replace(MERGE3, MERGE2), add(VERIFY_SUSPECT), remove(FD_SOCK)]`
pub fn protocol_migration() -> OperationSequence {
    OperationSequence::new()
        .replace("MERGE3", "MERGE2")
        .add("VERIFY_SUSPECT")
        .remove("FD_SOCK")
}

pub fn protocol_config() -> MigrationConfig {
    MigrationConfig::new()
        .with_subtree(jgroups())
        .with_operations(protocol_migration())
}

pub fn seeded_store(groups: Vec<(String, Vec<Element>)>) -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_subtree(&jgroups_handle(), groups);
    store
}
