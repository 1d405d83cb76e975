// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service descriptors built from the cluster inventory.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A live cluster service that carries DNS tags.
///
/// Rebuilt on every inventory cycle. Addresses are deduplicated and keep the
/// order in which they were first seen; comparisons between descriptors
/// ignore ordering entirely.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Service name
    pub name: String,
    /// Namespace the service is registered in
    pub namespace: String,
    /// Job that registered the service
    pub job: String,
    /// Backend addresses (deduplicated)
    pub addresses: Vec<String>,
    /// Raw service tags
    pub tags: Vec<String>,
}

impl ServiceDescriptor {
    /// Create a descriptor with no addresses.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        job: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            job: job.into(),
            addresses: Vec::new(),
            tags,
        }
    }

    /// Add an address unless it is already present.
    pub fn add_address(&mut self, address: impl Into<String>) {
        let address = address.into();
        if !self.addresses.contains(&address) {
            self.addresses.push(address);
        }
    }

    /// Identity key of this service: `<namespace>_<name>`.
    #[must_use]
    pub fn identity_key(&self) -> String {
        identity_key(&self.namespace, &self.name)
    }

    /// Returns true if `self` differs from the previously applied descriptor.
    ///
    /// Addresses and tags are compared as sets. The cluster API gives no
    /// ordering guarantee between polls.
    #[must_use]
    pub fn needs_update(&self, applied: &ServiceDescriptor) -> bool {
        !same_members(&self.addresses, &applied.addresses) || !same_members(&self.tags, &applied.tags)
    }
}

/// Build the identity key for a namespace and service name.
#[must_use]
pub fn identity_key(namespace: &str, name: &str) -> String {
    format!("{namespace}_{name}")
}

fn same_members(left: &[String], right: &[String]) -> bool {
    let left: HashSet<&str> = left.iter().map(String::as_str).collect();
    let right: HashSet<&str> = right.iter().map(String::as_str).collect();
    left == right
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod service_tests;
