// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service inventory: a snapshot of the live, DNS-tagged cluster services.

use super::ClusterClient;
use crate::constants::ALL_NAMESPACES;
use crate::errors::ClusterError;
use crate::service::ServiceDescriptor;
use crate::tags::has_hostname_tag;
use std::collections::HashMap;
use tracing::debug;

/// Service inventory keyed by identity key (`<namespace>_<name>`).
pub type Inventory = HashMap<String, ServiceDescriptor>;

/// Build the current service inventory.
///
/// Lists services in every namespace and fetches the instances of each. A
/// service is included iff it has at least one instance and its first
/// instance carries a hostname tag. Addresses are deduplicated across
/// instances.
///
/// # Errors
///
/// Any cluster API error aborts the whole fetch. Callers skip the cycle and
/// leave their state untouched.
pub async fn fetch_inventory(client: &dyn ClusterClient) -> Result<Inventory, ClusterError> {
    let entries = client.list_services(ALL_NAMESPACES).await?;
    let mut inventory = Inventory::with_capacity(entries.len());

    for entry in entries {
        debug!(
            service = %entry.service_name,
            namespace = %entry.namespace,
            "Fetching service instances"
        );
        let instances = client
            .service_instances(&entry.service_name, &entry.namespace)
            .await?;

        let Some(first) = instances.first() else {
            continue;
        };
        if first.tags.is_empty() {
            continue;
        }
        if !has_hostname_tag(&first.tags) {
            debug!(
                service = %entry.service_name,
                namespace = %entry.namespace,
                "Hostname tag not found, ignoring service"
            );
            continue;
        }

        let name = non_empty_or(&first.service_name, &entry.service_name);
        let namespace = non_empty_or(&first.namespace, &entry.namespace);
        let mut descriptor =
            ServiceDescriptor::new(name, namespace, first.job_id.clone(), first.tags.clone());
        for instance in &instances {
            if !instance.address.is_empty() {
                descriptor.add_address(instance.address.clone());
            }
        }

        inventory.insert(descriptor.identity_key(), descriptor);
    }

    debug!(count = inventory.len(), "Built service inventory");
    Ok(inventory)
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
#[path = "inventory_tests.rs"]
mod inventory_tests;
