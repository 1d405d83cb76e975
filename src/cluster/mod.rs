// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster (Nomad) collaborator.
//!
//! The reconciler only depends on the [`ClusterClient`] capability set.
//! [`NomadClient`] implements it over the Nomad HTTP API, and
//! [`fetch_inventory`] turns its answers into the service inventory.

pub mod inventory;
pub mod nomad;

pub use inventory::fetch_inventory;
pub use nomad::NomadClient;

use crate::errors::ClusterError;
use async_trait::async_trait;

/// One service name registered in one namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceListEntry {
    pub namespace: String,
    pub service_name: String,
}

/// One running registration of a service.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceInstance {
    pub service_name: String,
    pub namespace: String,
    pub job_id: String,
    pub address: String,
    pub tags: Vec<String>,
}

/// Read access to the services registered in a cluster.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// List service names in `namespace` (`*` for every namespace).
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError`] if the cluster API call fails.
    async fn list_services(&self, namespace: &str) -> Result<Vec<ServiceListEntry>, ClusterError>;

    /// List the running instances of one service.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError`] if the cluster API call fails.
    async fn service_instances(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Vec<ServiceInstance>, ClusterError>;
}
