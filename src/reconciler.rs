// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Update engine.
//!
//! One reconciliation cycle:
//!
//! 1. **Fetch** - build the service inventory from the cluster. A cluster
//!    error skips the cycle and leaves state untouched.
//! 2. **Diff** - under the state read lock, select services that are new or
//!    whose address set or tag set changed. Ordering is ignored.
//! 3. **Write** - synthesize and push the record pair of every selected
//!    service. State is only updated after the provider accepted the write,
//!    so failed services are retried on the next cycle. One failing service
//!    never blocks the others.
//! 4. **Shrink** - drop state entries for services that left the inventory,
//!    which lets the pruner delete their records.
//!
//! Unchanged services cost no provider calls.

use crate::cluster::inventory::Inventory;
use crate::cluster::{fetch_inventory, ClusterClient};
use crate::errors::SyncError;
use crate::metrics;
use crate::provider::DnsProvider;
use crate::record::synthesize;
use crate::service::ServiceDescriptor;
use crate::state::StateStore;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Worker name used in logs and metric labels
pub const UPDATE_WORKER: &str = "update";

/// Outcome counts of one reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Services already applied with the same addresses and tags
    pub unchanged: usize,
    /// Services written to the provider and committed to state
    pub updated: usize,
    /// Services whose provider write failed
    pub failed: usize,
    /// Services whose tags could not be turned into records
    pub skipped: usize,
    /// State entries dropped because the service left the inventory
    pub removed: usize,
}

/// Pushes changed services to the DNS provider.
pub struct Reconciler {
    provider: Arc<dyn DnsProvider>,
    cluster: Arc<dyn ClusterClient>,
    state: StateStore,
    domains: Vec<String>,
    owner: String,
}

impl Reconciler {
    #[must_use]
    pub fn new(
        provider: Arc<dyn DnsProvider>,
        cluster: Arc<dyn ClusterClient>,
        state: StateStore,
        domains: Vec<String>,
        owner: String,
    ) -> Self {
        Self {
            provider,
            cluster,
            state,
            domains,
            owner,
        }
    }

    /// Fetch the inventory and reconcile it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ClusterFetch`] if the inventory cannot be built.
    /// Per-service failures are counted in the summary, not returned.
    pub async fn run_cycle(&self) -> Result<ReconcileSummary, SyncError> {
        let start = Instant::now();

        let inventory = match fetch_inventory(self.cluster.as_ref()).await {
            Ok(inventory) => inventory,
            Err(e) => {
                let err = SyncError::from(e);
                metrics::record_error(UPDATE_WORKER, err.reason());
                metrics::record_cycle_error(UPDATE_WORKER, start.elapsed());
                return Err(err);
            }
        };

        let summary = self.reconcile(&inventory).await;
        metrics::record_cycle_success(UPDATE_WORKER, start.elapsed());

        info!(
            services = inventory.len(),
            unchanged = summary.unchanged,
            updated = summary.updated,
            failed = summary.failed,
            skipped = summary.skipped,
            removed = summary.removed,
            elapsed = ?start.elapsed(),
            "Reconciliation cycle complete"
        );
        Ok(summary)
    }

    /// Reconcile one inventory snapshot against the applied state.
    ///
    /// Marks the state synced once the whole snapshot has been applied.
    pub async fn reconcile(&self, inventory: &Inventory) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();

        let pending: Vec<&ServiceDescriptor> = {
            let state = self.state.read().await;
            inventory
                .iter()
                .filter(|(key, service)| match state.get(key) {
                    Some(applied) if !service.needs_update(applied) => {
                        summary.unchanged += 1;
                        false
                    }
                    _ => true,
                })
                .map(|(_, service)| service)
                .collect()
        };

        debug!(
            pending = pending.len(),
            unchanged = summary.unchanged,
            "Computed services requiring update"
        );

        for service in pending {
            match self.apply(service).await {
                Ok(()) => summary.updated += 1,
                Err(e @ SyncError::AnnotationParse { .. }) => {
                    warn!(
                        service = %service.name,
                        namespace = %service.namespace,
                        error = %e,
                        "Skipping service with invalid tags"
                    );
                    metrics::record_error(UPDATE_WORKER, e.reason());
                    summary.skipped += 1;
                }
                Err(e) => {
                    error!(
                        service = %service.name,
                        namespace = %service.namespace,
                        error = %e,
                        "Failed to update DNS records"
                    );
                    metrics::record_error(UPDATE_WORKER, e.reason());
                    summary.failed += 1;
                }
            }
        }

        let live: HashSet<String> = inventory.keys().cloned().collect();
        let removed = self.state.retain_keys(&live).await;
        for key in &removed {
            info!(service = %key, "Service left the inventory, dropped from state");
        }
        summary.removed = removed.len();
        self.state.mark_synced();

        metrics::set_tracked_services(self.state.len().await);
        summary
    }

    /// Write one service and commit it on success.
    async fn apply(&self, service: &ServiceDescriptor) -> Result<(), SyncError> {
        let key = service.identity_key();

        let record_set = synthesize(service, &self.domains, &self.owner).map_err(|source| {
            SyncError::AnnotationParse {
                service: key.clone(),
                source,
            }
        })?;

        self.provider
            .set_records(&record_set.zone, &record_set.records)
            .await
            .map_err(|source| SyncError::ProviderWrite {
                service: key.clone(),
                zone: record_set.zone.clone(),
                source,
            })?;

        metrics::record_records_written(&record_set.zone, record_set.records.len());
        info!(
            service = %service.name,
            namespace = %service.namespace,
            zone = %record_set.zone,
            record = record_set.records.first().map_or("", |r| r.name.as_str()),
            addresses = ?service.addresses,
            "Updated DNS records"
        );

        self.state.commit(service.clone()).await;
        Ok(())
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod reconciler_tests;
