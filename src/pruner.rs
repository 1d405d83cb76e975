// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ownership pruner.
//!
//! Deletes provider records whose service is no longer live. A record is
//! only ever considered when its name carries a `TXT` ownership marker with
//! this instance's `owner=<owner>` token; everything else in the zone is
//! left alone.
//!
//! Nothing is pruned until the state is synced: before the first complete
//! inventory an empty state cannot tell a departed service from a live one.
//!
//! One prune cycle holds the state write lock from start to finish:
//!
//! 1. **Collect** - read every configured zone and group the owned records
//!    by relative name. Address rows that share a name are folded back into
//!    one comma-joined record, the way they were written.
//! 2. **Identify** - decode each group's marker into `namespace_service`. A
//!    group is orphaned iff that key is absent from state.
//! 3. **Delete** - one provider delete per orphaned group. Failures are
//!    logged and left for the next cycle.

use crate::constants::ADDRESS_SEPARATOR;
use crate::errors::SyncError;
use crate::metrics;
use crate::provider::DnsProvider;
use crate::record::{relative_name, OwnershipMarker, Record, RecordGroup, RecordType};
use crate::state::{PruneGuard, StateStore};
use crate::tags::ensure_fqdn;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Worker name used in logs and metric labels
pub const PRUNE_WORKER: &str = "prune";

/// Outcome counts of one prune cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PruneSummary {
    /// Record groups carrying this owner's marker
    pub owned: usize,
    /// Groups whose service is not live
    pub orphaned: usize,
    /// Orphaned groups deleted
    pub deleted: usize,
    /// Orphaned groups whose delete failed
    pub failed: usize,
    /// Cycle skipped because the state was not yet synced
    pub skipped: bool,
}

/// Removes records of services that are no longer live.
pub struct Pruner {
    provider: Arc<dyn DnsProvider>,
    state: StateStore,
    domains: Vec<String>,
    owner: String,
}

impl Pruner {
    #[must_use]
    pub fn new(
        provider: Arc<dyn DnsProvider>,
        state: StateStore,
        domains: Vec<String>,
        owner: String,
    ) -> Self {
        Self {
            provider,
            state,
            domains,
            owner,
        }
    }

    /// Run one prune and record metrics.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ProviderRead`] if a zone cannot be read.
    pub async fn run_cycle(&self) -> Result<PruneSummary, SyncError> {
        let start = Instant::now();

        match self.prune().await {
            Ok(summary) => {
                metrics::record_cycle_success(PRUNE_WORKER, start.elapsed());
                info!(
                    owned = summary.owned,
                    orphaned = summary.orphaned,
                    deleted = summary.deleted,
                    failed = summary.failed,
                    skipped = summary.skipped,
                    elapsed = ?start.elapsed(),
                    "Prune cycle complete"
                );
                Ok(summary)
            }
            Err(e) => {
                metrics::record_error(PRUNE_WORKER, e.reason());
                metrics::record_cycle_error(PRUNE_WORKER, start.elapsed());
                Err(e)
            }
        }
    }

    /// Collect, identify and delete orphaned record groups.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ProviderRead`] if a zone cannot be read. Nothing
    /// is deleted in that case.
    pub async fn prune(&self) -> Result<PruneSummary, SyncError> {
        let guard = self.state.prune_guard().await;
        if !guard.is_synced() {
            info!("State not yet synced with the cluster, skipping prune");
            return Ok(PruneSummary {
                skipped: true,
                ..PruneSummary::default()
            });
        }
        debug!(tracked = guard.len(), "Starting prune of DNS records");

        let groups = self.collect().await?;
        let orphans = identify_orphans(&groups, &self.owner, &guard);

        let mut summary = PruneSummary {
            owned: groups.len(),
            orphaned: orphans.len(),
            ..PruneSummary::default()
        };

        for group in orphans {
            match self.provider.delete_records(&group.zone, &group.records).await {
                Ok(_) => {
                    metrics::record_records_deleted(&group.zone, group.records.len());
                    info!(
                        zone = %group.zone,
                        record = %group.name,
                        count = group.records.len(),
                        "Deleted orphaned records"
                    );
                    summary.deleted += 1;
                }
                Err(source) => {
                    let err = SyncError::ProviderDelete {
                        name: group.name.clone(),
                        zone: group.zone.clone(),
                        source,
                    };
                    error!(zone = %group.zone, record = %group.name, error = %err, "Failed to delete records");
                    metrics::record_error(PRUNE_WORKER, err.reason());
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Read every configured zone and keep the owned record groups.
    async fn collect(&self) -> Result<Vec<RecordGroup>, SyncError> {
        let mut groups = Vec::new();

        for domain in &self.domains {
            let zone = ensure_fqdn(domain);
            let records = self
                .provider
                .get_records(&zone)
                .await
                .map_err(|source| SyncError::ProviderRead {
                    zone: zone.clone(),
                    source,
                })?;

            let owned = group_owned_records(&zone, records, &self.owner);
            debug!(zone = %zone, groups = owned.len(), "Collected owned records");
            groups.extend(owned);
        }

        Ok(groups)
    }
}

/// Group the records of one zone that belong to `owner`.
///
/// A name is owned when it holds a `TXT` record carrying `owner=<owner>`.
/// For an owned name, address records are kept (rows of the same type fold
/// into one comma-joined record, the first row's TTL wins) together with the
/// owned `TXT` records. Foreign `TXT` records at the same name are never
/// included.
#[must_use]
pub fn group_owned_records(zone: &str, records: Vec<Record>, owner: &str) -> Vec<RecordGroup> {
    let records: Vec<Record> = records
        .into_iter()
        .map(|mut r| {
            r.name = relative_name(&r.name, zone);
            r
        })
        .collect();

    let owned_names: HashSet<String> = records
        .iter()
        .filter(|r| r.record_type == RecordType::TXT && OwnershipMarker::is_owned_by(&r.value, owner))
        .map(|r| r.name.clone())
        .collect();

    let mut groups: Vec<RecordGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        if !owned_names.contains(&record.name) {
            continue;
        }
        let keep = match &record.record_type {
            RecordType::A | RecordType::AAAA => true,
            RecordType::TXT => OwnershipMarker::is_owned_by(&record.value, owner),
            RecordType::Other(_) => false,
        };
        if !keep {
            continue;
        }

        let slot = *index.entry(record.name.clone()).or_insert_with(|| {
            groups.push(RecordGroup {
                name: record.name.clone(),
                zone: zone.to_string(),
                records: Vec::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];

        if record.record_type.is_address() {
            if let Some(existing) = group
                .records
                .iter_mut()
                .find(|r| r.record_type == record.record_type)
            {
                existing.value.push(ADDRESS_SEPARATOR);
                existing.value.push_str(&record.value);
                continue;
            }
        }
        group.records.push(record);
    }

    groups
}

/// Select the groups whose service is not live.
///
/// Groups whose marker cannot be decoded are left alone.
#[must_use]
pub fn identify_orphans<'a>(
    groups: &'a [RecordGroup],
    owner: &str,
    live: &PruneGuard<'_>,
) -> Vec<&'a RecordGroup> {
    groups
        .iter()
        .filter(|group| match group.ownership_marker(owner) {
            Some(marker) => {
                let key = marker.identity_key();
                let orphaned = !live.contains(&key);
                if orphaned {
                    debug!(zone = %group.zone, record = %group.name, service = %key, "Identified orphaned records");
                }
                orphaned
            }
            None => {
                warn!(
                    zone = %group.zone,
                    record = %group.name,
                    "Owned TXT record could not be decoded, leaving records in place"
                );
                false
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "pruner_tests.rs"]
mod pruner_tests;
