// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory fakes for the cluster and DNS provider collaborators.

use crate::cluster::{ClusterClient, ServiceInstance, ServiceListEntry};
use crate::errors::{ClusterError, ProviderError};
use crate::record::{Record, RecordType};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Fake Cluster
// ============================================================================

/// Cluster whose services are set by the test.
#[derive(Default)]
pub struct FakeCluster {
    services: Mutex<Vec<(ServiceListEntry, Vec<ServiceInstance>)>>,
    fail: AtomicBool,
}

impl FakeCluster {
    /// Register a service with one instance per address.
    pub fn add_service(&self, name: &str, namespace: &str, addresses: &[&str], tags: &[&str]) {
        let instances = addresses
            .iter()
            .map(|address| ServiceInstance {
                service_name: name.to_string(),
                namespace: namespace.to_string(),
                job_id: format!("{name}-job"),
                address: (*address).to_string(),
                tags: tags.iter().map(|t| (*t).to_string()).collect(),
            })
            .collect();
        let entry = ServiceListEntry {
            namespace: namespace.to_string(),
            service_name: name.to_string(),
        };

        let mut services = self.services.lock().unwrap();
        services.retain(|(e, _)| e != &entry);
        services.push((entry, instances));
    }

    pub fn remove_service(&self, name: &str, namespace: &str) {
        self.services
            .lock()
            .unwrap()
            .retain(|(e, _)| !(e.service_name == name && e.namespace == namespace));
    }

    /// Make every call fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    fn outage(&self) -> Result<(), ClusterError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ClusterError::Request {
                url: "http://fake-nomad/v1/services".to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn list_services(&self, _namespace: &str) -> Result<Vec<ServiceListEntry>, ClusterError> {
        self.outage()?;
        Ok(self
            .services
            .lock()
            .unwrap()
            .iter()
            .map(|(e, _)| e.clone())
            .collect())
    }

    async fn service_instances(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Vec<ServiceInstance>, ClusterError> {
        self.outage()?;
        Ok(self
            .services
            .lock()
            .unwrap()
            .iter()
            .find(|(e, _)| e.service_name == name && e.namespace == namespace)
            .map(|(_, instances)| instances.clone())
            .unwrap_or_default())
    }
}

// ============================================================================
// Fake Provider
// ============================================================================

/// Provider holding records per zone in memory and counting calls.
#[derive(Default)]
pub struct FakeProvider {
    zones: Mutex<HashMap<String, Vec<Record>>>,
    failing_names: Mutex<HashSet<String>>,
    fail_reads: AtomicBool,
    pub set_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub append_calls: AtomicUsize,
}

impl FakeProvider {
    /// Put records straight into a zone, bypassing call counters.
    pub fn seed(&self, zone: &str, records: Vec<Record>) {
        self.zones
            .lock()
            .unwrap()
            .entry(zone.to_string())
            .or_default()
            .extend(records);
    }

    pub fn records(&self, zone: &str) -> Vec<Record> {
        self.zones
            .lock()
            .unwrap()
            .get(zone)
            .cloned()
            .unwrap_or_default()
    }

    /// Writes and deletes touching this relative name fail.
    pub fn fail_name(&self, name: &str) {
        self.failing_names.lock().unwrap().insert(name.to_string());
    }

    pub fn set_read_failure(&self, failing: bool) {
        self.fail_reads.store(failing, Ordering::SeqCst);
    }

    fn check_names(&self, records: &[Record]) -> Result<(), ProviderError> {
        let failing = self.failing_names.lock().unwrap();
        match records.iter().find(|r| failing.contains(&r.name)) {
            Some(record) => Err(ProviderError::Http {
                endpoint: "https://fake-provider".to_string(),
                status_code: 500,
                reason: format!("injected failure for {}", record.name),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl crate::provider::DnsProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn get_records(&self, zone: &str) -> Result<Vec<Record>, ProviderError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ProviderError::Connection {
                endpoint: "https://fake-provider".to_string(),
                reason: "timed out".to_string(),
            });
        }
        Ok(self.records(zone))
    }

    async fn set_records(&self, zone: &str, records: &[Record]) -> Result<Vec<Record>, ProviderError> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.check_names(records)?;

        let mut zones = self.zones.lock().unwrap();
        let existing = zones.entry(zone.to_string()).or_default();
        for record in records {
            existing.retain(|r| !(r.name == record.name && r.record_type == record.record_type));
            existing.push(record.clone());
        }
        Ok(records.to_vec())
    }

    async fn delete_records(
        &self,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_names(records)?;

        let mut zones = self.zones.lock().unwrap();
        let existing = zones.entry(zone.to_string()).or_default();
        let mut deleted = Vec::new();
        for record in records {
            let values = record.split_values();
            existing.retain(|r| {
                let matches = r.name == record.name
                    && r.record_type == record.record_type
                    && (r.value == record.value || values.contains(&r.value));
                if matches {
                    deleted.push(r.clone());
                }
                !matches
            });
        }
        Ok(deleted)
    }

    async fn append_records(
        &self,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        self.check_names(records)?;
        self.seed(zone, records.to_vec());
        Ok(records.to_vec())
    }
}

/// Shorthand for a record with a 30 second TTL.
pub fn record(record_type: RecordType, name: &str, value: &str) -> Record {
    Record::new(record_type, name, value, Duration::from_secs(30))
}

/// Ownership marker value for `owner`.
pub fn marker(service: &str, namespace: &str, owner: &str) -> String {
    crate::record::OwnershipMarker::new(service, namespace, owner).to_string()
}
