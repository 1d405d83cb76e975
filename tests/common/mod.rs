// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common test utilities for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use nomad_external_dns::config::{CloudflareConfig, NomadConfig};
use nomad_external_dns::errors::ProviderError;
use nomad_external_dns::provider::DnsProvider;
use nomad_external_dns::record::Record;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const DOMAIN: &str = "svc.internal";
pub const ZONE: &str = "svc.internal.";
pub const OWNER: &str = "integration-owner";

pub fn domains() -> Vec<String> {
    vec![DOMAIN.to_string()]
}

pub fn nomad_config(server: &MockServer) -> NomadConfig {
    NomadConfig {
        address: Some(server.uri()),
        token: None,
        region: None,
    }
}

pub fn cloudflare_config(server: &MockServer) -> CloudflareConfig {
    CloudflareConfig {
        api_token: Some("cf-test-token".to_string()),
        endpoint: Some(server.uri()),
    }
}

// ============================================================================
// Nomad API mocks
// ============================================================================

/// One `/v1/service/<name>` registration.
pub fn registration(name: &str, namespace: &str, address: &str, tags: &[&str]) -> Value {
    json!({
        "ID": format!("_nomad-task-{name}-{address}"),
        "ServiceName": name,
        "Namespace": namespace,
        "NodeID": "node-1",
        "Datacenter": "dc1",
        "JobID": format!("{name}-job"),
        "AllocID": "alloc-1",
        "Tags": tags,
        "Address": address,
        "Port": 6379,
    })
}

/// Mount `GET /v1/services?namespace=*` answering with `(namespace, services)` pairs.
pub async fn mount_service_list(server: &MockServer, namespaces: &[(&str, &[&str])]) {
    let body: Vec<Value> = namespaces
        .iter()
        .map(|(namespace, services)| {
            json!({
                "Namespace": namespace,
                "Services": services
                    .iter()
                    .map(|s| json!({ "ServiceName": s, "Tags": [] }))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/v1/services"))
        .and(query_param("namespace", "*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount `GET /v1/service/<name>?namespace=<namespace>`.
pub async fn mount_service(server: &MockServer, name: &str, namespace: &str, registrations: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/service/{name}")))
        .and(query_param("namespace", namespace))
        .respond_with(ResponseTemplate::new(200).set_body_json(registrations))
        .mount(server)
        .await;
}

// ============================================================================
// In-memory provider
// ============================================================================

/// Provider keeping records per zone, replacing by name and type on set.
#[derive(Default)]
pub struct MemoryProvider {
    zones: Mutex<HashMap<String, Vec<Record>>>,
}

impl MemoryProvider {
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

    pub fn find(&self, zone: &str, name: &str) -> Vec<Record> {
        self.records(zone)
            .into_iter()
            .filter(|r| r.name == name)
            .collect()
    }
}

#[async_trait]
impl DnsProvider for MemoryProvider {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get_records(&self, zone: &str) -> Result<Vec<Record>, ProviderError> {
        Ok(self.records(zone))
    }

    async fn set_records(&self, zone: &str, records: &[Record]) -> Result<Vec<Record>, ProviderError> {
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
        let mut zones = self.zones.lock().unwrap();
        let existing = zones.entry(zone.to_string()).or_default();
        let mut deleted = Vec::new();
        existing.retain(|r| {
            let matched = records.iter().any(|d| {
                d.name == r.name && d.record_type == r.record_type && d.value == r.value
            });
            if matched {
                deleted.push(r.clone());
            }
            !matched
        });
        Ok(deleted)
    }

    async fn append_records(
        &self,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        self.zones
            .lock()
            .unwrap()
            .entry(zone.to_string())
            .or_default()
            .extend(records.iter().cloned());
        Ok(records.to_vec())
    }
}
