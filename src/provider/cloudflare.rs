// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloudflare v4 API backend.
//!
//! Endpoints used:
//!
//! - `GET /zones?name=<zone>` resolves a zone name to its id (cached)
//! - `GET /zones/<id>/dns_records?per_page=100&page=<n>` lists records
//! - `POST`, `PUT` and `DELETE` on `/zones/<id>/dns_records[/<record id>]`
//!
//! Cloudflare holds one row per value, so a comma-joined address record is
//! written as one row per address. Names are exchanged with Cloudflare as
//! FQDNs without the trailing dot and returned relative to the zone.
//!
//! Writes only rewrite or remove rows the record owns: all address rows at
//! the name, and `TXT` rows that either hold a desired value or carry the
//! same `owner=` token as the desired marker.

use super::retry::retry_provider_call;
use super::DnsProvider;
use crate::config::CloudflareConfig;
use crate::constants::{
    CLOUDFLARE_API_ENDPOINT, CLOUDFLARE_MAX_RETRIES, CLOUDFLARE_PAGE_SIZE, HTTP_REQUEST_TIMEOUT,
};
use crate::errors::ProviderError;
use crate::record::{absolute_name, relative_name, OwnershipMarker, Record, RecordType};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use url::Url;

const PROVIDER_NAME: &str = "cloudflare";

// ============================================================================
// Wire Types
// ============================================================================

/// Common response envelope of the v4 API
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct ZoneEntry {
    id: String,
}

#[derive(Clone, Debug, Deserialize)]
struct DnsRecordEntry {
    id: String,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    content: String,
    #[serde(default)]
    ttl: u64,
}

#[derive(Debug, Serialize)]
struct DnsRecordBody<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: String,
    content: String,
    ttl: u64,
}

fn describe_errors(errors: &[ApiMessage]) -> String {
    errors
        .iter()
        .map(|e| format!("{} ({})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}

fn same_content(a: &str, b: &str) -> bool {
    a.trim().trim_matches('"') == b.trim().trim_matches('"')
}

// ============================================================================
// Provider
// ============================================================================

/// DNS provider backed by the Cloudflare API.
pub struct CloudflareProvider {
    http: HttpClient,
    base_url: Url,
    api_token: String,
    zone_ids: RwLock<HashMap<String, String>>,
}

impl CloudflareProvider {
    /// Build a provider from the `[provider.cloudflare]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Setup`] if the API token is missing, the
    /// endpoint is not a valid base URL, or the HTTP client cannot be built.
    pub fn new(config: &CloudflareConfig) -> Result<Self, ProviderError> {
        let api_token = config
            .api_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| setup_error("missing API token"))?;

        let endpoint = config.endpoint.as_deref().unwrap_or(CLOUDFLARE_API_ENDPOINT);
        let base_url = Url::parse(endpoint)
            .map_err(|e| setup_error(&format!("invalid endpoint '{endpoint}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(setup_error(&format!("invalid endpoint '{endpoint}': not a base URL")));
        }

        let http = HttpClient::builder()
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| setup_error(&e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            api_token,
            zone_ids: RwLock::new(HashMap::new()),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send one API request, retrying transient failures.
    async fn call<T, B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Envelope<T>, ProviderError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let operation = format!("{method} {}", url.path());
        let url = &url;
        retry_provider_call(CLOUDFLARE_MAX_RETRIES, &operation, || {
            self.call_once(method.clone(), url, body)
        })
        .await
    }

    async fn call_once<T, B>(
        &self,
        method: Method,
        url: &Url,
        body: Option<&B>,
    ) -> Result<Envelope<T>, ProviderError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        debug!(method = %method, url = %url, "Cloudflare API request");

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(&self.api_token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| ProviderError::Connection {
            endpoint: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        if !status.is_success() {
            let reason = serde_json::from_str::<Envelope<IgnoredAny>>(&text)
                .ok()
                .map(|envelope| describe_errors(&envelope.errors))
                .filter(|reason| !reason.is_empty())
                .unwrap_or(text);
            error!(method = %method, url = %url, status = %status, error = %reason, "Cloudflare API request failed");
            return Err(ProviderError::Http {
                endpoint: url.to_string(),
                status_code: status.as_u16(),
                reason,
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&text).map_err(|e| ProviderError::Decode {
                endpoint: url.to_string(),
                reason: e.to_string(),
            })?;

        if !envelope.success {
            return Err(ProviderError::Http {
                endpoint: url.to_string(),
                status_code: status.as_u16(),
                reason: describe_errors(&envelope.errors),
            });
        }

        Ok(envelope)
    }

    /// Resolve a zone name to its Cloudflare id.
    async fn zone_id(&self, zone: &str) -> Result<String, ProviderError> {
        if let Some(id) = self.zone_ids.read().await.get(zone) {
            return Ok(id.clone());
        }

        let mut url = self.endpoint(&["zones"]);
        url.query_pairs_mut()
            .append_pair("name", zone.trim_end_matches('.'));

        let envelope: Envelope<Vec<ZoneEntry>> = self.call(Method::GET, url, None::<&()>).await?;
        let id = envelope
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|z| z.id)
            .ok_or_else(|| ProviderError::ZoneNotFound {
                zone: zone.to_string(),
            })?;

        debug!(zone = %zone, zone_id = %id, "Resolved Cloudflare zone");
        self.zone_ids
            .write()
            .await
            .insert(zone.to_string(), id.clone());
        Ok(id)
    }

    /// List every record in a zone, following pagination.
    async fn list_entries(&self, zone_id: &str) -> Result<Vec<DnsRecordEntry>, ProviderError> {
        let mut entries = Vec::new();
        let mut page = 1u32;

        loop {
            let mut url = self.endpoint(&["zones", zone_id, "dns_records"]);
            url.query_pairs_mut()
                .append_pair("per_page", &CLOUDFLARE_PAGE_SIZE.to_string())
                .append_pair("page", &page.to_string());

            let envelope: Envelope<Vec<DnsRecordEntry>> =
                self.call(Method::GET, url, None::<&()>).await?;
            entries.extend(envelope.result.unwrap_or_default());

            match envelope.result_info {
                Some(info) if info.page.max(page) < info.total_pages => page += 1,
                _ => break,
            }
        }

        Ok(entries)
    }

    async fn create_row(&self, zone_id: &str, body: &DnsRecordBody<'_>) -> Result<(), ProviderError> {
        let url = self.endpoint(&["zones", zone_id, "dns_records"]);
        let _: Envelope<IgnoredAny> = self.call(Method::POST, url, Some(body)).await?;
        Ok(())
    }

    async fn update_row(
        &self,
        zone_id: &str,
        record_id: &str,
        body: &DnsRecordBody<'_>,
    ) -> Result<(), ProviderError> {
        let url = self.endpoint(&["zones", zone_id, "dns_records", record_id]);
        let _: Envelope<IgnoredAny> = self.call(Method::PUT, url, Some(body)).await?;
        Ok(())
    }

    async fn delete_row(&self, zone_id: &str, record_id: &str) -> Result<(), ProviderError> {
        let url = self.endpoint(&["zones", zone_id, "dns_records", record_id]);
        let _: Envelope<IgnoredAny> = self.call(Method::DELETE, url, None::<&()>).await?;
        Ok(())
    }
}

fn setup_error(reason: &str) -> ProviderError {
    ProviderError::Setup {
        provider: PROVIDER_NAME.to_string(),
        reason: reason.to_string(),
    }
}

/// One API row per value of `record`.
fn rows<'a>(zone: &str, record: &'a Record) -> Vec<DnsRecordBody<'a>> {
    let name = absolute_name(&record.name, zone)
        .trim_end_matches('.')
        .to_string();
    record
        .split_values()
        .into_iter()
        .map(|content| DnsRecordBody {
            record_type: record.record_type.as_str(),
            name: name.clone(),
            content,
            ttl: record.ttl.as_secs().max(1),
        })
        .collect()
}

/// Existing rows holding the same name and type as `body`.
fn matching_rows<'e>(existing: &'e [DnsRecordEntry], body: &DnsRecordBody<'_>) -> Vec<&'e DnsRecordEntry> {
    existing
        .iter()
        .filter(|e| e.name.eq_ignore_ascii_case(&body.name) && e.record_type == body.record_type)
        .collect()
}

/// Existing rows that converging `record` may rewrite or delete.
///
/// Every address row at the name belongs to the record. Any other type only
/// claims rows holding one of its values, plus rows carrying the same owner
/// as a desired ownership marker; foreign `TXT` rows are never included.
fn owned_rows<'e>(
    existing: &'e [DnsRecordEntry],
    record: &Record,
    desired: &[DnsRecordBody<'_>],
) -> Vec<&'e DnsRecordEntry> {
    let Some(first) = desired.first() else {
        return Vec::new();
    };
    let rows = matching_rows(existing, first);
    if record.record_type.is_address() {
        return rows;
    }

    let owners: Vec<String> = desired
        .iter()
        .filter_map(|d| OwnershipMarker::parse(&d.content))
        .map(|marker| marker.owner)
        .filter(|owner| !owner.is_empty())
        .collect();

    rows.into_iter()
        .filter(|e| {
            desired.iter().any(|d| same_content(&e.content, &d.content))
                || owners
                    .iter()
                    .any(|owner| OwnershipMarker::is_owned_by(&e.content, owner))
        })
        .collect()
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn get_records(&self, zone: &str) -> Result<Vec<Record>, ProviderError> {
        let zone_id = self.zone_id(zone).await?;
        let entries = self.list_entries(&zone_id).await?;

        debug!(zone = %zone, count = entries.len(), "Fetched Cloudflare records");
        Ok(entries
            .into_iter()
            .map(|e| {
                Record::new(
                    RecordType::from(e.record_type.as_str()),
                    relative_name(&e.name, zone),
                    e.content,
                    Duration::from_secs(e.ttl),
                )
            })
            .collect())
    }

    async fn set_records(&self, zone: &str, records: &[Record]) -> Result<Vec<Record>, ProviderError> {
        let zone_id = self.zone_id(zone).await?;
        let existing = self.list_entries(&zone_id).await?;

        for record in records {
            let desired = rows(zone, record);
            if desired.is_empty() {
                return Err(ProviderError::InvalidRecord {
                    name: record.name.clone(),
                    reason: "record has no value".to_string(),
                });
            }

            let current = owned_rows(&existing, record, &desired);
            let mut spare: Vec<&DnsRecordEntry> = current
                .iter()
                .copied()
                .filter(|e| !desired.iter().any(|d| same_content(&e.content, &d.content)))
                .collect();

            for body in &desired {
                match current.iter().find(|e| same_content(&e.content, &body.content)) {
                    Some(entry) if entry.ttl == body.ttl => {}
                    Some(entry) => self.update_row(&zone_id, &entry.id, body).await?,
                    None => match spare.pop() {
                        Some(entry) => self.update_row(&zone_id, &entry.id, body).await?,
                        None => self.create_row(&zone_id, body).await?,
                    },
                }
            }

            for surplus in spare {
                self.delete_row(&zone_id, &surplus.id).await?;
            }

            info!(zone = %zone, record = %record.name, record_type = %record.record_type, "Set Cloudflare records");
        }

        Ok(records.to_vec())
    }

    async fn delete_records(
        &self,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        let zone_id = self.zone_id(zone).await?;
        let existing = self.list_entries(&zone_id).await?;
        let mut deleted = Vec::new();

        for record in records {
            for body in rows(zone, record) {
                let targets = matching_rows(&existing, &body)
                    .into_iter()
                    .filter(|e| same_content(&e.content, &body.content));
                for entry in targets {
                    self.delete_row(&zone_id, &entry.id).await?;
                    deleted.push(Record::new(
                        record.record_type.clone(),
                        record.name.clone(),
                        entry.content.clone(),
                        Duration::from_secs(entry.ttl),
                    ));
                }
            }
        }

        info!(zone = %zone, count = deleted.len(), "Deleted Cloudflare records");
        Ok(deleted)
    }

    async fn append_records(
        &self,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        let zone_id = self.zone_id(zone).await?;

        for record in records {
            for body in rows(zone, record) {
                self.create_row(&zone_id, &body).await?;
            }
        }

        Ok(records.to_vec())
    }
}

#[cfg(test)]
#[path = "cloudflare_tests.rs"]
mod cloudflare_tests;
