// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! AWS Route53 REST/XML backend.
//!
//! Endpoints used (API version `2013-04-01`):
//!
//! - `GET /hostedzonesbyname?dnsname=<zone>` resolves a zone to its hosted zone id (cached)
//! - `GET /hostedzone/<id>/rrset` lists record sets, following `IsTruncated`
//! - `POST /hostedzone/<id>/rrset/` submits one change batch per call
//!
//! `set_records` submits `UPSERT` and `append_records` submits `CREATE`.
//! `delete_records` reads the zone first: Route53 only deletes a set that is
//! repeated exactly, so a set left empty is deleted as stored, while a set
//! that still holds other values (a foreign `TXT` next to our marker) is
//! rewritten with `UPSERT` to the remainder. A record set holds one
//! `ResourceRecord` per value, so comma-joined address values are split on
//! write and reads return one [`Record`] per resource record. `TXT` values
//! are quoted on write.
//!
//! Requests are signed with AWS Signature Version 4. Throttling responses
//! are reported as HTTP 429 so they are retried like any other transient
//! failure, up to `max_retries` times.

use super::retry::retry_provider_call;
use super::DnsProvider;
use crate::config::Route53Config;
use crate::constants::{
    HTTP_REQUEST_TIMEOUT, ROUTE53_API_ENDPOINT, ROUTE53_API_VERSION, ROUTE53_SIGNING_REGION,
};
use crate::errors::ProviderError;
use crate::record::{absolute_name, relative_name, Record, RecordType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client as HttpClient, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

const PROVIDER_NAME: &str = "route53";
const SERVICE_NAME: &str = "route53";
const XML_NAMESPACE: &str = "https://route53.amazonaws.com/doc/2013-04-01/";
const HOSTED_ZONE_PREFIX: &str = "/hostedzone/";

/// Error codes Route53 returns with HTTP 400 that are really rate limits
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "PriorRequestNotComplete",
    "RequestLimitExceeded",
];

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListHostedZonesByNameResponse {
    #[serde(default)]
    hosted_zones: HostedZones,
}

#[derive(Debug, Default, Deserialize)]
struct HostedZones {
    #[serde(rename = "HostedZone", default)]
    zones: Vec<HostedZone>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HostedZone {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListResourceRecordSetsResponse {
    #[serde(default)]
    resource_record_sets: ResourceRecordSets,
    #[serde(default)]
    is_truncated: bool,
    next_record_name: Option<String>,
    next_record_type: Option<String>,
    next_record_identifier: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResourceRecordSets {
    #[serde(rename = "ResourceRecordSet", default)]
    sets: Vec<ResourceRecordSet>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
struct ResourceRecordSet {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Type")]
    record_type: String,
    #[serde(rename = "TTL", default)]
    ttl: u64,
    #[serde(rename = "ResourceRecords", default)]
    resource_records: ResourceRecords,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
struct ResourceRecords {
    #[serde(rename = "ResourceRecord", default)]
    records: Vec<ResourceRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
struct ResourceRecord {
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename = "ChangeResourceRecordSetsRequest")]
struct ChangeResourceRecordSetsRequest {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "ChangeBatch")]
    change_batch: ChangeBatch,
}

#[derive(Debug, Serialize)]
struct ChangeBatch {
    #[serde(rename = "Changes")]
    changes: Changes,
}

#[derive(Debug, Serialize)]
struct Changes {
    #[serde(rename = "Change")]
    changes: Vec<Change>,
}

#[derive(Debug, Serialize)]
struct Change {
    #[serde(rename = "Action")]
    action: ChangeAction,
    #[serde(rename = "ResourceRecordSet")]
    record_set: ResourceRecordSet,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
enum ChangeAction {
    Upsert,
    Delete,
    Create,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ChangeResourceRecordSetsResponse {
    change_info: ChangeInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ChangeInfo {
    id: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

// ============================================================================
// Signature Version 4
// ============================================================================

/// AWS Signature Version 4 request signer.
#[derive(Clone, Debug)]
pub struct SigV4Signer {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    region: String,
    service: String,
}

impl SigV4Signer {
    #[must_use]
    pub fn new(
        access_key_id: &str,
        secret_access_key: &str,
        session_token: Option<&str>,
        region: &str,
        service: &str,
    ) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: session_token.filter(|t| !t.is_empty()).map(str::to_string),
            region: region.to_string(),
            service: service.to_string(),
        }
    }

    /// Headers to add to a request so that it carries a valid signature.
    ///
    /// `extra_headers` are signed in addition to `host`, `x-amz-date` and,
    /// when a session token is set, `x-amz-security-token`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Setup`] if the HMAC cannot be keyed.
    pub fn sign(
        &self,
        method: &str,
        url: &Url,
        extra_headers: &[(&str, &str)],
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Vec<(String, String)>, ProviderError> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        let mut headers: Vec<(String, String)> = extra_headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.trim().to_string()))
            .collect();
        headers.push(("host".to_string(), host_header(url)));
        headers.push(("x-amz-date".to_string(), amz_date.clone()));
        if let Some(token) = &self.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        headers.sort();

        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{k}:{v}\n"))
            .collect();
        let signed_headers = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let canonical_request = format!(
            "{method}\n{path}\n{query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
            path = canonical_uri(url),
            query = canonical_query(url),
            payload_hash = hex::encode(Sha256::digest(payload)),
        );

        let scope = format!("{date}/{}/{}/aws4_request", self.region, self.service);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let key = signing_key(&self.secret_access_key, &date, &self.region, &self.service)?;
        let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

        let mut signed = vec![
            ("x-amz-date".to_string(), amz_date),
            (
                "authorization".to_string(),
                format!(
                    "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
                    self.access_key_id
                ),
            ),
        ];
        if let Some(token) = &self.session_token {
            signed.push(("x-amz-security-token".to_string(), token.clone()));
        }
        Ok(signed)
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, ProviderError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| ProviderError::Setup {
        provider: PROVIDER_NAME.to_string(),
        reason: format!("invalid signing key: {e}"),
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derive the SigV4 signing key for one day, region and service.
fn signing_key(
    secret: &str,
    date: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, ProviderError> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn canonical_uri(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k), uri_encode(&v)))
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// RFC 3986 encoding with the unreserved set SigV4 requires.
fn uri_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

// ============================================================================
// Record Conversion
// ============================================================================

/// Quote a `TXT` value unless it already is.
fn quote_txt(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value.to_string()
    } else {
        format!("\"{}\"", value.replace('"', "\\\""))
    }
}

/// Undo Route53's `\ooo` octal escaping of record names (e.g. `\052` for `*`).
fn unescape_name(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escaped = bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b));
        if escaped {
            let code = bytes[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            if let Ok(byte) = u8::try_from(code) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn to_record_set(zone: &str, record: &Record) -> ResourceRecordSet {
    let records = record
        .split_values()
        .into_iter()
        .map(|value| ResourceRecord {
            value: if record.record_type == RecordType::TXT {
                quote_txt(&value)
            } else {
                value
            },
        })
        .collect();

    ResourceRecordSet {
        name: absolute_name(&record.name, zone),
        record_type: record.record_type.as_str().to_string(),
        ttl: record.ttl.as_secs(),
        resource_records: ResourceRecords { records },
    }
}

fn from_record_sets(zone: &str, sets: Vec<ResourceRecordSet>) -> Vec<Record> {
    sets.into_iter()
        .flat_map(|set| {
            let name = relative_name(&unescape_name(&set.name), zone);
            let record_type = RecordType::from(set.record_type.as_str());
            let ttl = Duration::from_secs(set.ttl);
            set.resource_records
                .records
                .into_iter()
                .map(move |rr| Record::new(record_type.clone(), name.clone(), rr.value, ttl))
        })
        .collect()
}

fn same_value(a: &str, b: &str) -> bool {
    a.trim().trim_matches('"') == b.trim().trim_matches('"')
}

fn same_set(a: &ResourceRecordSet, b: &ResourceRecordSet) -> bool {
    a.record_type == b.record_type
        && unescape_name(&a.name)
            .trim_end_matches('.')
            .eq_ignore_ascii_case(b.name.trim_end_matches('.'))
}

/// One change per record, all with the same action.
fn changes_for(zone: &str, action: ChangeAction, records: &[Record]) -> Vec<Change> {
    records
        .iter()
        .map(|record| Change {
            action,
            record_set: to_record_set(zone, record),
        })
        .collect()
}

/// Plan the changes that remove `records` from the zone's current sets.
///
/// A set whose values are all removed is deleted exactly as stored; a set
/// that keeps other values is upserted with the remainder. Records with no
/// matching set or value produce no change. Returns the changes and the
/// records actually removed.
fn plan_deletions(
    zone: &str,
    existing: &[ResourceRecordSet],
    records: &[Record],
) -> (Vec<Change>, Vec<Record>) {
    let mut removals: Vec<(usize, Vec<String>)> = Vec::new();

    for record in records {
        let wanted = to_record_set(zone, record);
        let Some(index) = existing.iter().position(|set| same_set(set, &wanted)) else {
            debug!(zone = %zone, record = %record.name, record_type = %record.record_type, "Record set already absent");
            continue;
        };
        let values = wanted.resource_records.records.into_iter().map(|rr| rr.value);
        match removals.iter_mut().find(|(i, _)| *i == index) {
            Some((_, pending)) => pending.extend(values),
            None => removals.push((index, values.collect())),
        }
    }

    let mut changes = Vec::new();
    let mut removed = Vec::new();
    for (index, values) in removals {
        let set = &existing[index];
        let (gone, kept): (Vec<ResourceRecord>, Vec<ResourceRecord>) = set
            .resource_records
            .records
            .iter()
            .cloned()
            .partition(|rr| values.iter().any(|v| same_value(&rr.value, v)));
        if gone.is_empty() {
            continue;
        }

        let (action, record_set) = if kept.is_empty() {
            (ChangeAction::Delete, set.clone())
        } else {
            let remainder = ResourceRecordSet {
                resource_records: ResourceRecords { records: kept },
                ..set.clone()
            };
            (ChangeAction::Upsert, remainder)
        };
        changes.push(Change { action, record_set });

        removed.extend(from_record_sets(
            zone,
            vec![ResourceRecordSet {
                resource_records: ResourceRecords { records: gone },
                ..set.clone()
            }],
        ));
    }

    (changes, removed)
}

/// Serialize a change batch, XML declaration included.
fn change_batch_xml(changes: Vec<Change>) -> Result<String, ProviderError> {
    let name = changes
        .first()
        .map(|c| c.record_set.name.clone())
        .unwrap_or_default();
    let request = ChangeResourceRecordSetsRequest {
        xmlns: XML_NAMESPACE,
        change_batch: ChangeBatch {
            changes: Changes { changes },
        },
    };

    let body = quick_xml::se::to_string(&request).map_err(|e| ProviderError::InvalidRecord {
        name,
        reason: format!("failed to encode change batch: {e}"),
    })?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}"))
}

// ============================================================================
// Provider
// ============================================================================

/// DNS provider backed by the Route53 API.
pub struct Route53Provider {
    http: HttpClient,
    base_url: Url,
    signer: SigV4Signer,
    max_retries: u32,
    zone_ids: RwLock<HashMap<String, String>>,
}

impl Route53Provider {
    /// Build a provider from the `[provider.route53]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Setup`] if credentials are missing, the
    /// endpoint is not a valid base URL, or the HTTP client cannot be built.
    pub fn new(config: &Route53Config) -> Result<Self, ProviderError> {
        let access_key_id = non_empty(config.access_key_id.as_deref())
            .ok_or_else(|| setup_error("missing access_key_id"))?;
        let secret_access_key = non_empty(config.secret_access_key.as_deref())
            .ok_or_else(|| setup_error("missing secret_access_key"))?;

        let endpoint = config.endpoint.as_deref().unwrap_or(ROUTE53_API_ENDPOINT);
        let base_url = Url::parse(endpoint)
            .map_err(|e| setup_error(&format!("invalid endpoint '{endpoint}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(setup_error(&format!("invalid endpoint '{endpoint}': not a base URL")));
        }

        let http = HttpClient::builder()
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| setup_error(&e.to_string()))?;

        debug!(
            endpoint = %base_url,
            region = config.region.as_deref().unwrap_or(ROUTE53_SIGNING_REGION),
            max_retries = config.max_retries,
            "Configured Route53 client"
        );

        Ok(Self {
            http,
            base_url,
            signer: SigV4Signer::new(
                access_key_id,
                secret_access_key,
                config.session_token.as_deref(),
                ROUTE53_SIGNING_REGION,
                SERVICE_NAME,
            ),
            max_retries: config.max_retries,
            zone_ids: RwLock::new(HashMap::new()),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(ROUTE53_API_VERSION).extend(segments);
        }
        url
    }

    /// Send one signed request, retrying transient failures.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<String>,
    ) -> Result<T, ProviderError> {
        let operation = format!("{method} {}", url.path());
        let url = &url;
        let body = body.as_deref();
        let text = retry_provider_call(self.max_retries, &operation, || {
            self.call_once(method.clone(), url, body)
        })
        .await?;

        quick_xml::de::from_str(&text).map_err(|e| ProviderError::Decode {
            endpoint: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn call_once(
        &self,
        method: Method,
        url: &Url,
        body: Option<&str>,
    ) -> Result<String, ProviderError> {
        debug!(method = %method, url = %url, "Route53 API request");

        let payload = body.unwrap_or_default();
        let headers = self
            .signer
            .sign(method.as_str(), url, &[], payload.as_bytes(), Utc::now())?;

        let mut request = self.http.request(method.clone(), url.clone());
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request
                .header("content-type", "application/xml")
                .body(body.to_string());
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
            let (status_code, reason) = match quick_xml::de::from_str::<ErrorResponse>(&text) {
                Ok(err) if THROTTLING_CODES.contains(&err.error.code.as_str()) => {
                    (429, format!("{}: {}", err.error.code, err.error.message))
                }
                Ok(err) => (status.as_u16(), format!("{}: {}", err.error.code, err.error.message)),
                Err(_) => (status.as_u16(), text),
            };
            error!(method = %method, url = %url, status = status_code, error = %reason, "Route53 API request failed");
            return Err(ProviderError::Http {
                endpoint: url.to_string(),
                status_code,
                reason,
            });
        }

        Ok(text)
    }

    /// Resolve a zone name to its hosted zone id.
    async fn hosted_zone_id(&self, zone: &str) -> Result<String, ProviderError> {
        if let Some(id) = self.zone_ids.read().await.get(zone) {
            return Ok(id.clone());
        }

        let mut url = self.endpoint(&["hostedzonesbyname"]);
        url.query_pairs_mut()
            .append_pair("dnsname", zone)
            .append_pair("maxitems", "1");

        let response: ListHostedZonesByNameResponse = self.call(Method::GET, url, None).await?;
        let wanted = zone.trim_end_matches('.');
        let id = response
            .hosted_zones
            .zones
            .into_iter()
            .find(|z| z.name.trim_end_matches('.').eq_ignore_ascii_case(wanted))
            .map(|z| z.id.trim_start_matches(HOSTED_ZONE_PREFIX).to_string())
            .ok_or_else(|| ProviderError::ZoneNotFound {
                zone: zone.to_string(),
            })?;

        debug!(zone = %zone, hosted_zone_id = %id, "Resolved Route53 hosted zone");
        self.zone_ids
            .write()
            .await
            .insert(zone.to_string(), id.clone());
        Ok(id)
    }

    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<ResourceRecordSet>, ProviderError> {
        let mut sets = Vec::new();
        let mut next: Option<(String, Option<String>, Option<String>)> = None;

        loop {
            let mut url = self.endpoint(&["hostedzone", zone_id, "rrset"]);
            if let Some((name, record_type, identifier)) = &next {
                let mut query = url.query_pairs_mut();
                query.append_pair("name", name);
                if let Some(record_type) = record_type {
                    query.append_pair("type", record_type);
                }
                if let Some(identifier) = identifier {
                    query.append_pair("identifier", identifier);
                }
            }

            let page: ListResourceRecordSetsResponse = self.call(Method::GET, url, None).await?;
            sets.extend(page.resource_record_sets.sets);

            match (page.is_truncated, page.next_record_name) {
                (true, Some(name)) => {
                    next = Some((name, page.next_record_type, page.next_record_identifier));
                }
                _ => break,
            }
        }

        Ok(sets)
    }

    async fn change(
        &self,
        zone: &str,
        action: ChangeAction,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let zone_id = self.hosted_zone_id(zone).await?;
        self.submit(zone, &zone_id, changes_for(zone, action, records))
            .await?;
        Ok(records.to_vec())
    }

    /// POST one change batch to the hosted zone.
    async fn submit(&self, zone: &str, zone_id: &str, changes: Vec<Change>) -> Result<(), ProviderError> {
        let count = changes.len();
        let upserts = changes
            .iter()
            .filter(|c| c.action == ChangeAction::Upsert)
            .count();
        let body = change_batch_xml(changes)?;
        // The trailing slash is part of the documented path.
        let url = self.endpoint(&["hostedzone", zone_id, "rrset", ""]);

        let response: ChangeResourceRecordSetsResponse =
            self.call(Method::POST, url, Some(body)).await?;

        info!(
            zone = %zone,
            count,
            upserts,
            change_id = %response.change_info.id,
            status = %response.change_info.status,
            "Submitted Route53 change batch"
        );
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn setup_error(reason: &str) -> ProviderError {
    ProviderError::Setup {
        provider: PROVIDER_NAME.to_string(),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl DnsProvider for Route53Provider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn get_records(&self, zone: &str) -> Result<Vec<Record>, ProviderError> {
        let zone_id = self.hosted_zone_id(zone).await?;
        let sets = self.list_record_sets(&zone_id).await?;

        debug!(zone = %zone, record_sets = sets.len(), "Fetched Route53 record sets");
        Ok(from_record_sets(zone, sets))
    }

    async fn set_records(&self, zone: &str, records: &[Record]) -> Result<Vec<Record>, ProviderError> {
        self.change(zone, ChangeAction::Upsert, records).await
    }

    async fn delete_records(
        &self,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let zone_id = self.hosted_zone_id(zone).await?;
        let existing = self.list_record_sets(&zone_id).await?;
        let (changes, removed) = plan_deletions(zone, &existing, records);
        if changes.is_empty() {
            debug!(zone = %zone, "Nothing left to delete");
            return Ok(removed);
        }

        self.submit(zone, &zone_id, changes).await?;
        Ok(removed)
    }

    async fn append_records(
        &self,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        self.change(zone, ChangeAction::Create, records).await
    }
}

#[cfg(test)]
#[path = "route53_tests.rs"]
mod route53_tests;
