// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Nomad HTTP API client.
//!
//! Only the two read endpoints needed to build the service inventory are
//! used:
//!
//! - `GET /v1/services?namespace=*` lists service names per namespace
//! - `GET /v1/service/<name>?namespace=<ns>` lists the registrations of one service

use super::{ClusterClient, ServiceInstance, ServiceListEntry};
use crate::config::NomadConfig;
use crate::constants::{HTTP_REQUEST_TIMEOUT, NOMAD_TOKEN_HEADER};
use crate::errors::ClusterError;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error};
use url::Url;

/// `GET /v1/services` response item
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NamespaceServices {
    namespace: String,
    #[serde(default)]
    services: Option<Vec<ServiceStub>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceStub {
    service_name: String,
}

/// `GET /v1/service/<name>` response item
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceRegistration {
    service_name: String,
    namespace: String,
    #[serde(rename = "JobID", default)]
    job_id: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Client for the Nomad HTTP API.
#[derive(Clone, Debug)]
pub struct NomadClient {
    http: HttpClient,
    base_url: Url,
    token: Option<String>,
    region: Option<String>,
}

impl NomadClient {
    /// Build a client from the `[nomad]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::Request`] if the address is not a valid base
    /// URL or the HTTP client cannot be built.
    pub fn new(config: &NomadConfig) -> Result<Self, ClusterError> {
        let address = config.address();
        let base_url = Url::parse(address).map_err(|e| ClusterError::Request {
            url: address.to_string(),
            reason: format!("invalid Nomad address: {e}"),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClusterError::Request {
                url: address.to_string(),
                reason: "invalid Nomad address: not a base URL".to_string(),
            });
        }

        let http = HttpClient::builder()
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClusterError::Request {
                url: address.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url,
            token: config.token.clone().filter(|t| !t.is_empty()),
            region: config.region.clone().filter(|r| !r.is_empty()),
        })
    }

    /// Build `<base>/<segments...>?namespace=<ns>[&region=<region>]`.
    fn endpoint(&self, segments: &[&str], namespace: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("namespace", namespace);
            if let Some(region) = &self.region {
                query.append_pair("region", region);
            }
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClusterError> {
        debug!(url = %url, "Nomad API request");

        let mut request = self.http.get(url.clone());
        if let Some(token) = &self.token {
            request = request.header(NOMAD_TOKEN_HEADER, token);
        }

        let response = request.send().await.map_err(|e| ClusterError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(url = %url, status = %status, error = %body, "Nomad API request failed");
            return Err(ClusterError::UnexpectedStatus {
                url: url.to_string(),
                status_code: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(|e| ClusterError::Request {
            url: url.to_string(),
            reason: format!("failed to read response body: {e}"),
        })?;

        serde_json::from_str(&body).map_err(|e| ClusterError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ClusterClient for NomadClient {
    async fn list_services(&self, namespace: &str) -> Result<Vec<ServiceListEntry>, ClusterError> {
        let url = self.endpoint(&["v1", "services"], namespace);
        let namespaces: Option<Vec<NamespaceServices>> = self.get_json(url).await?;

        let entries: Vec<ServiceListEntry> = namespaces
            .unwrap_or_default()
            .into_iter()
            .flat_map(|ns| {
                let namespace = ns.namespace;
                ns.services
                    .unwrap_or_default()
                    .into_iter()
                    .map(move |stub| ServiceListEntry {
                        namespace: namespace.clone(),
                        service_name: stub.service_name,
                    })
            })
            .collect();

        debug!(count = entries.len(), "Fetched service list");
        Ok(entries)
    }

    async fn service_instances(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Vec<ServiceInstance>, ClusterError> {
        let url = self.endpoint(&["v1", "service", name], namespace);
        let registrations: Option<Vec<ServiceRegistration>> = self.get_json(url).await?;

        Ok(registrations
            .unwrap_or_default()
            .into_iter()
            .map(|r| ServiceInstance {
                service_name: r.service_name,
                namespace: r.namespace,
                job_id: r.job_id,
                address: r.address,
                tags: r.tags.unwrap_or_default(),
            })
            .collect())
    }
}

#[cfg(test)]
#[path = "nomad_tests.rs"]
mod nomad_tests;
