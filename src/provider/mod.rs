// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS provider backends.
//!
//! The reconciler and pruner only depend on the [`DnsProvider`] capability
//! set. One backend is selected at startup from `dns.provider`:
//!
//! - [`cloudflare::CloudflareProvider`] - Cloudflare v4 JSON API
//! - [`route53::Route53Provider`] - AWS Route53 REST/XML API
//!
//! With `app.dry_run = true` the backend is wrapped in
//! [`dry_run::DryRunProvider`], which passes reads through and only logs
//! writes.
//!
//! All operations take the zone as a fully qualified name and exchange
//! records with names relative to that zone (`@` for the apex).

pub mod cloudflare;
pub mod dry_run;
pub mod retry;
pub mod route53;

use crate::config::{Config, ProviderKind};
use crate::errors::ProviderError;
use crate::record::Record;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Record CRUD capability set of a DNS provider.
///
/// Implementations must be safe to share between the update and prune
/// workers.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Short backend name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Fetch every record in `zone`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the zone cannot be read.
    async fn get_records(&self, zone: &str) -> Result<Vec<Record>, ProviderError>;

    /// Create or replace records, matched by name and type.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if any record cannot be written.
    async fn set_records(&self, zone: &str, records: &[Record]) -> Result<Vec<Record>, ProviderError>;

    /// Delete records, matched by name, type and value.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if any record cannot be deleted.
    async fn delete_records(
        &self,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError>;

    /// Add records without touching existing ones.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if any record cannot be created.
    async fn append_records(
        &self,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError>;
}

/// Build the provider selected by the configuration.
///
/// # Errors
///
/// Returns an error if the provider is unknown or its client cannot be built.
pub fn build_provider(config: &Config) -> Result<Arc<dyn DnsProvider>> {
    let backend: Arc<dyn DnsProvider> = match config.provider_kind()? {
        ProviderKind::Cloudflare => Arc::new(cloudflare::CloudflareProvider::new(
            &config.provider.cloudflare,
        )?),
        ProviderKind::Route53 => Arc::new(route53::Route53Provider::new(&config.provider.route53)?),
    };

    info!(
        provider = backend.name(),
        dry_run = config.app.dry_run,
        "Configured DNS provider"
    );

    if config.app.dry_run {
        Ok(Arc::new(dry_run::DryRunProvider::new(backend)))
    } else {
        Ok(backend)
    }
}
