// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Dry-run wrapper around a real provider.
//!
//! Reads go to the wrapped backend so planning sees the real zone contents.
//! Writes and deletes are logged and reported as accepted without any
//! request being made.

use super::DnsProvider;
use crate::errors::ProviderError;
use crate::record::Record;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Provider that never mutates the wrapped backend.
pub struct DryRunProvider {
    inner: Arc<dyn DnsProvider>,
}

impl DryRunProvider {
    #[must_use]
    pub fn new(inner: Arc<dyn DnsProvider>) -> Self {
        Self { inner }
    }

    fn log_planned(&self, action: &'static str, zone: &str, records: &[Record]) -> Vec<Record> {
        for record in records {
            info!(
                provider = self.inner.name(),
                action = action,
                zone = %zone,
                record = %record.name,
                record_type = %record.record_type,
                value = %record.value,
                ttl = ?record.ttl,
                "[dry-run] Skipping provider change"
            );
        }
        records.to_vec()
    }
}

#[async_trait]
impl DnsProvider for DryRunProvider {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn get_records(&self, zone: &str) -> Result<Vec<Record>, ProviderError> {
        self.inner.get_records(zone).await
    }

    async fn set_records(&self, zone: &str, records: &[Record]) -> Result<Vec<Record>, ProviderError> {
        Ok(self.log_planned("set", zone, records))
    }

    async fn delete_records(
        &self,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        Ok(self.log_planned("delete", zone, records))
    }

    async fn append_records(
        &self,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        Ok(self.log_planned("append", zone, records))
    }
}

#[cfg(test)]
#[path = "dry_run_tests.rs"]
mod dry_run_tests;
