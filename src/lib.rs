// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # nomad-external-dns - Nomad service records for external DNS providers
//!
//! Publishes DNS records for Nomad services that carry an
//! `external-dns/hostname=<fqdn>` tag, and removes them once the service is
//! gone. Every published name gets two records:
//!
//! - an `A`/`AAAA` record holding the service addresses
//! - a `TXT` ownership marker naming the service and this instance's owner id
//!
//! Only records carrying this instance's ownership marker are ever deleted,
//! so a zone can be shared with records managed by anything else.
//!
//! ## Modules
//!
//! - [`tags`] - hostname, zone and TTL extraction from service tags
//! - [`record`] - record model, ownership marker and record synthesis
//! - [`cluster`] - Nomad client and service inventory
//! - [`provider`] - DNS provider capability set and backends
//! - [`state`] - last-applied service map shared by both workers
//! - [`reconciler`] - pushes new and changed services to the provider
//! - [`pruner`] - deletes owned records of services that are gone
//! - [`scheduler`] - periodic workers and application wiring
//!
//! ## Example
//!
//! ```rust
//! use nomad_external_dns::tags::parse_tags;
//! use std::time::Duration;
//!
//! let tags = vec![
//!     "external-dns/hostname=redis.svc.internal".to_string(),
//!     "external-dns/ttl=60s".to_string(),
//! ];
//! let parsed = parse_tags(&tags, &["svc.internal".to_string()]).unwrap();
//!
//! assert_eq!(parsed.host, "redis");
//! assert_eq!(parsed.zone, "svc.internal.");
//! assert_eq!(parsed.ttl, Duration::from_secs(60));
//! ```

pub mod cluster;
pub mod config;
pub mod constants;
pub mod duration;
pub mod errors;
pub mod metrics;
pub mod provider;
pub mod pruner;
pub mod reconciler;
pub mod record;
pub mod scheduler;
pub mod service;
pub mod state;
pub mod tags;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;
