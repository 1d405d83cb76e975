// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for nomad-external-dns.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

use std::time::Duration;

// ============================================================================
// Program Identity
// ============================================================================

/// Identifier written into the `created-by` field of every ownership marker
pub const PROGRAM_ID: &str = "nomad-external-dns";

/// Prefix for environment variables that override the config file
pub const ENV_PREFIX: &str = "NOMAD_EXTERNAL_DNS_";

/// Config file loaded when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

// ============================================================================
// Annotation Protocol
// ============================================================================

/// Service tag carrying the fully qualified hostname to publish
pub const HOSTNAME_ANNOTATION_KEY: &str = "external-dns/hostname";

/// Service tag carrying an optional record TTL (Go-style duration)
pub const TTL_ANNOTATION_KEY: &str = "external-dns/ttl";

/// TTL used when the TTL tag is absent or cannot be parsed (30 seconds)
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Relative name used for records at the zone apex
pub const APEX_RECORD_NAME: &str = "@";

/// Separator between addresses in a synthesized address record value
pub const ADDRESS_SEPARATOR: char = ',';

// ============================================================================
// Scheduling Defaults
// ============================================================================

/// Default interval between reconciliation cycles (30 seconds)
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(30);

/// Default interval between prune cycles (60 seconds)
pub const DEFAULT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

// ============================================================================
// Cluster API Constants
// ============================================================================

/// Default Nomad HTTP API address
pub const DEFAULT_NOMAD_ADDRESS: &str = "http://127.0.0.1:4646";

/// Namespace wildcard accepted by the Nomad services API
pub const ALL_NAMESPACES: &str = "*";

/// Header carrying the Nomad ACL token
pub const NOMAD_TOKEN_HEADER: &str = "X-Nomad-Token";

// ============================================================================
// Provider HTTP Constants
// ============================================================================

/// Timeout applied to every provider and cluster HTTP request (30 seconds)
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default Cloudflare API base URL
pub const CLOUDFLARE_API_ENDPOINT: &str = "https://api.cloudflare.com/client/v4";

/// Page size used when listing Cloudflare DNS records
pub const CLOUDFLARE_PAGE_SIZE: u32 = 100;

/// Retries for transient Cloudflare API failures
pub const CLOUDFLARE_MAX_RETRIES: u32 = 3;

/// Default Route53 API base URL
pub const ROUTE53_API_ENDPOINT: &str = "https://route53.amazonaws.com";

/// Route53 API version path segment
pub const ROUTE53_API_VERSION: &str = "2013-04-01";

/// Region used to sign Route53 requests (Route53 is a global service)
pub const ROUTE53_SIGNING_REGION: &str = "us-east-1";

/// Default number of retries for transient Route53 failures
pub const DEFAULT_ROUTE53_MAX_RETRIES: u32 = 3;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Path serving Prometheus metrics
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path serving the liveness probe
pub const HEALTH_SERVER_PATH: &str = "/healthz";
