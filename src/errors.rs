// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for nomad-external-dns.
//!
//! This module provides specialized error types for:
//! - Configuration loading and validation (fatal at startup)
//! - Service tag (annotation) parsing
//! - Nomad HTTP API calls made while building the service inventory
//! - DNS provider HTTP API calls (reads, writes, deletes)
//!
//! [`SyncError`] is the composite type the update and prune workers log. It
//! records which stage failed so a single failure can be scoped to one
//! service, one record group, or one whole cycle.

use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
///
/// Every variant is fatal: the process refuses to start any worker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Prune interval is shorter than the update interval
    ///
    /// Pruning faster than updating can delete a record before the update
    /// worker has re-asserted a service that is still alive.
    #[error("prune_interval ({prune:?}) must be greater than or equal to update_interval ({update:?})")]
    PruneIntervalTooShort {
        /// Configured prune interval
        prune: Duration,
        /// Configured update interval
        update: Duration,
    },

    /// A worker interval is zero
    #[error("{field} must be greater than zero")]
    ZeroInterval {
        /// Name of the offending config key
        field: String,
    },

    /// No domain filters configured
    #[error("dns.domain_filters must contain at least one domain")]
    NoDomains,

    /// Owner identifier is empty
    #[error("dns.owner_uuid must not be empty")]
    MissingOwner,

    /// Provider name is not one of the supported backends
    #[error("unknown DNS provider '{0}' (expected 'route53' or 'cloudflare')")]
    UnknownProvider(String),

    /// Provider selected but a required credential is missing
    #[error("provider '{provider}' requires '{field}' to be set")]
    MissingCredential {
        /// Selected provider
        provider: String,
        /// Missing config key
        field: String,
    },

    /// Config file could not be read
    #[error("failed to read config file '{path}': {reason}")]
    Read {
        /// Path of the config file
        path: String,
        /// Underlying I/O error
        reason: String,
    },

    /// Config document could not be parsed or deserialized
    #[error("invalid configuration: {0}")]
    Parse(String),
}

/// Errors raised while extracting hostname, zone and TTL from service tags.
///
/// These only affect the service that carries the tags; the rest of the
/// cycle continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    /// Service carries no tags at all
    #[error("tags cannot be empty")]
    EmptyTags,

    /// Service has tags but none of them is a hostname tag
    #[error("no '{key}' tag found", key = crate::constants::HOSTNAME_ANNOTATION_KEY)]
    MissingHostname,

    /// Hostname tag is not of the form `key=value`
    #[error("malformed tag '{tag}': expected exactly one '{key}=' prefix", key = crate::constants::HOSTNAME_ANNOTATION_KEY)]
    Malformed {
        /// The offending tag
        tag: String,
    },

    /// Hostname does not end in any configured domain
    #[error("hostname '{hostname}' does not belong to any configured domain")]
    NoMatchingDomain {
        /// Hostname taken from the tag
        hostname: String,
    },
}

/// Errors raised by the cluster (Nomad) API client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    /// HTTP request could not be sent or completed
    #[error("request to {url} failed: {reason}")]
    Request {
        /// Requested URL
        url: String,
        /// Transport error
        reason: String,
    },

    /// Nomad answered with a non-success status
    #[error("unexpected HTTP {status_code} from {url}: {body}")]
    UnexpectedStatus {
        /// Requested URL
        url: String,
        /// HTTP status code
        status_code: u16,
        /// Response body
        body: String,
    },

    /// Response body was not the expected JSON
    #[error("failed to decode response from {url}: {reason}")]
    Decode {
        /// Requested URL
        url: String,
        /// Decoder error
        reason: String,
    },
}

/// Errors raised by DNS provider backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider has no zone with this name
    #[error("zone '{zone}' not found at provider")]
    ZoneNotFound {
        /// Zone name (FQDN)
        zone: String,
    },

    /// HTTP request could not be sent or completed
    #[error("HTTP connection to {endpoint} failed: {reason}")]
    Connection {
        /// Endpoint that could not be reached
        endpoint: String,
        /// Transport error
        reason: String,
    },

    /// Provider answered with a non-success status
    #[error("HTTP {status_code} from {endpoint}: {reason}")]
    Http {
        /// Endpoint that returned the error
        endpoint: String,
        /// HTTP status code
        status_code: u16,
        /// Response body or provider error message
        reason: String,
    },

    /// Response body could not be decoded
    #[error("failed to decode response from {endpoint}: {reason}")]
    Decode {
        /// Endpoint that returned the body
        endpoint: String,
        /// Decoder error
        reason: String,
    },

    /// Backend client could not be built from its configuration
    #[error("failed to set up {provider} provider: {reason}")]
    Setup {
        /// Backend name
        provider: String,
        /// What is missing or invalid
        reason: String,
    },

    /// Record data was rejected before any request was sent
    #[error("invalid record '{name}': {reason}")]
    InvalidRecord {
        /// Relative record name
        name: String,
        /// What is wrong with it
        reason: String,
    },
}

impl ProviderError {
    /// Returns true if this error is transient and the request may be retried.
    ///
    /// Rate limiting (429), server errors (5xx) and connection failures are
    /// transient. Everything else is permanent.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection { .. } => true,
            Self::Http { status_code, .. } => *status_code == 429 || (500..600).contains(status_code),
            Self::ZoneNotFound { .. }
            | Self::Decode { .. }
            | Self::Setup { .. }
            | Self::InvalidRecord { .. } => false,
        }
    }
}

/// Composite error type for one unit of synchronisation work.
///
/// Each variant names the stage that failed; the scope of the failure
/// (whole cycle, one service, one record group) follows from the stage.
/// All of them are recoverable on the next tick. Invalid configuration is
/// fatal and surfaces as [`ConfigError`] from startup instead.
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    /// Service inventory could not be fetched; the update cycle is skipped
    #[error("failed to fetch services from cluster: {0}")]
    ClusterFetch(#[from] ClusterError),

    /// Records for a zone could not be read; the prune cycle is skipped
    #[error("failed to fetch records for zone '{zone}': {source}")]
    ProviderRead {
        /// Zone being read
        zone: String,
        /// Provider error
        #[source]
        source: ProviderError,
    },

    /// Records for one service could not be written
    #[error("failed to set records for service '{service}' in zone '{zone}': {source}")]
    ProviderWrite {
        /// Identity key of the service
        service: String,
        /// Target zone
        zone: String,
        /// Provider error
        #[source]
        source: ProviderError,
    },

    /// One record group could not be deleted
    #[error("failed to delete records '{name}' in zone '{zone}': {source}")]
    ProviderDelete {
        /// Relative record name
        name: String,
        /// Zone holding the records
        zone: String,
        /// Provider error
        #[source]
        source: ProviderError,
    },

    /// Tags of one service could not be turned into records
    #[error("invalid tags on service '{service}': {source}")]
    AnnotationParse {
        /// Identity key of the service
        service: String,
        /// Parse error
        #[source]
        source: AnnotationError,
    },
}

impl SyncError {
    /// Returns a short, stable reason code for logs and metrics labels.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ClusterFetch(_) => "ClusterFetchError",
            Self::ProviderRead { .. } => "ProviderReadError",
            Self::ProviderWrite { .. } => "ProviderWriteError",
            Self::ProviderDelete { .. } => "ProviderDeleteError",
            Self::AnnotationParse { .. } => "AnnotationParseError",
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
