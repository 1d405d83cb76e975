// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service tag parsing.
//!
//! Nomad services opt in to DNS publication through free-form tags:
//!
//! - `external-dns/hostname=<fqdn>` (required) names the record to publish.
//!   The FQDN must end in one of the configured domain filters.
//! - `external-dns/ttl=<duration>` (optional) sets the record TTL as a Go-style
//!   duration. A missing or unparseable TTL falls back to [`DEFAULT_TTL`].
//!
//! # Example
//!
//! ```
//! use nomad_external_dns::tags::parse_tags;
//! use std::time::Duration;
//!
//! let tags = vec!["external-dns/hostname=foo.example.com".to_string()];
//! let parsed = parse_tags(&tags, &["example.com".to_string()]).unwrap();
//!
//! assert_eq!(parsed.host, "foo");
//! assert_eq!(parsed.zone, "example.com.");
//! assert_eq!(parsed.ttl, Duration::from_secs(30));
//! ```

use crate::constants::{APEX_RECORD_NAME, DEFAULT_TTL, HOSTNAME_ANNOTATION_KEY, TTL_ANNOTATION_KEY};
use crate::duration::parse_duration;
use crate::errors::AnnotationError;
use std::time::Duration;
use tracing::warn;

/// DNS intent extracted from a service's tags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedTags {
    /// Relative record name (`@` for the zone apex)
    pub host: String,
    /// Matched zone, always fully qualified (trailing dot)
    pub zone: String,
    /// Record TTL
    pub ttl: Duration,
}

/// Extract hostname, zone and TTL from a service's tags.
///
/// The first hostname tag is used. The first configured domain that is a
/// suffix of the hostname wins; there is no longest-match tie-break.
///
/// # Arguments
///
/// * `tags` - Raw service tags
/// * `domains` - Configured domain filters, in priority order
///
/// # Errors
///
/// - [`AnnotationError::EmptyTags`] if `tags` is empty
/// - [`AnnotationError::MissingHostname`] if no tag carries the hostname key
/// - [`AnnotationError::Malformed`] if the hostname tag is not `key=value`
/// - [`AnnotationError::NoMatchingDomain`] if no domain filter matches
pub fn parse_tags(tags: &[String], domains: &[String]) -> Result<ParsedTags, AnnotationError> {
    if tags.is_empty() {
        return Err(AnnotationError::EmptyTags);
    }

    let mut hostname_tag = None;
    let mut ttl = DEFAULT_TTL;

    for tag in tags {
        if tag.starts_with(HOSTNAME_ANNOTATION_KEY) {
            if hostname_tag.is_none() {
                hostname_tag = Some(tag.as_str());
            }
        } else if tag.starts_with(TTL_ANNOTATION_KEY) {
            ttl = parse_ttl_tag(tag);
        }
    }

    let tag = hostname_tag.ok_or(AnnotationError::MissingHostname)?;
    let (host, zone) = parse_hostname_tag(tag, domains)?;

    Ok(ParsedTags { host, zone, ttl })
}

/// Returns true if any tag carries the hostname key.
#[must_use]
pub fn has_hostname_tag(tags: &[String]) -> bool {
    tags.iter().any(|tag| tag.starts_with(HOSTNAME_ANNOTATION_KEY))
}

/// Append a trailing dot if missing.
#[must_use]
pub fn ensure_fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

fn parse_hostname_tag(tag: &str, domains: &[String]) -> Result<(String, String), AnnotationError> {
    let hostname = split_tag_value(tag, HOSTNAME_ANNOTATION_KEY).ok_or_else(|| {
        AnnotationError::Malformed {
            tag: tag.to_string(),
        }
    })?;

    let hostname = hostname.trim_end_matches('.');

    for domain in domains {
        let domain = domain.trim_end_matches('.');
        if domain.is_empty() {
            continue;
        }

        if hostname == domain {
            return Ok((APEX_RECORD_NAME.to_string(), ensure_fqdn(domain)));
        }

        if let Some(host) = hostname
            .strip_suffix(domain)
            .and_then(|prefix| prefix.strip_suffix('.'))
        {
            if !host.is_empty() {
                return Ok((host.to_string(), ensure_fqdn(domain)));
            }
        }
    }

    Err(AnnotationError::NoMatchingDomain {
        hostname: hostname.to_string(),
    })
}

fn parse_ttl_tag(tag: &str) -> Duration {
    let Some(raw) = split_tag_value(tag, TTL_ANNOTATION_KEY) else {
        warn!(tag = %tag, "Malformed TTL tag, using default TTL");
        return DEFAULT_TTL;
    };

    match parse_duration(raw) {
        Ok(ttl) => ttl,
        Err(e) => {
            warn!(tag = %tag, error = %e, "Invalid TTL, using default TTL");
            DEFAULT_TTL
        }
    }
}

/// Returns the value of a `key=value` tag, or `None` unless the tag splits on
/// `key=` into exactly two parts.
fn split_tag_value<'a>(tag: &'a str, key: &str) -> Option<&'a str> {
    let separator = format!("{key}=");
    let mut parts = tag.split(separator.as_str());
    let (Some(""), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };
    Some(value)
}

#[cfg(test)]
#[path = "tags_tests.rs"]
mod tags_tests;
