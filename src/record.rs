// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS record model and record synthesis.
//!
//! Every published service produces exactly two records sharing name, zone
//! and TTL:
//!
//! - an address record (`A` or `AAAA`) whose value is the comma-joined list
//!   of backend addresses
//! - a `TXT` ownership marker identifying the service and the owner instance
//!
//! The ownership marker is the only signal the pruner uses to decide whether
//! a provider record belongs to this instance.

use crate::constants::{ADDRESS_SEPARATOR, APEX_RECORD_NAME, PROGRAM_ID};
use crate::errors::AnnotationError;
use crate::service::{identity_key, ServiceDescriptor};
use crate::tags::parse_tags;
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

/// DNS record types handled by this program.
///
/// `Other` only exists so that provider reads of unrelated record types can be
/// represented; the synthesizer never emits it.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    AAAA,
    TXT,
    Other(String),
}

impl RecordType {
    /// Wire name of the record type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::A => "A",
            Self::AAAA => "AAAA",
            Self::TXT => "TXT",
            Self::Other(other) => other,
        }
    }

    /// Returns true for `A` and `AAAA`.
    #[must_use]
    pub fn is_address(&self) -> bool {
        matches!(self, Self::A | Self::AAAA)
    }
}

impl From<&str> for RecordType {
    fn from(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "A" => Self::A,
            "AAAA" => Self::AAAA,
            "TXT" => Self::TXT,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single DNS record, with its name relative to the zone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub record_type: RecordType,
    /// Relative name (`@` for the zone apex)
    pub name: String,
    /// Record data; address records may hold a comma-joined list
    pub value: String,
    pub ttl: Duration,
}

impl Record {
    #[must_use]
    pub fn new(
        record_type: RecordType,
        name: impl Into<String>,
        value: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            record_type,
            name: name.into(),
            value: value.into(),
            ttl,
        }
    }

    /// Individual values held by this record.
    ///
    /// Address records are split on commas. Any other type yields its value
    /// unchanged.
    #[must_use]
    pub fn split_values(&self) -> Vec<String> {
        if self.record_type.is_address() {
            self.value
                .split(ADDRESS_SEPARATOR)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            vec![self.value.clone()]
        }
    }
}

/// Records destined for one zone; the unit of a provider write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordSet {
    /// Zone, fully qualified
    pub zone: String,
    pub records: Vec<Record>,
}

/// Owned provider records sharing one relative name in one zone.
///
/// The unit of deletion during pruning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordGroup {
    pub name: String,
    pub zone: String,
    pub records: Vec<Record>,
}

impl RecordGroup {
    /// Decode the ownership marker of this group.
    ///
    /// Returns the first `TXT` record that is owned by `owner` and decodes.
    #[must_use]
    pub fn ownership_marker(&self, owner: &str) -> Option<OwnershipMarker> {
        self.records
            .iter()
            .filter(|r| r.record_type == RecordType::TXT)
            .filter(|r| OwnershipMarker::is_owned_by(&r.value, owner))
            .find_map(|r| OwnershipMarker::parse(&r.value))
    }
}

/// The `TXT` value that marks a record pair as owned by this program.
///
/// Format: `service=<name> namespace=<ns> owner=<owner> created-by=nomad-external-dns`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnershipMarker {
    pub service: String,
    pub namespace: String,
    pub owner: String,
    pub created_by: String,
}

impl OwnershipMarker {
    #[must_use]
    pub fn new(service: &str, namespace: &str, owner: &str) -> Self {
        Self {
            service: service.to_string(),
            namespace: namespace.to_string(),
            owner: owner.to_string(),
            created_by: PROGRAM_ID.to_string(),
        }
    }

    /// Decode a marker from a `TXT` value.
    ///
    /// Surrounding double quotes are stripped and fields may appear in any
    /// order. Returns `None` unless both `service` and `namespace` are present.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let mut service = None;
        let mut namespace = None;
        let mut owner = String::new();
        let mut created_by = String::new();

        for field in unquote(value).split_whitespace() {
            match field.split_once('=') {
                Some(("service", v)) => service = Some(v.to_string()),
                Some(("namespace", v)) => namespace = Some(v.to_string()),
                Some(("owner", v)) => owner = v.to_string(),
                Some(("created-by", v)) => created_by = v.to_string(),
                _ => {}
            }
        }

        Some(Self {
            service: service.filter(|s| !s.is_empty())?,
            namespace: namespace.filter(|n| !n.is_empty())?,
            owner,
            created_by,
        })
    }

    /// Returns true if the `TXT` value carries the exact `owner=<owner>` token.
    #[must_use]
    pub fn is_owned_by(value: &str, owner: &str) -> bool {
        let token = format!("owner={owner}");
        unquote(value).split_whitespace().any(|field| field == token)
    }

    /// Identity key of the service this marker names.
    #[must_use]
    pub fn identity_key(&self) -> String {
        identity_key(&self.namespace, &self.service)
    }
}

impl fmt::Display for OwnershipMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "service={} namespace={} owner={} created-by={}",
            self.service, self.namespace, self.owner, self.created_by
        )
    }
}

fn unquote(value: &str) -> &str {
    let trimmed = value.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(trimmed)
}

/// Turn a service into its address record and ownership marker.
///
/// # Arguments
///
/// * `service` - Service to publish
/// * `domains` - Configured domain filters
/// * `owner` - Owner identifier embedded in the marker
///
/// # Returns
///
/// A [`RecordSet`] holding exactly `[address, TXT]` for the matched zone.
///
/// # Errors
///
/// Returns [`AnnotationError`] if the service has no tags or its tags cannot
/// be parsed.
pub fn synthesize(
    service: &ServiceDescriptor,
    domains: &[String],
    owner: &str,
) -> Result<RecordSet, AnnotationError> {
    if service.tags.is_empty() {
        return Err(AnnotationError::EmptyTags);
    }

    let parsed = parse_tags(&service.tags, domains)?;

    let address_type = service
        .addresses
        .first()
        .map(String::as_str)
        .map_or(RecordType::A, address_record_type);
    let addresses = service
        .addresses
        .join(&ADDRESS_SEPARATOR.to_string());
    let marker = OwnershipMarker::new(&service.name, &service.namespace, owner);

    Ok(RecordSet {
        zone: parsed.zone,
        records: vec![
            Record::new(address_type, parsed.host.clone(), addresses, parsed.ttl),
            Record::new(RecordType::TXT, parsed.host, marker.to_string(), parsed.ttl),
        ],
    })
}

/// `AAAA` for an IPv6 literal, otherwise `A`.
#[must_use]
pub fn address_record_type(address: &str) -> RecordType {
    match address.parse::<IpAddr>() {
        Ok(IpAddr::V6(_)) => RecordType::AAAA,
        _ => RecordType::A,
    }
}

/// Convert a provider record name to the form relative to `zone`.
///
/// Accepts fully qualified names (with or without the trailing dot) and
/// names that are already relative. The zone apex becomes `@`.
#[must_use]
pub fn relative_name(name: &str, zone: &str) -> String {
    let zone = zone.trim_end_matches('.');
    let name = name.trim_end_matches('.');

    if name.is_empty() || name == APEX_RECORD_NAME || name.eq_ignore_ascii_case(zone) {
        return APEX_RECORD_NAME.to_string();
    }

    let split = name.len().saturating_sub(zone.len());
    if name.len() > zone.len() + 1 && name.is_char_boundary(split) {
        let (prefix, suffix) = name.split_at(split);
        if suffix.eq_ignore_ascii_case(zone) {
            if let Some(host) = prefix.strip_suffix('.') {
                return host.to_string();
            }
        }
    }

    name.to_string()
}

/// Convert a relative record name to a fully qualified name in `zone`.
#[must_use]
pub fn absolute_name(name: &str, zone: &str) -> String {
    let zone = zone.trim_end_matches('.');
    if name == APEX_RECORD_NAME || name.is_empty() {
        format!("{zone}.")
    } else {
        format!("{name}.{zone}.")
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod record_tests;
