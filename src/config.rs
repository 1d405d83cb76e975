// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Runtime configuration.
//!
//! Configuration is read from a TOML file and then overlaid with environment
//! variables. An override variable is named after the dotted key, upper-cased,
//! with sections joined by a double underscore:
//!
//! ```text
//! NOMAD_EXTERNAL_DNS_APP__UPDATE_INTERVAL=15s     -> app.update_interval
//! NOMAD_EXTERNAL_DNS_DNS__DOMAIN_FILTERS=a.com,b.com
//! NOMAD_EXTERNAL_DNS_PROVIDER__ROUTE53__REGION=eu-west-1
//! ```
//!
//! Values are parsed as TOML literals (`true`, `3`, `["a", "b"]`) and fall
//! back to plain strings. The usual tool variables (`NOMAD_ADDR`,
//! `NOMAD_TOKEN`, `AWS_ACCESS_KEY_ID`, `CLOUDFLARE_API_TOKEN`, ...) fill in
//! values that are still unset afterwards.
//!
//! # Example
//!
//! ```toml
//! [app]
//! update_interval = "30s"
//! prune_interval = "1m"
//!
//! [dns]
//! provider = "cloudflare"
//! domain_filters = ["svc.example.com"]
//! owner_uuid = "team-x"
//!
//! [provider.cloudflare]
//! api_token = "..."
//! ```

use crate::constants::{
    DEFAULT_CONFIG_PATH, DEFAULT_NOMAD_ADDRESS, DEFAULT_PRUNE_INTERVAL, DEFAULT_ROUTE53_MAX_RETRIES,
    DEFAULT_UPDATE_INTERVAL, ENV_PREFIX,
};
use crate::duration::deserialize_duration;
use crate::errors::ConfigError;
use serde::{Deserialize, Deserializer};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

// ============================================================================
// Config Sections
// ============================================================================

/// Top-level configuration document.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub dns: DnsConfig,
    pub nomad: NomadConfig,
    pub provider: ProviderConfig,
}

/// `[app]` section: process behaviour.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    pub log_format: LogFormat,
    /// Interval between reconciliation cycles
    #[serde(deserialize_with = "deserialize_duration")]
    pub update_interval: Duration,
    /// Interval between prune cycles; must not be shorter than `update_interval`
    #[serde(deserialize_with = "deserialize_duration")]
    pub prune_interval: Duration,
    /// Log provider writes and deletes instead of performing them
    pub dry_run: bool,
    /// Address for the `/metrics` and `/healthz` endpoint; disabled when unset
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            update_interval: DEFAULT_UPDATE_INTERVAL,
            prune_interval: DEFAULT_PRUNE_INTERVAL,
            dry_run: false,
            metrics_addr: None,
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    #[serde(alias = "compact")]
    Text,
    Json,
}

/// `[dns]` section: what to publish and where.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DnsConfig {
    /// Provider backend (`route53` or `cloudflare`)
    pub provider: String,
    /// Domains under management; a service hostname must end in one of them
    #[serde(deserialize_with = "deserialize_string_list")]
    pub domain_filters: Vec<String>,
    /// Owner identifier embedded in every ownership marker
    pub owner_uuid: String,
}

/// `[nomad]` section: cluster API access.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NomadConfig {
    pub address: Option<String>,
    pub token: Option<String>,
    pub region: Option<String>,
}

impl NomadConfig {
    /// Configured address, or the local agent default.
    #[must_use]
    pub fn address(&self) -> &str {
        self.address.as_deref().unwrap_or(DEFAULT_NOMAD_ADDRESS)
    }
}

/// `[provider.*]` sections: backend credentials.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub route53: Route53Config,
    pub cloudflare: CloudflareConfig,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Route53Config {
    pub region: Option<String>,
    /// Retries for rate-limited or failed API calls
    pub max_retries: u32,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    /// API base URL override
    pub endpoint: Option<String>,
}

impl Default for Route53Config {
    fn default() -> Self {
        Self {
            region: None,
            max_retries: DEFAULT_ROUTE53_MAX_RETRIES,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            endpoint: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CloudflareConfig {
    pub api_token: Option<String>,
    /// API base URL override
    pub endpoint: Option<String>,
}

/// Supported DNS provider backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    Route53,
    Cloudflare,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Route53 => "route53",
            Self::Cloudflare => "cloudflare",
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Something worth logging that happened while loading the configuration.
///
/// Loading runs before the subscriber exists, so these are collected and
/// emitted with [`LoadNotice::log`] once telemetry is up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadNotice {
    /// The default config file does not exist
    MissingDefaultFile {
        /// Path that was tried
        path: String,
    },
    /// A prefixed variable overrode a key
    Override {
        /// Variable name
        variable: String,
        /// Dotted key it was applied to
        key: String,
    },
    /// A prefixed variable did not map to a key and was ignored
    Malformed {
        /// Variable name
        variable: String,
    },
    /// A standard tool variable filled an unset value
    FromEnvironment {
        /// Variable name
        variable: String,
    },
}

impl LoadNotice {
    /// Emit the notice at its level.
    pub fn log(&self) {
        match self {
            Self::MissingDefaultFile { path } => {
                warn!(path = %path, "Config file not found, using defaults and environment");
            }
            Self::Override { variable, key } => {
                debug!(variable = %variable, key = %key, "Applying configuration override");
            }
            Self::Malformed { variable } => {
                warn!(variable = %variable, "Ignoring malformed configuration variable");
            }
            Self::FromEnvironment { variable } => {
                debug!(variable = %variable, "Using value from environment");
            }
        }
    }
}

impl Config {
    /// Load, overlay and validate the configuration.
    ///
    /// With `path == None` the default `config.toml` is tried and a missing
    /// file only produces a notice. An explicit path must exist. Nothing is
    /// logged here; the returned notices are for the caller to log.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or if the
    /// resulting configuration is invalid.
    pub fn load(path: Option<&Path>) -> Result<(Self, Vec<LoadNotice>), ConfigError> {
        let explicit = path.is_some();
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        let mut notices = Vec::new();

        let table = match std::fs::read_to_string(path) {
            Ok(contents) => parse_table(&contents)?,
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                notices.push(LoadNotice::MissingDefaultFile {
                    path: path.display().to_string(),
                });
                toml::Table::new()
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        };

        let (config, overlay) =
            Self::from_sources(table, std::env::vars(), |key| std::env::var(key).ok())?;
        notices.extend(overlay);
        config.validate()?;
        Ok((config, notices))
    }

    /// Parse a TOML document without any environment overlay.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is not valid.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        into_config(parse_table(contents)?)
    }

    /// Build a configuration from a parsed document, prefixed override
    /// variables and a lookup for the standard tool variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the merged document does not
    /// deserialize.
    pub fn from_sources<I, F>(
        mut table: toml::Table,
        vars: I,
        lookup: F,
    ) -> Result<(Self, Vec<LoadNotice>), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
        F: Fn(&str) -> Option<String>,
    {
        let mut notices = apply_env_overlay(&mut table, vars);
        let mut config = into_config(table)?;
        config.apply_standard_env(lookup, &mut notices);
        Ok((config, notices))
    }

    /// Fill unset values from the standard tool environment variables.
    fn apply_standard_env<F>(&mut self, lookup: F, notices: &mut Vec<LoadNotice>)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut fill = |slot: &mut Option<String>, var: &str| {
            if fill_from_env(slot, &lookup, var) {
                notices.push(LoadNotice::FromEnvironment {
                    variable: var.to_string(),
                });
            }
        };

        fill(&mut self.nomad.address, "NOMAD_ADDR");
        fill(&mut self.nomad.token, "NOMAD_TOKEN");
        fill(&mut self.nomad.region, "NOMAD_REGION");

        let route53 = &mut self.provider.route53;
        fill(&mut route53.access_key_id, "AWS_ACCESS_KEY_ID");
        fill(&mut route53.secret_access_key, "AWS_SECRET_ACCESS_KEY");
        fill(&mut route53.session_token, "AWS_SESSION_TOKEN");
        fill(&mut route53.region, "AWS_REGION");

        fill(&mut self.provider.cloudflare.api_token, "CLOUDFLARE_API_TOKEN");
        fill(&mut self.provider.cloudflare.api_token, "CF_API_TOKEN");
    }

    /// Check the configuration before any worker is started.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app.update_interval.is_zero() {
            return Err(ConfigError::ZeroInterval {
                field: "app.update_interval".to_string(),
            });
        }
        if self.app.prune_interval.is_zero() {
            return Err(ConfigError::ZeroInterval {
                field: "app.prune_interval".to_string(),
            });
        }
        validate_intervals(self.app.update_interval, self.app.prune_interval)?;

        if self.domains().is_empty() {
            return Err(ConfigError::NoDomains);
        }
        if self.dns.owner_uuid.trim().is_empty() {
            return Err(ConfigError::MissingOwner);
        }

        match self.provider_kind()? {
            ProviderKind::Route53 => {
                let route53 = &self.provider.route53;
                require(&route53.access_key_id, ProviderKind::Route53, "access_key_id")?;
                require(&route53.secret_access_key, ProviderKind::Route53, "secret_access_key")?;
            }
            ProviderKind::Cloudflare => {
                require(&self.provider.cloudflare.api_token, ProviderKind::Cloudflare, "api_token")?;
            }
        }

        Ok(())
    }

    /// Selected provider backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownProvider`] for an unsupported name.
    pub fn provider_kind(&self) -> Result<ProviderKind, ConfigError> {
        match self.dns.provider.trim().to_ascii_lowercase().as_str() {
            "route53" => Ok(ProviderKind::Route53),
            "cloudflare" => Ok(ProviderKind::Cloudflare),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }

    /// Configured domain filters, trimmed, with empty entries dropped.
    #[must_use]
    pub fn domains(&self) -> Vec<String> {
        self.dns
            .domain_filters
            .iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect()
    }
}

/// Enforce `prune >= update`.
///
/// # Errors
///
/// Returns [`ConfigError::PruneIntervalTooShort`] if pruning would run more
/// often than updating.
pub fn validate_intervals(update: Duration, prune: Duration) -> Result<(), ConfigError> {
    if prune < update {
        return Err(ConfigError::PruneIntervalTooShort { prune, update });
    }
    Ok(())
}

fn parse_table(contents: &str) -> Result<toml::Table, ConfigError> {
    toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
}

fn into_config(table: toml::Table) -> Result<Config, ConfigError> {
    toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))
}

/// Returns true if the slot was empty and `var` filled it.
fn fill_from_env<F>(slot: &mut Option<String>, lookup: &F, var: &str) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    if slot.as_deref().is_some_and(|v| !v.is_empty()) {
        return false;
    }
    match lookup(var).filter(|v| !v.is_empty()) {
        Some(value) => {
            *slot = Some(value);
            true
        }
        None => false,
    }
}

fn require(value: &Option<String>, provider: ProviderKind, field: &str) -> Result<(), ConfigError> {
    if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
        return Err(ConfigError::MissingCredential {
            provider: provider.as_str().to_string(),
            field: format!("provider.{}.{field}", provider.as_str()),
        });
    }
    Ok(())
}

// ============================================================================
// Environment Overlay
// ============================================================================

/// Merge `NOMAD_EXTERNAL_DNS_*` variables into the document.
fn apply_env_overlay<I>(table: &mut toml::Table, vars: I) -> Vec<LoadNotice>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut notices = Vec::new();
    for (name, raw) in vars {
        let Some(key) = name.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let path: Vec<String> = key
            .to_ascii_lowercase()
            .split("__")
            .map(str::to_string)
            .collect();
        if path.iter().any(String::is_empty) {
            notices.push(LoadNotice::Malformed { variable: name });
            continue;
        }

        insert_path(table, &path, env_value(&raw));
        notices.push(LoadNotice::Override {
            variable: name,
            key: path.join("."),
        });
    }
    notices
}

fn insert_path(table: &mut toml::Table, path: &[String], value: toml::Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = table;
    for segment in parents {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        if !entry.is_table() {
            *entry = toml::Value::Table(toml::Table::new());
        }
        let toml::Value::Table(next) = entry else {
            return;
        };
        current = next;
    }
    current.insert(last.clone(), value);
}

/// Parse a variable as a TOML literal, falling back to a plain string.
fn env_value(raw: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("value = {raw}"))
        .ok()
        .and_then(|mut t| t.remove("value"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}

/// Accept either a list of strings or one comma-separated string.
fn deserialize_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        One(String),
        Many(Vec<String>),
    }

    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::One(joined) => joined
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        StringOrList::Many(list) => list,
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
