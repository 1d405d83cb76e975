// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tracing subscriber setup.
//!
//! Format: timestamp file:line LEVEL message
//! Example: 2025-11-29T23:45:00.123456Z scheduler.rs:126 INFO Starting worker
//!
//! `RUST_LOG` wins over the configured level, and `RUST_LOG_FORMAT`
//! (`json` or `text`) wins over the configured format.

use crate::config::LogFormat;
use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Resolve the output format, letting `RUST_LOG_FORMAT` override the config.
#[must_use]
pub fn resolve_format(configured: LogFormat, env_override: Option<&str>) -> LogFormat {
    match env_override.map(str::to_lowercase).as_deref() {
        Some("json") => LogFormat::Json,
        Some("text" | "compact") => LogFormat::Text,
        _ => configured,
    }
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init(log_level: &str, log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let format = resolve_format(log_format, std::env::var("RUST_LOG_FORMAT").ok().as_deref());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(true)
        .with_target(false);

    match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.with_ansi(true).compact().try_init(),
    }
    .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod telemetry_tests;
