// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./tideway.toml` > `~/.config/tideway/tideway.toml`
//! > `/etc/tideway/tideway.toml` with environment variable overrides via the
//! `TIDEWAY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TidewayConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/tideway/tideway.toml` (system-wide)
/// 3. `~/.config/tideway/tideway.toml` (user XDG config)
/// 4. `./tideway.toml` (local directory)
/// 5. `TIDEWAY_*` environment variables
pub fn load_config() -> Result<TidewayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TidewayConfig::default()))
        .merge(Toml::file("/etc/tideway/tideway.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("tideway/tideway.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("tideway.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and for explicitly supplied config content.
pub fn load_config_from_str(toml_content: &str) -> Result<TidewayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TidewayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TidewayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TidewayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `TIDEWAY_QUEUE_MAX_RECEIVES` must map to
/// `queue.max_receives`, not `queue.max.receives`.
fn env_provider() -> Env {
    Env::prefixed("TIDEWAY_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: TIDEWAY_QUEUE_MAX_RECEIVES -> "queue_max_receives"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("worker_", "worker.", 1)
            .replacen("queue_", "queue.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("notify_", "notify.", 1)
            .replacen("attachments_", "attachments.", 1);
        mapped.into()
    })
}
