// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./paceline.toml` > `~/.config/paceline/paceline.toml`
//! > `/etc/paceline/paceline.toml` with environment variable overrides via the
//! `PACELINE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::PacelineConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/paceline/paceline.toml` (system-wide)
/// 3. `~/.config/paceline/paceline.toml` (user XDG config)
/// 4. `./paceline.toml` (local directory)
/// 5. `PACELINE_*` environment variables
pub fn load_config() -> Result<PacelineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PacelineConfig::default()))
        .merge(Toml::file("/etc/paceline/paceline.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("paceline/paceline.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("paceline.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<PacelineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PacelineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PacelineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PacelineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `PACELINE_BLOCKS_MAX_LEADS` must map to
/// `blocks.max_leads`, not `blocks.max.leads`.
fn env_provider() -> Env {
    Env::prefixed("PACELINE_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("engine_", "engine.", 1)
            .replacen("blocks_", "blocks.", 1)
            .replacen("cache_", "cache.", 1);
        mapped.into()
    })
}
