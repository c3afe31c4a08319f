// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty namespaces and non-zero capacities.

use crate::diagnostic::ConfigError;
use crate::model::PacelineConfig;

/// Channels the engine knows how to schedule touches on.
const KNOWN_CHANNELS: &[&str] = &["sms", "email"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &PacelineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let namespace = config.engine.namespace.trim();
    if namespace.is_empty() {
        errors.push(ConfigError::Validation {
            message: "engine.namespace must not be empty".to_string(),
        });
    } else if namespace.contains(':') || namespace.contains(char::is_whitespace) {
        // The namespace is the first segment of every cache key; a colon
        // would collide with the key delimiter.
        errors.push(ConfigError::Validation {
            message: format!(
                "engine.namespace `{namespace}` must not contain `:` or whitespace"
            ),
        });
    }

    if config.engine.query_batch_limit == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.query_batch_limit must be at least 1".to_string(),
        });
    }

    if config.blocks.max_leads == 0 {
        errors.push(ConfigError::Validation {
            message: "blocks.max_leads must be at least 1".to_string(),
        });
    }

    if config.blocks.max_touches_per_lead == 0 {
        errors.push(ConfigError::Validation {
            message: "blocks.max_touches_per_lead must be at least 1".to_string(),
        });
    } else if config.blocks.max_touches_per_lead > 100 {
        errors.push(ConfigError::Validation {
            message: format!(
                "blocks.max_touches_per_lead must be at most 100, got {}",
                config.blocks.max_touches_per_lead
            ),
        });
    }

    if !KNOWN_CHANNELS.contains(&config.blocks.channel.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "blocks.channel `{}` is not recognized (expected one of: {})",
                config.blocks.channel,
                KNOWN_CHANNELS.join(", ")
            ),
        });
    }

    if config.cache.block_ttl_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "cache.block_ttl_secs must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
