// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Paceline block engine.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, environment variable
//! overrides, and miette diagnostic rendering for configuration errors.
//!
//! # Usage
//!
//! ```no_run
//! use paceline_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("namespace: {}", config.engine.namespace);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::PacelineConfig;
pub use validation::validate_config;

/// Load configuration from the XDG hierarchy and validate it.
///
/// This is the high-level entry point that:
/// 1. Loads config from TOML files + env vars via Figment
/// 2. On success: runs post-deserialization validation
/// 3. On Figment error: converts to miette diagnostics
///
/// Returns either a valid `PacelineConfig` or a list of diagnostic errors.
pub fn load_and_validate() -> Result<PacelineConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![ConfigError::from(err)]),
    }
}

/// Load configuration from a specific TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<PacelineConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![ConfigError::from(err)]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_toml_loads_and_validates() {
        let config = load_and_validate_str(
            r#"
            [engine]
            namespace = "outreach"

            [blocks]
            max_leads = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.namespace, "outreach");
        assert_eq!(config.blocks.max_leads, 25);
    }

    #[test]
    fn semantic_errors_surface_after_parse() {
        let errors = load_and_validate_str(
            r#"
            [blocks]
            max_leads = 0
            "#,
        )
        .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("max_leads"));
    }

    #[test]
    fn parse_errors_become_diagnostics() {
        let errors = load_and_validate_str(
            r#"
            [blocks]
            no_such_field = true
            "#,
        )
        .unwrap_err();
        assert!(!errors.is_empty());
        let rendered = render_errors(&errors);
        assert!(rendered.contains("no_such_field"));
    }
}
