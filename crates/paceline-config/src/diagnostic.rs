// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diagnostic error type for configuration loading and validation.

use miette::Diagnostic;
use thiserror::Error;

/// A configuration error with diagnostic metadata for miette rendering.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// The configuration sources could not be parsed or merged.
    #[error("configuration could not be loaded: {source}")]
    #[diagnostic(
        code(paceline::config::load),
        help("check paceline.toml syntax and PACELINE_* environment variables")
    )]
    Load {
        #[source]
        source: Box<figment::Error>,
    },

    /// A configuration value failed semantic validation.
    #[error("invalid configuration: {message}")]
    #[diagnostic(code(paceline::config::invalid_value))]
    Validation {
        /// Which key failed and why, e.g. `blocks.max_leads must be at least 1`.
        message: String,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(source: figment::Error) -> Self {
        Self::Load {
            source: Box::new(source),
        }
    }
}

/// Render a list of config errors into a single human-readable report.
///
/// One line per error; used by embedding applications that do not install a
/// miette report handler.
pub fn render_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}
