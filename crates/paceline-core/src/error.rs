// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Paceline outreach engine.

use thiserror::Error;

/// The primary error type used across the cache adapter trait and core operations.
///
/// Cache failures deserve a note: adapters return [`PacelineError::Cache`],
/// but the engine's store layer converts those into degraded reads/writes
/// (logged, not escalated), so callers of the engine only ever see the
/// first three variants plus `Serialization`/`Internal`.
#[derive(Debug, Error)]
pub enum PacelineError {
    /// Malformed identifiers or configuration (empty ids, ids containing the
    /// key delimiter, zero capacities, out-of-range touch numbers).
    #[error("validation error: {0}")]
    Validation(String),

    /// An operation was attempted from a lifecycle state that forbids it,
    /// e.g. starting a block that is not `preparing`.
    #[error("invalid state: {message}")]
    InvalidState { message: String },

    /// An operation was addressed at an entity that does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Cache backend errors (connection failure, timeout, backend-specific).
    #[error("cache error: {message}")]
    Cache {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A cached payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PacelineError {
    /// Shorthand for an `InvalidState` error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Shorthand for a `Cache` error without an underlying source.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
            source: None,
        }
    }
}
