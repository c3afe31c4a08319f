// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Paceline outreach engine.
//!
//! This crate provides the error taxonomy, the shared vocabulary types
//! (channels, reply intents, health status), and the cache adapter trait the
//! engine coordinates through. Concrete cache backends and the block/touch
//! engine itself live in sibling crates.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::PacelineError;
pub use traits::CacheAdapter;
pub use types::{ContactChannel, HealthStatus, ReplyIntent};
