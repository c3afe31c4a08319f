// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! The cache adapter uses `#[async_trait]` for dynamic dispatch
//! compatibility; the engine holds it as `Arc<dyn CacheAdapter>`.

pub mod cache;

pub use cache::CacheAdapter;
