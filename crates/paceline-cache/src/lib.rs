// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cache adapter implementations for the Paceline block engine.
//!
//! The engine talks to its shared cache exclusively through the
//! [`CacheAdapter`] trait defined in `paceline-core`. This crate provides
//! the bundled in-process implementation; deployments that share state
//! across processes plug in their own adapter.

pub mod memory;

pub use memory::MemoryCache;

pub use paceline_core::CacheAdapter;
