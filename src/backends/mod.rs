// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Collaborator implementations bundled with the crate.
//!
//! # Available Backends
//!
//! ## Memory Backend
//! - **InMemoryNodeStore**: node records in a map, for tests and short-lived graphs
//! - **InMemoryResourceCodec**: resource content in a map keyed by reference id
//!
//! ## Tracing Progress
//! - **TracingProgress**: the default [`ProgressSink`](crate::traits::ProgressSink),
//!   reporting through `tracing`
//!
//! ## Stub Backend (Test-Only)
//! Small numeric tasks and recording sinks for engine and builder tests
//! (only available in test builds).

pub mod memory;
#[cfg(test)]
pub mod stub;
pub mod tracing_progress;

pub use memory::{InMemoryNodeStore, InMemoryResourceCodec};
pub use tracing_progress::TracingProgress;
