// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! [`StructuredLog`] for the level and the structured fields.
//!
//! # Organization
//!
//! * `engine` - node scheduling and execution events
//! * `builder` - graph construction, rebuild and persistence
//! * `validation` - graph description validation
//!
//! # Usage Pattern
//!
//! ```rust
//! use protograph::observability::messages::engine::RunStarted;
//! use protograph::observability::messages::StructuredLog;
//!
//! let msg = RunStarted { node: "pipeline", node_count: 5 };
//! msg.log();
//! ```

use tracing::Span;

pub mod builder;
pub mod engine;
pub mod validation;

/// A message that logs itself at its own level with structured fields.
pub trait StructuredLog {
    /// Emits the message as a tracing event.
    fn log(&self);

    /// Opens a span carrying the message fields.
    fn span(&self, name: &str) -> Span;
}
