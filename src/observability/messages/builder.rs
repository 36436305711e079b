// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for graph construction events.
//!
//! This module contains message types for logging events related to:
//! * Materializing a graph description
//! * Rebuilding a protocol in place
//! * Persisting node records

use crate::errors::BuildError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A graph description is about to be materialized.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use protograph::observability::messages::builder::GraphBuildStarted;
///
/// let msg = GraphBuildStarted { name: "pipeline", strategy: "CreateNew", node_count: 3 };
///
/// tracing::info!("{}", msg);
/// ```
pub struct GraphBuildStarted<'a> {
    pub name: &'a str,
    pub strategy: &'a str,
    pub node_count: usize,
}

impl Display for GraphBuildStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Building graph '{}' with {} strategy: {} top-level nodes",
            self.name, self.strategy, self.node_count
        )
    }
}

impl StructuredLog for GraphBuildStarted<'_> {
    fn log(&self) {
        tracing::info!(
            name = self.name,
            strategy = self.strategy,
            node_count = self.node_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "build",
            span_name = name,
            graph = self.name,
            strategy = self.strategy,
        )
    }
}

/// A graph was materialized.
///
/// # Log Level
/// `info!` - Important operational event
pub struct GraphBuildCompleted<'a> {
    pub name: &'a str,
    pub node_count: usize,
    pub duration: Duration,
}

impl Display for GraphBuildCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Graph '{}' built with {} nodes in {:?}",
            self.name, self.node_count, self.duration
        )
    }
}

impl StructuredLog for GraphBuildCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            name = self.name,
            node_count = self.node_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("build", span_name = name, graph = self.name)
    }
}

/// Building or rebuilding a graph failed; nothing was changed.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct GraphBuildFailed<'a> {
    pub name: &'a str,
    pub error: &'a BuildError,
}

impl Display for GraphBuildFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Building graph '{}' failed: {}", self.name, self.error)
    }
}

impl StructuredLog for GraphBuildFailed<'_> {
    fn log(&self) {
        tracing::error!(
            name = self.name,
            path = self.error.path.as_str(),
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("build", span_name = name, graph = self.name)
    }
}

/// A node was instantiated from a stored record.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct NodeRestored<'a> {
    pub node: &'a str,
    pub type_id: &'a str,
    pub status: &'a str,
}

impl Display for NodeRestored<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Restored node '{}' of type '{}' with status {}",
            self.node, self.type_id, self.status
        )
    }
}

impl StructuredLog for NodeRestored<'_> {
    fn log(&self) {
        tracing::debug!(
            node = self.node,
            type_id = self.type_id,
            status = self.status,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("restore", span_name = name, node = self.node)
    }
}

/// Node records were written to a store.
///
/// # Log Level
/// `info!` - Important operational event
pub struct GraphPersisted<'a> {
    pub name: &'a str,
    pub record_count: usize,
}

impl Display for GraphPersisted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Persisted {} node records of '{}'",
            self.record_count, self.name
        )
    }
}

impl StructuredLog for GraphPersisted<'_> {
    fn log(&self) {
        tracing::info!(name = self.name, record_count = self.record_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("persist", span_name = name, graph = self.name)
    }
}
