// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for node scheduling and execution events.
//!
//! This module contains message types for logging events related to:
//! * Run lifecycle (start, completion, failure)
//! * Per-node start and outcome
//! * Protocol settlement

use crate::errors::{ExecutionError, ExecutionErrorKind};
use crate::graph::NodeStatus;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A run was requested on a node that is ready.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use protograph::observability::messages::engine::RunStarted;
///
/// let msg = RunStarted { node: "pipeline", node_count: 5 };
///
/// tracing::info!("{}", msg);
/// ```
pub struct RunStarted<'a> {
    pub node: &'a str,
    pub node_count: usize,
}

impl Display for RunStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting run of '{}' ({} nodes in subtree)",
            self.node, self.node_count
        )
    }
}

impl StructuredLog for RunStarted<'_> {
    fn log(&self) {
        tracing::info!(node = self.node, node_count = self.node_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run",
            span_name = name,
            node = self.node,
            node_count = self.node_count,
        )
    }
}

/// A run was requested on a node that is not ready; nothing happened.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct RunSkipped<'a> {
    pub node: &'a str,
    pub status: NodeStatus,
}

impl Display for RunSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Skipping run of '{}': not ready (status {:?})",
            self.node, self.status
        )
    }
}

impl StructuredLog for RunSkipped<'_> {
    fn log(&self) {
        tracing::debug!(node = self.node, status = ?self.status, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("run", span_name = name, node = self.node)
    }
}

/// A run finished without task failures.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RunCompleted<'a> {
    pub node: &'a str,
    pub status: NodeStatus,
    pub duration: Duration,
}

impl Display for RunCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run of '{}' finished with status {:?} in {:?}",
            self.node, self.status, self.duration
        )
    }
}

impl StructuredLog for RunCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            node = self.node,
            status = ?self.status,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run",
            span_name = name,
            node = self.node,
            duration_ms = self.duration.as_millis() as u64,
        )
    }
}

/// A run finished with at least one failing node.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct RunFailed<'a> {
    pub node: &'a str,
    pub error: &'a ExecutionError,
    pub failure_count: usize,
}

impl Display for RunFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run of '{}' failed ({} failing nodes), first: {}",
            self.node, self.failure_count, self.error
        )
    }
}

impl StructuredLog for RunFailed<'_> {
    fn log(&self) {
        tracing::error!(
            node = self.node,
            failure_count = self.failure_count,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "run",
            span_name = name,
            node = self.node,
            failure_count = self.failure_count,
        )
    }
}

/// A node moved to `Running`.
///
/// # Log Level
/// `info!` - Important operational event
pub struct NodeStarted<'a> {
    pub node: &'a str,
    pub kind: &'a str,
}

impl Display for NodeStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Starting {} '{}'", self.kind, self.node)
    }
}

impl StructuredLog for NodeStarted<'_> {
    fn log(&self) {
        tracing::info!(node = self.node, kind = self.kind, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("node", span_name = name, node = self.node, kind = self.kind)
    }
}

/// A task returned outputs that satisfied its contract.
///
/// # Log Level
/// `info!` - Important operational event
pub struct NodeSucceeded<'a> {
    pub node: &'a str,
    pub duration: Duration,
}

impl Display for NodeSucceeded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Task '{}' succeeded in {:?}", self.node, self.duration)
    }
}

impl StructuredLog for NodeSucceeded<'_> {
    fn log(&self) {
        tracing::info!(
            node = self.node,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("node", span_name = name, node = self.node)
    }
}

/// A node ended in `Error`.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct NodeFailed<'a> {
    pub node: &'a str,
    pub error: &'a ExecutionErrorKind,
}

impl Display for NodeFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Node '{}' failed: {}", self.node, self.error)
    }
}

impl StructuredLog for NodeFailed<'_> {
    fn log(&self) {
        tracing::error!(node = self.node, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("node", span_name = name, node = self.node)
    }
}

/// A protocol's children stopped running and its status was derived.
///
/// # Log Level
/// `info!` on success, `warn!` otherwise
pub struct ProtocolSettled<'a> {
    pub node: &'a str,
    pub status: NodeStatus,
    pub pending: &'a [String],
}

impl Display for ProtocolSettled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.pending.is_empty() {
            write!(f, "Protocol '{}' settled as {:?}", self.node, self.status)
        } else {
            write!(
                f,
                "Protocol '{}' settled as {:?}, not finished: {}",
                self.node,
                self.status,
                self.pending.join(", ")
            )
        }
    }
}

impl StructuredLog for ProtocolSettled<'_> {
    fn log(&self) {
        if self.status == NodeStatus::Success {
            tracing::info!(node = self.node, status = ?self.status, "{}", self);
        } else {
            tracing::warn!(
                node = self.node,
                status = ?self.status,
                pending = self.pending.len(),
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("protocol", span_name = name, node = self.node)
    }
}
