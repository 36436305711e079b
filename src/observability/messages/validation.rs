// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for graph description validation.
//!
//! This module contains message types for logging events related to:
//! * Cyclic link detection
//! * Unresolved node references
//! * Validation outcome

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

fn level_name(protocol: &str) -> &str {
    if protocol.is_empty() {
        "<root>"
    } else {
        protocol
    }
}

/// Links of one protocol level form a cycle.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use protograph::observability::messages::validation::CyclicLinksDetected;
///
/// let cycle = vec!["a", "b", "a"];
/// let msg = CyclicLinksDetected { protocol: "outer", cycle: &cycle };
///
/// tracing::error!("{}", msg);
/// ```
pub struct CyclicLinksDetected<'a> {
    pub protocol: &'a str,
    pub cycle: &'a [&'a str],
}

impl Display for CyclicLinksDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Cyclic links detected in protocol '{}': {}",
            level_name(self.protocol),
            self.cycle.join(" -> ")
        )
    }
}

impl StructuredLog for CyclicLinksDetected<'_> {
    fn log(&self) {
        tracing::error!(
            protocol = level_name(self.protocol),
            cycle = self.cycle.join(" -> "),
            cycle_length = self.cycle.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            protocol = level_name(self.protocol),
            cycle = self.cycle.join(" -> "),
        )
    }
}

/// A link or iface names a node that is not declared on its level.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct UnresolvedNodeReference<'a> {
    pub protocol: &'a str,
    pub referenced_by: &'a str,
    pub node: &'a str,
}

impl Display for UnresolvedNodeReference<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} in protocol '{}' references unknown node '{}'",
            self.referenced_by,
            level_name(self.protocol),
            self.node
        )
    }
}

impl StructuredLog for UnresolvedNodeReference<'_> {
    fn log(&self) {
        tracing::error!(
            protocol = level_name(self.protocol),
            referenced_by = self.referenced_by,
            node = self.node,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            protocol = level_name(self.protocol),
            node = self.node,
        )
    }
}

/// Validation of a graph description failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ValidationFailed {
    pub error_count: usize,
}

impl Display for ValidationFailed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Graph description validation failed with {} errors",
            self.error_count
        )
    }
}

impl StructuredLog for ValidationFailed {
    fn log(&self) {
        tracing::error!(error_count = self.error_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            error_count = self.error_count,
        )
    }
}
