// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use thiserror::Error;

use crate::config::ParamKind;

/// Errors found while validating the structure of a graph description.
///
/// `protocol` is the dotted path of the protocol the problem was found in,
/// empty for the root graph.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Links inside one protocol form a cycle
    CyclicLinks {
        protocol: String,
        /// The node names along the cycle, first node repeated at the end
        cycle: Vec<String>,
    },
    /// A link or iface references a node that is not declared
    UnresolvedNode {
        protocol: String,
        /// What holds the reference, e.g. `link a.out -> b.in`
        referenced_by: String,
        node: String,
    },
    /// A node name is not a valid instance name
    InvalidInstanceName { protocol: String, name: String },
    /// Two links (or a link and an interface) feed the same input port
    DuplicateInput {
        protocol: String,
        node: String,
        port: String,
    },
}

fn scope(protocol: &str) -> &str {
    if protocol.is_empty() {
        "<root>"
    } else {
        protocol
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::CyclicLinks { protocol, cycle } => {
                write!(
                    f,
                    "Cyclic links detected in '{}': {}",
                    scope(protocol),
                    cycle.join(" -> ")
                )
            }
            ValidationError::UnresolvedNode {
                protocol,
                referenced_by,
                node,
            } => {
                write!(
                    f,
                    "In '{}', {} references node '{}' which does not exist",
                    scope(protocol),
                    referenced_by,
                    node
                )
            }
            ValidationError::InvalidInstanceName { protocol, name } => {
                write!(
                    f,
                    "In '{}', '{}' is not a valid instance name (letters, digits and underscores only)",
                    scope(protocol),
                    name
                )
            }
            ValidationError::DuplicateInput {
                protocol,
                node,
                port,
            } => {
                write!(
                    f,
                    "In '{}', input '{}' of node '{}' is fed more than once",
                    scope(protocol),
                    port,
                    node
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised when node config values do not match the node type's parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Unknown config parameter '{0}'")]
    UnknownParam(String),

    #[error("Mandatory config parameter '{0}' is missing")]
    MissingParam(String),

    #[error("Config parameter '{name}' expects a {expected} value, got {actual}")]
    InvalidType {
        name: String,
        expected: ParamKind,
        actual: String,
    },
}
