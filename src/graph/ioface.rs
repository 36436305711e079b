// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use super::node::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IofaceKind {
    Interface,
    Outerface,
}

impl fmt::Display for IofaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IofaceKind::Interface => f.write_str("interface"),
            IofaceKind::Outerface => f.write_str("outerface"),
        }
    }
}

/// Binds a protocol boundary port `name` to a port of one of its direct children.
/// Both ports share the same slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ioface {
    pub name: String,
    pub child: NodeId,
    pub port: String,
}
