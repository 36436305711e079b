// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::node::NodeId;

/// Handle to an output port, produced by
/// [`ProcessGraph::output_port`](super::ProcessGraph::output_port).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputPortRef {
    pub node: NodeId,
    pub port: String,
}

/// Handle to an input port, produced by
/// [`ProcessGraph::input_port`](super::ProcessGraph::input_port).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputPortRef {
    pub node: NodeId,
    pub port: String,
}

/// Directed edge between two direct children of one protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connector {
    pub from: OutputPortRef,
    pub to: InputPortRef,
}

impl Connector {
    pub fn touches(&self, node: NodeId) -> bool {
        self.from.node == node || self.to.node == node
    }
}
