// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::ConfigValues;
use crate::errors::StoreError;
use crate::graph::{NodeId, NodeStatus, PortSpec, ResourceRef};

/// Stored state of one port.
#[derive(Debug, Clone, PartialEq)]
pub struct PortRecord {
    pub name: String,
    pub spec: PortSpec,
    pub dynamic: bool,
    pub resource: Option<ResourceRef>,
    pub provided: bool,
}

/// Stored state of one node, enough to restore it into a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub instance_name: String,
    pub type_id: String,
    pub config: ConfigValues,
    pub status: NodeStatus,
    pub error: Option<String>,
    pub inputs: Vec<PortRecord>,
    pub outputs: Vec<PortRecord>,
}

/// Persistence of node state, keyed by node id.
pub trait NodeStore: Send + Sync {
    fn load_node(&self, id: NodeId) -> Result<Option<NodeRecord>, StoreError>;

    fn save_node(&self, record: NodeRecord) -> Result<(), StoreError>;
}
