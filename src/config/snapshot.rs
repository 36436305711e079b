// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Declarative graph descriptions.
//!
//! A [`GraphSnapshot`] is inert data: the [`GraphBuilder`](crate::builder::GraphBuilder)
//! turns it into a live [`ProcessGraph`](crate::graph::ProcessGraph), and
//! [`ProcessGraph::dump`](crate::graph::ProcessGraph::dump) produces one back.
//!
//! ```yaml
//! nodes:
//!   load: { type: LoadTable, config: { path: data.csv } }
//!   sub:
//!     type: Protocol
//!     graph:
//!       nodes: { clean: { type: Clean } }
//!       interfaces: { table: { to: { node: clean, port: in } } }
//! links:
//!   - { from: { node: load, port: out }, to: { node: sub, port: table } }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::params::ConfigValues;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkSnapshot>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub interfaces: BTreeMap<String, InterfaceSnapshot>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outerfaces: BTreeMap<String, OuterfaceSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    #[serde(rename = "type")]
    pub type_id: String,
    #[serde(default, skip_serializing_if = "ConfigValues::is_empty")]
    pub config: ConfigValues,
    /// Stored node id, used by the read-existing and update-or-create strategies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// Nested content for protocol nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<Box<GraphSnapshot>>,
    /// Ports added to a dynamic input group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<PortSnapshot>>,
    /// Ports added to a dynamic output group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<PortSnapshot>>,
}

impl NodeSnapshot {
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            config: ConfigValues::default(),
            id: None,
            graph: None,
            inputs: None,
            outputs: None,
        }
    }

    pub fn with_config(mut self, config: ConfigValues) -> Self {
        self.config = config;
        self
    }

    pub fn with_graph(mut self, graph: GraphSnapshot) -> Self {
        self.graph = Some(Box::new(graph));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSnapshot {
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub subclass: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortRefSnapshot {
    pub node: String,
    pub port: String,
}

impl PortRefSnapshot {
    pub fn new(node: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            port: port.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkSnapshot {
    pub from: PortRefSnapshot,
    pub to: PortRefSnapshot,
}

impl LinkSnapshot {
    pub fn new(from: (&str, &str), to: (&str, &str)) -> Self {
        Self {
            from: PortRefSnapshot::new(from.0, from.1),
            to: PortRefSnapshot::new(to.0, to.1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceSnapshot {
    pub to: PortRefSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OuterfaceSnapshot {
    pub from: PortRefSnapshot,
}

impl GraphSnapshot {
    pub fn node(mut self, name: impl Into<String>, node: NodeSnapshot) -> Self {
        self.nodes.insert(name.into(), node);
        self
    }

    pub fn link(mut self, from: (&str, &str), to: (&str, &str)) -> Self {
        self.links.push(LinkSnapshot::new(from, to));
        self
    }

    pub fn interface(mut self, name: impl Into<String>, to: (&str, &str)) -> Self {
        self.interfaces.insert(
            name.into(),
            InterfaceSnapshot {
                to: PortRefSnapshot::new(to.0, to.1),
            },
        );
        self
    }

    pub fn outerface(mut self, name: impl Into<String>, from: (&str, &str)) -> Self {
        self.outerfaces.insert(
            name.into(),
            OuterfaceSnapshot {
                from: PortRefSnapshot::new(from.0, from.1),
            },
        );
        self
    }

    /// Copy of this description with every node id removed, recursively.
    pub fn without_ids(&self) -> GraphSnapshot {
        let mut copy = self.clone();
        for node in copy.nodes.values_mut() {
            node.id = None;
            if let Some(graph) = &node.graph {
                node.graph = Some(Box::new(graph.without_ids()));
            }
        }
        copy
    }
}
