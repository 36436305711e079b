// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use super::arena::ProcessGraph;
use super::node::{NodeId, ProcessNode};
use super::port::PortDirection;
use crate::config::{
    GraphSnapshot, InterfaceSnapshot, LinkSnapshot, NodeSnapshot, OuterfaceSnapshot,
    PortRefSnapshot, PortSnapshot,
};
use crate::errors::GraphError;

impl ProcessGraph {
    /// Describes the content of `protocol` so that building the result
    /// yields an isomorphic graph. Node ids are included.
    pub fn dump(&self, protocol: NodeId) -> Result<GraphSnapshot, GraphError> {
        let body = self.protocol(protocol)?;
        let name_of = |id: NodeId| -> Result<String, GraphError> {
            Ok(self.node(id)?.instance_name().to_string())
        };

        let mut nodes = BTreeMap::new();
        for (name, child) in body.children() {
            nodes.insert(name.clone(), self.dump_node(*child)?);
        }

        let mut links = Vec::with_capacity(body.connectors().len());
        for connector in body.connectors() {
            links.push(LinkSnapshot {
                from: PortRefSnapshot::new(name_of(connector.from.node)?, &connector.from.port),
                to: PortRefSnapshot::new(name_of(connector.to.node)?, &connector.to.port),
            });
        }
        links.sort();

        let mut interfaces = BTreeMap::new();
        for (name, iface) in body.interfaces() {
            interfaces.insert(
                name.clone(),
                InterfaceSnapshot {
                    to: PortRefSnapshot::new(name_of(iface.child)?, &iface.port),
                },
            );
        }
        let mut outerfaces = BTreeMap::new();
        for (name, iface) in body.outerfaces() {
            outerfaces.insert(
                name.clone(),
                OuterfaceSnapshot {
                    from: PortRefSnapshot::new(name_of(iface.child)?, &iface.port),
                },
            );
        }

        Ok(GraphSnapshot {
            nodes,
            links,
            interfaces,
            outerfaces,
        })
    }

    fn dump_node(&self, id: NodeId) -> Result<NodeSnapshot, GraphError> {
        let node = self.node(id)?;
        let graph = if node.is_protocol() {
            Some(Box::new(self.dump(id)?))
        } else {
            None
        };
        Ok(NodeSnapshot {
            type_id: node.type_id().to_string(),
            config: node.config().clone(),
            id: Some(id.as_uuid()),
            graph,
            inputs: dynamic_ports(node, PortDirection::Input),
            outputs: dynamic_ports(node, PortDirection::Output),
        })
    }
}

fn dynamic_ports(node: &ProcessNode, direction: PortDirection) -> Option<Vec<PortSnapshot>> {
    let ports: Vec<PortSnapshot> = node
        .ports(direction)
        .iter()
        .filter(|p| p.is_dynamic())
        .map(|p| PortSnapshot {
            name: p.name().to_string(),
            types: p.spec().types().iter().map(|t| t.name().to_string()).collect(),
            optional: p.spec().is_optional(),
            subclass: p.spec().accepts_subclasses(),
        })
        .collect();
    if ports.is_empty() {
        None
    } else {
        Some(ports)
    }
}
