// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Removing nodes and returning nodes to draft.

use super::arena::ProcessGraph;
use super::connector::Connector;
use super::ioface::IofaceKind;
use super::node::{NodeId, NodeStatus};
use super::port::{PortDirection, SlotId};
use crate::errors::GraphError;

impl ProcessGraph {
    /// Disconnects and deletes direct child `name` of `protocol` with its subtree.
    ///
    /// Ifaces of `protocol` bound to the child are removed as well, which
    /// fails if the enclosing protocol still links them.
    pub fn remove_node(&mut self, protocol: NodeId, name: &str) -> Result<(), GraphError> {
        let id = self.child(protocol, name)?;
        self.ensure_not_running(id)?;

        let body = self.protocol(protocol)?;
        let mut bound: Vec<(IofaceKind, String)> = body
            .interfaces
            .values()
            .filter(|i| i.child == id)
            .map(|i| (IofaceKind::Interface, i.name.clone()))
            .collect();
        bound.extend(
            body.outerfaces
                .values()
                .filter(|o| o.child == id)
                .map(|o| (IofaceKind::Outerface, o.name.clone())),
        );
        let touching: Vec<Connector> = body
            .connectors
            .iter()
            .filter(|c| c.touches(id))
            .cloned()
            .collect();

        if let Some(parent) = self.node(protocol)?.parent() {
            for (kind, iface) in &bound {
                if self.boundary_port_is_linked(parent, protocol, *kind, iface)? {
                    return Err(GraphError::IofaceConnectedInParent {
                        kind: *kind,
                        name: iface.clone(),
                        protocol: self.describe(protocol),
                        parent: self.describe(parent),
                    });
                }
            }
        }

        for (kind, iface) in bound {
            self.remove_ioface(protocol, kind, &iface)?;
        }
        for connector in touching {
            if connector.from.node == id {
                let slot = self
                    .port(connector.to.node, PortDirection::Input, &connector.to.port)?
                    .slot();
                self.slot_mut(slot).clear();
            }
        }

        let body = self.protocol_mut(protocol)?;
        body.connectors.retain(|c| !c.touches(id));
        body.children.remove(name);
        self.drop_subtree(id);
        Ok(())
    }

    fn ensure_not_running(&self, id: NodeId) -> Result<(), GraphError> {
        for node in self.descendants(id) {
            if self.status(node)? == NodeStatus::Running {
                return Err(GraphError::NodeRunning(self.describe(node)));
            }
        }
        Ok(())
    }

    /// Returns `id` to draft with its ports cleared, recursively for protocols.
    ///
    /// Downstream siblings fed by `id` are reset too. When a reset node feeds
    /// an outerface, the walk continues with the consumers of that boundary
    /// port in the enclosing protocol, at every level. Finished ancestors
    /// become `PartiallyRun`, then inputs fed by nodes that keep their result
    /// are refilled.
    pub fn reset(&mut self, id: NodeId) -> Result<(), GraphError> {
        let mut affected = vec![id];
        let mut crossed = Vec::new();
        let mut index = 0;
        while index < affected.len() {
            let mut next = self.downstream(affected[index]);
            let mut level = affected[index];
            while let Some(protocol) = self.outerface_owner(level)? {
                if crossed.contains(&protocol) {
                    break;
                }
                crossed.push(protocol);
                next.extend(self.downstream(protocol));
                level = protocol;
            }
            for node in next {
                if !affected.contains(&node) {
                    affected.push(node);
                }
            }
            index += 1;
        }

        for node in &affected {
            self.ensure_not_running(*node)?;
        }
        for node in &affected {
            self.reset_subtree(*node)?;
        }

        for ancestor in self.ancestors(id) {
            let node = self.node_mut(ancestor)?;
            if node.status.is_terminal() {
                node.status = NodeStatus::PartiallyRun;
                node.error = None;
            }
        }
        for node in &affected {
            self.refill_inputs(*node, &affected)?;
        }
        Ok(())
    }

    /// The parent of `id` when `id` is bound to one of its outerfaces.
    fn outerface_owner(&self, id: NodeId) -> Result<Option<NodeId>, GraphError> {
        let Some(parent) = self.node(id)?.parent() else {
            return Ok(None);
        };
        let bound = self
            .protocol(parent)?
            .outerfaces
            .values()
            .any(|o| o.child == id);
        Ok(bound.then_some(parent))
    }

    fn reset_subtree(&mut self, top: NodeId) -> Result<(), GraphError> {
        let parent = self.node(top)?.parent();
        for id in self.descendants(top) {
            let node = self.node(id)?;
            let mut slots: Vec<SlotId> = node.outputs.iter().map(|p| p.slot()).collect();
            for port in node.inputs.iter() {
                let keep = match parent {
                    Some(parent) if id == top => self.is_interfaced(parent, top, port.name())?,
                    _ => false,
                };
                if !keep {
                    slots.push(port.slot());
                }
            }

            let node = self.node_mut(id)?;
            node.status = NodeStatus::Draft;
            node.error = None;
            for slot in slots {
                self.slot_mut(slot).clear();
            }
        }
        Ok(())
    }

    fn is_interfaced(&self, parent: NodeId, child: NodeId, port: &str) -> Result<bool, GraphError> {
        Ok(self
            .protocol(parent)?
            .interfaces
            .values()
            .any(|i| i.child == child && i.port == port))
    }

    fn refill_inputs(&mut self, id: NodeId, affected: &[NodeId]) -> Result<(), GraphError> {
        let Some(parent) = self.node(id)?.parent() else {
            return Ok(());
        };
        let feeding: Vec<Connector> = self
            .protocol(parent)?
            .connectors
            .iter()
            .filter(|c| c.to.node == id && !affected.contains(&c.from.node))
            .cloned()
            .collect();
        for connector in feeding {
            if self.status(connector.from.node)? != NodeStatus::Success {
                continue;
            }
            let src = self
                .port(connector.from.node, PortDirection::Output, &connector.from.port)?
                .slot();
            let dst = self
                .port(id, PortDirection::Input, &connector.to.port)?
                .slot();
            let value = self.slot(src).resource().cloned();
            self.slot_mut(dst).provide(value);
        }
        Ok(())
    }
}
