// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Variadic port groups.
//!
//! A node type declaring [`IoSpecs::Dynamic`](super::IoSpecs::Dynamic) on one
//! side can grow that side one port at a time while the node is a draft. At
//! run time the group is handed to the task as a single collection, see
//! [`DYNAMIC_INPUT_KEY`] and [`DYNAMIC_OUTPUT_KEY`].

use std::collections::BTreeSet;

use super::arena::ProcessGraph;
use super::ioface::IofaceKind;
use super::node::{NodeId, NodeStatus};
use super::port::{PortDirection, PortSpec};
use crate::config::consts::{DYNAMIC_INPUT_KEY, DYNAMIC_OUTPUT_KEY};
use crate::errors::GraphError;

impl ProcessGraph {
    /// Appends a port to the dynamic input group of `node` and returns its name.
    pub fn add_dynamic_input_port(&mut self, node: NodeId) -> Result<String, GraphError> {
        self.add_dynamic_port(node, PortDirection::Input)
    }

    /// Appends a port to the dynamic output group of `node` and returns its name.
    pub fn add_dynamic_output_port(&mut self, node: NodeId) -> Result<String, GraphError> {
        self.add_dynamic_port(node, PortDirection::Output)
    }

    pub fn add_dynamic_port(
        &mut self,
        node: NodeId,
        direction: PortDirection,
    ) -> Result<String, GraphError> {
        let prefix = match direction {
            PortDirection::Input => DYNAMIC_INPUT_KEY,
            PortDirection::Output => DYNAMIC_OUTPUT_KEY,
        };
        let ports = self.node(node)?.ports(direction);
        let mut index = ports.len();
        let mut name = format!("{}_{}", prefix, index);
        while ports.contains(&name) {
            index += 1;
            name = format!("{}_{}", prefix, index);
        }
        self.add_named_dynamic_port(node, direction, &name, None)?;
        Ok(name)
    }

    /// Appends a dynamic port with an explicit name. Without `spec` the
    /// group's template is used.
    pub fn add_named_dynamic_port(
        &mut self,
        node: NodeId,
        direction: PortDirection,
        name: &str,
        spec: Option<PortSpec>,
    ) -> Result<(), GraphError> {
        self.ensure_draft(node)?;
        let template = self
            .node(node)?
            .io_specs(direction)
            .additional_port_spec()
            .ok_or_else(|| GraphError::NotDynamic {
                node: self.describe(node),
                direction,
            })?;
        self.push_port(node, direction, name, spec.unwrap_or(template), true)?;
        Ok(())
    }

    /// Deletes a dynamic port together with every connector or iface touching it.
    pub fn remove_dynamic_port(
        &mut self,
        node: NodeId,
        direction: PortDirection,
        name: &str,
    ) -> Result<(), GraphError> {
        self.ensure_draft(node)?;
        if !self.port(node, direction, name)?.is_dynamic() {
            return Err(GraphError::NotADynamicPort {
                node: self.describe(node),
                port: name.to_string(),
            });
        }

        if let Some(parent) = self.node(node)?.parent() {
            let body = self.protocol(parent)?;
            let ifaces: Vec<(IofaceKind, String)> = match direction {
                PortDirection::Input => body
                    .interfaces
                    .values()
                    .filter(|i| i.child == node && i.port == name)
                    .map(|i| (IofaceKind::Interface, i.name.clone()))
                    .collect(),
                PortDirection::Output => body
                    .outerfaces
                    .values()
                    .filter(|o| o.child == node && o.port == name)
                    .map(|o| (IofaceKind::Outerface, o.name.clone()))
                    .collect(),
            };
            for (kind, iface) in ifaces {
                self.remove_ioface(parent, kind, &iface)?;
            }

            let mut cleared = Vec::new();
            let body = self.protocol_mut(parent)?;
            body.connectors.retain(|c| {
                let touches = match direction {
                    PortDirection::Input => c.to.node == node && c.to.port == name,
                    PortDirection::Output => c.from.node == node && c.from.port == name,
                };
                if touches && direction == PortDirection::Output {
                    cleared.push(c.to.clone());
                }
                !touches
            });
            for target in cleared {
                let slot = self.port(target.node, PortDirection::Input, &target.port)?.slot();
                self.slot_mut(slot).clear();
            }
        }

        if let Some(port) = self.node_mut(node)?.ports_mut(direction).remove(name) {
            self.release_slots(BTreeSet::from([port.slot()]));
        }
        Ok(())
    }

    fn ensure_draft(&self, node: NodeId) -> Result<(), GraphError> {
        let status = self.status(node)?;
        if status != NodeStatus::Draft {
            return Err(GraphError::NodeNotDraft {
                node: self.describe(node),
                status,
            });
        }
        Ok(())
    }
}
