// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Connectors between siblings and ifaces across protocol boundaries.

use std::collections::HashSet;

use super::arena::ProcessGraph;
use super::connector::{Connector, InputPortRef, OutputPortRef};
use super::ioface::{Ioface, IofaceKind};
use super::node::NodeId;
use super::port::{PortDirection, PortSpec};
use crate::errors::GraphError;

impl ProcessGraph {
    /// Connects two direct children of `scope`, checking port types.
    ///
    /// A value already held by the source port is propagated immediately.
    pub fn connect(
        &mut self,
        scope: NodeId,
        from: OutputPortRef,
        to: InputPortRef,
    ) -> Result<(), GraphError> {
        self.add_connector(scope, from, to, true)
    }

    /// Like [`connect`](Self::connect) without the type check. Use
    /// [`validate_connectors`](Self::validate_connectors) once types are known.
    pub fn connect_unchecked(
        &mut self,
        scope: NodeId,
        from: OutputPortRef,
        to: InputPortRef,
    ) -> Result<(), GraphError> {
        self.add_connector(scope, from, to, false)
    }

    fn add_connector(
        &mut self,
        scope: NodeId,
        from: OutputPortRef,
        to: InputPortRef,
        check_types: bool,
    ) -> Result<(), GraphError> {
        self.ensure_direct_child(scope, from.node)?;
        self.ensure_direct_child(scope, to.node)?;

        let out_port = self.port(from.node, PortDirection::Output, &from.port)?;
        let (out_spec, out_slot) = (out_port.spec().clone(), out_port.slot());
        let in_port = self.port(to.node, PortDirection::Input, &to.port)?;
        let (in_spec, in_slot) = (in_port.spec().clone(), in_port.slot());

        if self.input_is_connected(scope, &to)? {
            return Err(GraphError::InputAlreadyConnected {
                node: self.describe(to.node),
                port: to.port,
            });
        }
        if check_types && !out_spec.is_compatible_with(&in_spec) {
            return Err(self.incompatible(&from, &to, &out_spec, &in_spec));
        }
        if self.would_create_cycle(scope, from.node, to.node)? {
            return Err(GraphError::CycleDetected {
                from: self.describe(from.node),
                to: self.describe(to.node),
            });
        }

        self.protocol_mut(scope)?
            .connectors
            .push(Connector { from, to });

        let source = self.slot(out_slot).clone();
        if source.is_provided() {
            self.slot_mut(in_slot).provide(source.resource().cloned());
        }
        Ok(())
    }

    /// Removes the connector feeding `to` and clears that input.
    pub fn disconnect(&mut self, scope: NodeId, to: &InputPortRef) -> Result<Connector, GraphError> {
        let body = self.protocol(scope)?;
        let Some(index) = body.connectors.iter().position(|c| &c.to == to) else {
            return Err(GraphError::InputNotConnected {
                node: self.describe(to.node),
                port: to.port.clone(),
            });
        };
        let connector = self.protocol_mut(scope)?.connectors.remove(index);
        let slot = self.port(to.node, PortDirection::Input, &to.port)?.slot();
        self.slot_mut(slot).clear();
        Ok(connector)
    }

    pub fn connectors(&self, scope: NodeId) -> Result<&[Connector], GraphError> {
        Ok(self.protocol(scope)?.connectors())
    }

    /// Re-checks the port types of every connector in `scope`.
    pub fn validate_connectors(&self, scope: NodeId) -> Result<(), GraphError> {
        for connector in self.protocol(scope)?.connectors() {
            let out_spec = self
                .port(connector.from.node, PortDirection::Output, &connector.from.port)?
                .spec();
            let in_spec = self
                .port(connector.to.node, PortDirection::Input, &connector.to.port)?
                .spec();
            if !out_spec.is_compatible_with(in_spec) {
                return Err(self.incompatible(&connector.from, &connector.to, out_spec, in_spec));
            }
        }
        Ok(())
    }

    fn incompatible(
        &self,
        from: &OutputPortRef,
        to: &InputPortRef,
        out_spec: &PortSpec,
        in_spec: &PortSpec,
    ) -> GraphError {
        GraphError::IncompatibleTypes {
            from_node: self.describe(from.node),
            from_port: from.port.clone(),
            from_types: out_spec.describe_types(),
            to_node: self.describe(to.node),
            to_port: to.port.clone(),
            to_types: in_spec.describe_types(),
        }
    }

    fn ensure_direct_child(&self, scope: NodeId, node: NodeId) -> Result<(), GraphError> {
        self.protocol(scope)?;
        if self.node(node)?.parent() != Some(scope) {
            return Err(GraphError::NotADirectChild {
                protocol: self.describe(scope),
                node: self.describe(node),
            });
        }
        Ok(())
    }

    /// An input counts as connected when a connector or an interface feeds it.
    fn input_is_connected(&self, scope: NodeId, to: &InputPortRef) -> Result<bool, GraphError> {
        let body = self.protocol(scope)?;
        Ok(body.connectors.iter().any(|c| &c.to == to)
            || body
                .interfaces
                .values()
                .any(|i| i.child == to.node && i.port == to.port))
    }

    fn would_create_cycle(&self, scope: NodeId, from: NodeId, to: NodeId) -> Result<bool, GraphError> {
        if from == to {
            return Ok(true);
        }
        let connectors = &self.protocol(scope)?.connectors;
        let mut visited = HashSet::new();
        let mut stack = vec![to];
        while let Some(current) = stack.pop() {
            if current == from {
                return Ok(true);
            }
            if visited.insert(current) {
                stack.extend(
                    connectors
                        .iter()
                        .filter(|c| c.from.node == current)
                        .map(|c| c.to.node),
                );
            }
        }
        Ok(false)
    }

    /// Copies every output of `id` onto the inputs connected to it and returns
    /// the downstream siblings that were fed.
    ///
    /// Siblings that are running or finished keep their inputs, so a result
    /// never changes under a node that already consumed it.
    pub(crate) fn propagate_outputs(&mut self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let Some(parent) = self.node(id)?.parent() else {
            return Ok(Vec::new());
        };
        let connectors: Vec<Connector> = self
            .protocol(parent)?
            .connectors
            .iter()
            .filter(|c| c.from.node == id)
            .cloned()
            .collect();

        let mut fed = Vec::new();
        for connector in connectors {
            if !self.status(connector.to.node)?.is_startable() {
                continue;
            }
            let src = self
                .port(id, PortDirection::Output, &connector.from.port)?
                .slot();
            let dst = self
                .port(connector.to.node, PortDirection::Input, &connector.to.port)?
                .slot();
            let value = self.slot(src).resource().cloned();
            self.slot_mut(dst).provide(value);
            if !fed.contains(&connector.to.node) {
                fed.push(connector.to.node);
            }
        }
        Ok(fed)
    }

    /// Exposes input `child_port` of direct child `child` as input `name` of `protocol`.
    pub fn add_interface(
        &mut self,
        protocol: NodeId,
        name: &str,
        child: NodeId,
        child_port: &str,
    ) -> Result<(), GraphError> {
        self.ensure_direct_child(protocol, child)?;
        self.ensure_ioface_name_free(protocol, IofaceKind::Interface, name)?;

        let port = self.port(child, PortDirection::Input, child_port)?;
        let (spec, slot) = (port.spec().clone(), port.slot());
        let target = InputPortRef {
            node: child,
            port: child_port.to_string(),
        };
        if self.input_is_connected(protocol, &target)? {
            return Err(GraphError::InputAlreadyConnected {
                node: self.describe(child),
                port: child_port.to_string(),
            });
        }

        self.push_shared_port(protocol, PortDirection::Input, name, spec, slot)?;
        self.protocol_mut(protocol)?.interfaces.insert(
            name.to_string(),
            Ioface {
                name: name.to_string(),
                child,
                port: child_port.to_string(),
            },
        );
        Ok(())
    }

    /// Exposes output `child_port` of direct child `child` as output `name` of `protocol`.
    pub fn add_outerface(
        &mut self,
        protocol: NodeId,
        name: &str,
        child: NodeId,
        child_port: &str,
    ) -> Result<(), GraphError> {
        self.ensure_direct_child(protocol, child)?;
        self.ensure_ioface_name_free(protocol, IofaceKind::Outerface, name)?;

        let port = self.port(child, PortDirection::Output, child_port)?;
        let (spec, slot) = (port.spec().clone(), port.slot());

        self.push_shared_port(protocol, PortDirection::Output, name, spec, slot)?;
        self.protocol_mut(protocol)?.outerfaces.insert(
            name.to_string(),
            Ioface {
                name: name.to_string(),
                child,
                port: child_port.to_string(),
            },
        );
        Ok(())
    }

    fn ensure_ioface_name_free(
        &self,
        protocol: NodeId,
        kind: IofaceKind,
        name: &str,
    ) -> Result<(), GraphError> {
        let node = self.node(protocol)?;
        let body = self.protocol(protocol)?;
        let taken = match kind {
            IofaceKind::Interface => {
                body.interfaces.contains_key(name) || node.inputs().contains(name)
            }
            IofaceKind::Outerface => {
                body.outerfaces.contains_key(name) || node.outputs().contains(name)
            }
        };
        if taken {
            return Err(GraphError::DuplicateIoface {
                protocol: self.describe(protocol),
                kind,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    pub fn remove_interface(&mut self, protocol: NodeId, name: &str) -> Result<(), GraphError> {
        self.remove_ioface(protocol, IofaceKind::Interface, name)
    }

    pub fn remove_outerface(&mut self, protocol: NodeId, name: &str) -> Result<(), GraphError> {
        self.remove_ioface(protocol, IofaceKind::Outerface, name)
    }

    pub(crate) fn remove_ioface(
        &mut self,
        protocol: NodeId,
        kind: IofaceKind,
        name: &str,
    ) -> Result<(), GraphError> {
        let body = self.protocol(protocol)?;
        let exists = match kind {
            IofaceKind::Interface => body.interfaces.contains_key(name),
            IofaceKind::Outerface => body.outerfaces.contains_key(name),
        };
        if !exists {
            return Err(GraphError::UnknownIoface {
                protocol: self.describe(protocol),
                kind,
                name: name.to_string(),
            });
        }

        if let Some(parent) = self.node(protocol)?.parent() {
            if self.boundary_port_is_linked(parent, protocol, kind, name)? {
                return Err(GraphError::IofaceConnectedInParent {
                    kind,
                    name: name.to_string(),
                    protocol: self.describe(protocol),
                    parent: self.describe(parent),
                });
            }
        }

        let direction = match kind {
            IofaceKind::Interface => PortDirection::Input,
            IofaceKind::Outerface => PortDirection::Output,
        };
        let node = self.node_mut(protocol)?;
        node.ports_mut(direction).remove(name);
        if let Some(body) = node.protocol_mut() {
            match kind {
                IofaceKind::Interface => body.interfaces.remove(name),
                IofaceKind::Outerface => body.outerfaces.remove(name),
            };
        }
        Ok(())
    }

    /// Whether boundary port `name` of `protocol` is used by a connector or an
    /// iface of `parent`.
    pub(crate) fn boundary_port_is_linked(
        &self,
        parent: NodeId,
        protocol: NodeId,
        kind: IofaceKind,
        name: &str,
    ) -> Result<bool, GraphError> {
        let body = self.protocol(parent)?;
        let linked = match kind {
            IofaceKind::Interface => {
                body.connectors
                    .iter()
                    .any(|c| c.to.node == protocol && c.to.port == name)
                    || body
                        .interfaces
                        .values()
                        .any(|i| i.child == protocol && i.port == name)
            }
            IofaceKind::Outerface => {
                body.connectors
                    .iter()
                    .any(|c| c.from.node == protocol && c.from.port == name)
                    || body
                        .outerfaces
                        .values()
                        .any(|o| o.child == protocol && o.port == name)
            }
        };
        Ok(linked)
    }
}
