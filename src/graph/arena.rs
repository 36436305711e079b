// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The owning arena of a process graph.
//!
//! Every node and every port slot lives in one [`ProcessGraph`]. Parent/child
//! relations, connectors and ifaces are id relations, so the graph can be
//! cloned to stage an edit and dropped without any reference cycles.

use std::collections::{BTreeSet, HashMap};

use super::connector::{InputPortRef, OutputPortRef};
use super::node::{
    is_valid_instance_name, NodeId, NodeKind, NodeStatus, NodeTemplate, ProcessNode,
    ProtocolBody, TemplateKind,
};
use super::port::{IoSpecs, Port, PortDirection, PortSpec, Slot, SlotId, Slots};
use super::resource::ResourceRef;
use crate::config::consts::GENERIC_PROTOCOL_TYPE;
use crate::errors::{ExecutionError, ExecutionErrorKind, GraphError};
use crate::traits::PortRecord;

#[derive(Debug, Clone)]
pub struct ProcessGraph {
    nodes: HashMap<NodeId, ProcessNode>,
    slots: Slots,
    root: NodeId,
}

impl ProcessGraph {
    /// An empty graph whose root is a generic protocol named `root_name`.
    pub fn new(root_name: &str) -> Result<Self, GraphError> {
        Self::with_root(root_name, NodeTemplate::protocol(GENERIC_PROTOCOL_TYPE))
    }

    /// A graph whose root node is built from `template`.
    pub fn with_root(root_name: &str, template: NodeTemplate) -> Result<Self, GraphError> {
        let mut graph = Self {
            nodes: HashMap::new(),
            slots: Slots::default(),
            root: template.id,
        };
        graph.root = graph.instantiate(None, root_name, template)?;
        Ok(graph)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Result<&ProcessNode, GraphError> {
        self.nodes
            .get(&id)
            .ok_or_else(|| GraphError::UnknownNode(id.to_string()))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut ProcessNode, GraphError> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| GraphError::UnknownNode(id.to_string()))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ProcessNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn status(&self, id: NodeId) -> Result<NodeStatus, GraphError> {
        Ok(self.node(id)?.status)
    }

    pub fn protocol(&self, id: NodeId) -> Result<&ProtocolBody, GraphError> {
        self.node(id)?
            .protocol()
            .ok_or_else(|| GraphError::NotAProtocol(self.describe(id)))
    }

    pub(crate) fn protocol_mut(&mut self, id: NodeId) -> Result<&mut ProtocolBody, GraphError> {
        let label = self.describe(id);
        self.node_mut(id)?
            .protocol_mut()
            .ok_or(GraphError::NotAProtocol(label))
    }

    /// Direct child of `protocol` named `name`.
    pub fn child(&self, protocol: NodeId, name: &str) -> Result<NodeId, GraphError> {
        self.protocol(protocol)?
            .children
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownChild {
                protocol: self.describe(protocol),
                name: name.to_string(),
            })
    }

    pub fn children(&self, protocol: NodeId) -> Result<Vec<NodeId>, GraphError> {
        Ok(self.protocol(protocol)?.children.values().copied().collect())
    }

    /// Resolves a dotted instance path below the root, e.g. `"q.failing_task"`.
    /// The empty path is the root itself.
    pub fn find(&self, path: &str) -> Result<NodeId, GraphError> {
        let mut current = self.root;
        for name in path.split('.').filter(|s| !s.is_empty()) {
            current = self.child(current, name)?;
        }
        Ok(current)
    }

    /// `id` and every node nested below it, parents before children.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(body) = self.nodes.get(&current).and_then(|n| n.protocol()) {
                stack.extend(body.children.values().rev().copied());
            }
        }
        out
    }

    /// Parent, grandparent, ... up to the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        std::iter::successors(self.nodes.get(&id).and_then(|n| n.parent), |p| {
            self.nodes.get(p).and_then(|n| n.parent)
        })
        .collect()
    }

    /// Instance names from the root down to `id`.
    pub fn instance_chain(&self, id: NodeId) -> Vec<String> {
        let mut chain: Vec<String> = self
            .ancestors(id)
            .into_iter()
            .rev()
            .filter_map(|a| self.nodes.get(&a).map(|n| n.instance_name.clone()))
            .collect();
        if let Some(node) = self.nodes.get(&id) {
            chain.push(node.instance_name.clone());
        }
        chain
    }

    /// Human readable instance path, `root > q > task`.
    pub fn describe(&self, id: NodeId) -> String {
        let chain = self.instance_chain(id);
        if chain.is_empty() {
            id.to_string()
        } else {
            chain.join(" > ")
        }
    }

    /// Adds a node built from `template` as a direct child of `protocol`.
    pub fn insert_node(
        &mut self,
        protocol: NodeId,
        name: &str,
        template: NodeTemplate,
    ) -> Result<NodeId, GraphError> {
        let body = self.protocol(protocol)?;
        if body.children.contains_key(name) {
            return Err(GraphError::DuplicateNodeName {
                protocol: self.describe(protocol),
                name: name.to_string(),
            });
        }
        let id = self.instantiate(Some(protocol), name, template)?;
        self.protocol_mut(protocol)?
            .children
            .insert(name.to_string(), id);
        Ok(id)
    }

    fn instantiate(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        template: NodeTemplate,
    ) -> Result<NodeId, GraphError> {
        if !is_valid_instance_name(name) {
            return Err(GraphError::InvalidInstanceName(name.to_string()));
        }
        if self.nodes.contains_key(&template.id) {
            return Err(GraphError::DuplicateNodeId(template.id.to_string()));
        }

        let kind = match template.kind {
            TemplateKind::Task(task) => NodeKind::Task(task),
            TemplateKind::Protocol { .. } => NodeKind::Protocol(ProtocolBody::default()),
        };
        let mut node = ProcessNode {
            id: template.id,
            instance_name: name.to_string(),
            type_id: template.type_id,
            config: template.config,
            config_spec: template.config_spec,
            input_specs: template.inputs,
            output_specs: template.outputs,
            inputs: Default::default(),
            outputs: Default::default(),
            status: NodeStatus::Draft,
            parent,
            error: None,
            kind,
        };

        for direction in [PortDirection::Input, PortDirection::Output] {
            let specs = node.io_specs(direction).ports().to_vec();
            for (port_name, spec) in specs {
                if node.ports(direction).contains(&port_name) {
                    return Err(GraphError::DuplicatePort {
                        node: name.to_string(),
                        direction,
                        port: port_name,
                    });
                }
                let slot = self.slots.alloc();
                node.ports_mut(direction)
                    .push(Port::new(port_name, spec, slot, false));
            }
        }

        let id = node.id;
        let restored = template.restored;
        self.nodes.insert(id, node);

        if let Some(record) = restored {
            self.restore_ports(id, PortDirection::Input, &record.inputs)?;
            self.restore_ports(id, PortDirection::Output, &record.outputs)?;
            let chain = self.instance_chain(id);
            let node = self.node_mut(id)?;
            node.status = record.status;
            node.error = record
                .error
                .map(|message| ExecutionError::new(chain, ExecutionErrorKind::TaskFailed(message)));
        }
        Ok(id)
    }

    fn restore_ports(
        &mut self,
        id: NodeId,
        direction: PortDirection,
        records: &[PortRecord],
    ) -> Result<(), GraphError> {
        let dynamic_group = self.node(id)?.io_specs(direction).is_dynamic();
        for record in records {
            let existing = self.node(id)?.ports(direction).get(&record.name).map(Port::slot);
            let slot = match existing {
                Some(slot) => slot,
                None if record.dynamic && dynamic_group => {
                    self.push_port(id, direction, &record.name, record.spec.clone(), true)?
                }
                None => {
                    tracing::warn!(
                        node = %self.describe(id),
                        port = %record.name,
                        "Stored {} port no longer declared by the node type, skipping",
                        direction
                    );
                    continue;
                }
            };
            if record.provided {
                self.slots.get_mut(slot).provide(record.resource.clone());
            }
        }
        Ok(())
    }

    /// Declares a new port on `node`. Fails if the name is taken.
    pub fn create_port(
        &mut self,
        node: NodeId,
        direction: PortDirection,
        name: &str,
        spec: PortSpec,
    ) -> Result<(), GraphError> {
        self.push_port(node, direction, name, spec, false)?;
        Ok(())
    }

    pub(crate) fn push_port(
        &mut self,
        node: NodeId,
        direction: PortDirection,
        name: &str,
        spec: PortSpec,
        dynamic: bool,
    ) -> Result<SlotId, GraphError> {
        if self.node(node)?.ports(direction).contains(name) {
            return Err(GraphError::DuplicatePort {
                node: self.describe(node),
                direction,
                port: name.to_string(),
            });
        }
        let slot = self.slots.alloc();
        self.node_mut(node)?
            .ports_mut(direction)
            .push(Port::new(name, spec, slot, dynamic));
        Ok(slot)
    }

    /// Declares a boundary port that shares an existing slot (ifaces).
    pub(crate) fn push_shared_port(
        &mut self,
        node: NodeId,
        direction: PortDirection,
        name: &str,
        spec: PortSpec,
        slot: SlotId,
    ) -> Result<(), GraphError> {
        if self.node(node)?.ports(direction).contains(name) {
            return Err(GraphError::DuplicatePort {
                node: self.describe(node),
                direction,
                port: name.to_string(),
            });
        }
        self.node_mut(node)?
            .ports_mut(direction)
            .push(Port::new(name, spec, slot, false));
        Ok(())
    }

    pub fn port(
        &self,
        node: NodeId,
        direction: PortDirection,
        name: &str,
    ) -> Result<&Port, GraphError> {
        self.node(node)?
            .ports(direction)
            .get(name)
            .ok_or_else(|| GraphError::UnknownPort {
                node: self.describe(node),
                direction,
                port: name.to_string(),
            })
    }

    pub fn input_port(&self, node: NodeId, name: &str) -> Result<InputPortRef, GraphError> {
        self.port(node, PortDirection::Input, name)?;
        Ok(InputPortRef {
            node,
            port: name.to_string(),
        })
    }

    pub fn output_port(&self, node: NodeId, name: &str) -> Result<OutputPortRef, GraphError> {
        self.port(node, PortDirection::Output, name)?;
        Ok(OutputPortRef {
            node,
            port: name.to_string(),
        })
    }

    pub fn port_slot(
        &self,
        node: NodeId,
        direction: PortDirection,
        name: &str,
    ) -> Result<&Slot, GraphError> {
        let slot = self.port(node, direction, name)?.slot();
        Ok(self.slots.get(slot))
    }

    /// Value currently held by a port.
    pub fn port_resource(
        &self,
        node: NodeId,
        direction: PortDirection,
        name: &str,
    ) -> Result<Option<&ResourceRef>, GraphError> {
        Ok(self.port_slot(node, direction, name)?.resource())
    }

    /// Optional inputs are always ready; required ones once provided.
    pub fn port_is_ready(&self, node: NodeId, name: &str) -> Result<bool, GraphError> {
        let port = self.port(node, PortDirection::Input, name)?;
        Ok(self.port_ready(port))
    }

    fn port_ready(&self, port: &Port) -> bool {
        port.spec().is_optional() || self.slots.get(port.slot()).is_provided()
    }

    /// Provides a value to an input port from outside the graph, e.g. to feed
    /// a root protocol's interface.
    pub fn set_input(
        &mut self,
        node: NodeId,
        name: &str,
        resource: Option<ResourceRef>,
    ) -> Result<(), GraphError> {
        let port = self.port(node, PortDirection::Input, name)?;
        if let Some(resource) = &resource {
            if !port.spec().resource_type_is_compatible(resource.resource_type()) {
                return Err(GraphError::IncompatibleResource {
                    node: self.describe(node),
                    port: name.to_string(),
                    resource_type: resource.resource_type().name().to_string(),
                    accepted: port.spec().describe_types(),
                });
            }
        }
        let slot = port.slot();
        self.slots.get_mut(slot).provide(resource);
        Ok(())
    }

    pub(crate) fn slot(&self, id: SlotId) -> &Slot {
        self.slots.get(id)
    }

    pub(crate) fn slot_mut(&mut self, id: SlotId) -> &mut Slot {
        self.slots.get_mut(id)
    }

    pub(crate) fn set_status(&mut self, id: NodeId, status: NodeStatus) -> Result<(), GraphError> {
        self.node_mut(id)?.status = status;
        Ok(())
    }

    pub(crate) fn set_error(
        &mut self,
        id: NodeId,
        error: Option<ExecutionError>,
    ) -> Result<(), GraphError> {
        self.node_mut(id)?.error = error;
        Ok(())
    }

    pub(crate) fn set_config(
        &mut self,
        id: NodeId,
        config: crate::config::ConfigValues,
    ) -> Result<(), GraphError> {
        self.node_mut(id)?.config = config;
        Ok(())
    }

    /// A node can start when it is draft (or a partially run protocol), every
    /// required input is provided, and every direct upstream sibling succeeded.
    pub fn is_ready(&self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        if !node.status.is_startable() {
            return false;
        }
        if node.status == NodeStatus::PartiallyRun && !node.is_protocol() {
            return false;
        }
        if !node.inputs.iter().all(|p| self.port_ready(p)) {
            return false;
        }
        self.upstream(id)
            .into_iter()
            .all(|up| self.nodes.get(&up).map(|n| n.status) == Some(NodeStatus::Success))
    }

    /// Direct upstream siblings of `id`, i.e. sources of its inbound connectors.
    pub fn upstream(&self, id: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.nodes.get(&id).and_then(|n| n.parent) else {
            return Vec::new();
        };
        let Some(body) = self.nodes.get(&parent).and_then(|n| n.protocol()) else {
            return Vec::new();
        };
        let mut upstream: Vec<NodeId> = body
            .connectors
            .iter()
            .filter(|c| c.to.node == id)
            .map(|c| c.from.node)
            .collect();
        upstream.sort();
        upstream.dedup();
        upstream
    }

    /// Direct downstream siblings of `id`.
    pub fn downstream(&self, id: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.nodes.get(&id).and_then(|n| n.parent) else {
            return Vec::new();
        };
        let Some(body) = self.nodes.get(&parent).and_then(|n| n.protocol()) else {
            return Vec::new();
        };
        let mut downstream: Vec<NodeId> = Vec::new();
        for connector in body.connectors.iter().filter(|c| c.from.node == id) {
            if !downstream.contains(&connector.to.node) {
                downstream.push(connector.to.node);
            }
        }
        downstream
    }

    /// Removes `id` and its subtree from the arena and frees their slots.
    /// Callers detach it from its parent first.
    pub(crate) fn drop_subtree(&mut self, id: NodeId) {
        let mut released = BTreeSet::new();
        for node in self.descendants(id) {
            if let Some(node) = self.nodes.remove(&node) {
                released.extend(node.inputs.iter().chain(node.outputs.iter()).map(|p| p.slot()));
            }
        }
        self.release_slots(released);
    }

    /// Frees `candidates` except the slots a remaining port still shares.
    pub(crate) fn release_slots(&mut self, mut candidates: BTreeSet<SlotId>) {
        for node in self.nodes.values() {
            for port in node.inputs.iter().chain(node.outputs.iter()) {
                candidates.remove(&port.slot());
            }
        }
        for slot in candidates {
            self.slots.release(slot);
        }
    }

    /// Number of slots held by ports of the graph.
    pub(crate) fn live_slots(&self) -> usize {
        self.slots.live()
    }

    pub(crate) fn io_specs(&self, id: NodeId, direction: PortDirection) -> Result<&IoSpecs, GraphError> {
        Ok(self.node(id)?.io_specs(direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::{fixtures, resource_ref};
    use crate::graph::ResourceType;

    #[test]
    fn test_new_graph_has_generic_protocol_root() {
        let graph = ProcessGraph::new("main").unwrap();
        let root = graph.node(graph.root()).unwrap();

        assert!(root.is_protocol());
        assert_eq!(root.type_id(), GENERIC_PROTOCOL_TYPE);
        assert_eq!(root.status(), NodeStatus::Draft);
        assert_eq!(graph.describe(graph.root()), "main");
    }

    #[test]
    fn test_invalid_root_name_is_rejected() {
        let err = ProcessGraph::new("not valid").unwrap_err();
        assert_eq!(err, GraphError::InvalidInstanceName("not valid".into()));
    }

    #[test]
    fn test_insert_and_find_nested_nodes() {
        let fx = fixtures();
        let mut graph = ProcessGraph::new("p").unwrap();
        let root = graph.root();
        let q = graph
            .insert_node(root, "q", NodeTemplate::protocol(GENERIC_PROTOCOL_TYPE))
            .unwrap();
        let task = graph.insert_node(q, "task", fx.template("Step")).unwrap();

        assert_eq!(graph.find("q.task").unwrap(), task);
        assert_eq!(graph.find("").unwrap(), root);
        assert_eq!(graph.describe(task), "p > q > task");
        assert_eq!(graph.ancestors(task), vec![q, root]);
        assert_eq!(graph.descendants(root), vec![root, q, task]);
        assert!(matches!(
            graph.find("q.missing"),
            Err(GraphError::UnknownChild { .. })
        ));
    }

    #[test]
    fn test_duplicate_child_name_is_rejected() {
        let fx = fixtures();
        let mut graph = ProcessGraph::new("p").unwrap();
        let root = graph.root();
        graph.insert_node(root, "a", fx.template("Source")).unwrap();

        let err = graph.insert_node(root, "a", fx.template("Source")).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateNodeName { .. }));
    }

    #[test]
    fn test_tasks_cannot_hold_children() {
        let fx = fixtures();
        let mut graph = ProcessGraph::new("p").unwrap();
        let root = graph.root();
        let a = graph.insert_node(root, "a", fx.template("Source")).unwrap();

        let err = graph.insert_node(a, "b", fx.template("Source")).unwrap_err();
        assert!(matches!(err, GraphError::NotAProtocol(_)));
    }

    #[test]
    fn test_create_port_rejects_duplicates() {
        let mut graph = ProcessGraph::new("p").unwrap();
        let root = graph.root();
        graph
            .create_port(root, PortDirection::Input, "x", PortSpec::any())
            .unwrap();

        let err = graph
            .create_port(root, PortDirection::Input, "x", PortSpec::any())
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicatePort { .. }));
        assert!(graph
            .create_port(root, PortDirection::Output, "x", PortSpec::any())
            .is_ok());
    }

    #[test]
    fn test_readiness_follows_required_inputs() {
        let fx = fixtures();
        let mut graph = ProcessGraph::new("p").unwrap();
        let root = graph.root();
        let step = graph.insert_node(root, "step", fx.template("Step")).unwrap();

        assert!(!graph.port_is_ready(step, "in").unwrap());
        assert!(!graph.is_ready(step));

        graph
            .set_input(step, "in", Some(resource_ref(&fx.number)))
            .unwrap();
        assert!(graph.port_is_ready(step, "in").unwrap());
        assert!(graph.is_ready(step));
    }

    #[test]
    fn test_set_input_checks_resource_type() {
        let fx = fixtures();
        let mut graph = ProcessGraph::new("p").unwrap();
        let root = graph.root();
        let step = graph.insert_node(root, "step", fx.template("Step")).unwrap();
        let text = ResourceType::derive("Text", &ResourceType::root());

        let err = graph
            .set_input(step, "in", Some(resource_ref(&text)))
            .unwrap_err();
        assert!(matches!(err, GraphError::IncompatibleResource { .. }));
        assert!(graph.port_slot(step, PortDirection::Input, "in").unwrap().is_empty());
    }
}
