// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Materializing graph descriptions into live graphs.
//!
//! ## Build order
//!
//! Each protocol level is synchronized in a fixed order:
//!
//! 1. Instantiate every node of the level through the [`NodeInstantiator`]
//! 2. Recurse into protocols, using the nested description or the
//!    protocol type's registered template
//! 3. Materialize interfaces and outerfaces
//! 4. Materialize connectors
//!
//! Connector types are checked while wiring or, for strategies restoring
//! stored nodes, once the whole graph exists.
//!
//! ## Atomicity
//!
//! [`GraphBuilder::materialize`] only returns a graph when every step
//! succeeded. [`GraphBuilder::rebuild`] works on a staged clone and swaps it
//! in at the end, so a failed rebuild leaves the original untouched.

use std::collections::BTreeMap;
use std::time::Instant;

use super::strategy::{CreateNew, NodeInstantiator, ReadExisting, UpdateOrCreate};
use crate::config::{
    validate_graph_snapshot, BuildStrategy, BuilderOptions, GraphSnapshot, NodeSnapshot,
    TypeRegistry,
};
use crate::errors::{BuildError, BuildErrorKind, GraphError};
use crate::graph::{IofaceKind, NodeId, NodeStatus, PortDirection, ProcessGraph, TemplateKind};
use crate::observability::messages::builder::{
    GraphBuildCompleted, GraphBuildFailed, GraphBuildStarted, GraphPersisted,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{NodeRecord, NodeStore, PortRecord};

/// Builds [`ProcessGraph`]s from [`GraphSnapshot`]s.
///
/// # Examples
///
/// ```rust
/// use protograph::builder::GraphBuilder;
/// use protograph::config::{GraphSnapshot, TypeRegistry};
///
/// let registry = TypeRegistry::new();
/// let graph = GraphBuilder::create_new(&registry)
///     .materialize("empty", &GraphSnapshot::default())
///     .unwrap();
/// assert_eq!(graph.len(), 1);
/// ```
pub struct GraphBuilder<'a> {
    registry: &'a TypeRegistry,
    instantiator: Box<dyn NodeInstantiator + 'a>,
    check_types: bool,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(registry: &'a TypeRegistry, instantiator: Box<dyn NodeInstantiator + 'a>) -> Self {
        Self {
            registry,
            instantiator,
            check_types: true,
        }
    }

    pub fn create_new(registry: &'a TypeRegistry) -> Self {
        Self::new(registry, Box::new(CreateNew))
    }

    pub fn read_existing(registry: &'a TypeRegistry, store: &'a dyn NodeStore) -> Self {
        Self::new(registry, Box::new(ReadExisting::new(store)))
    }

    pub fn update_or_create(registry: &'a TypeRegistry, store: &'a dyn NodeStore) -> Self {
        Self::new(registry, Box::new(UpdateOrCreate::new(store)))
    }

    /// Builder for the `builder:` section of a pipeline config. Strategies
    /// other than `create_new` need a store.
    pub fn from_options(
        registry: &'a TypeRegistry,
        options: &BuilderOptions,
        store: Option<&'a dyn NodeStore>,
    ) -> Result<Self, BuildError> {
        let builder = match (options.strategy, store) {
            (BuildStrategy::CreateNew, _) => Self::create_new(registry),
            (BuildStrategy::ReadExisting, Some(store)) => Self::read_existing(registry, store),
            (BuildStrategy::UpdateOrCreate, Some(store)) => Self::update_or_create(registry, store),
            (strategy, None) => {
                return Err(BuildError::new(
                    "",
                    BuildErrorKind::MissingStore(format!("{:?}", strategy)),
                ))
            }
        };
        Ok(builder.check_types(options.check_types))
    }

    /// Turns connector type checks off or on. When off, connectors are never
    /// type-checked.
    pub fn check_types(mut self, check_types: bool) -> Self {
        self.check_types = check_types;
        self
    }

    pub fn strategy(&self) -> BuildStrategy {
        self.instantiator.strategy()
    }

    /// Builds a graph whose root protocol `name` holds `snapshot`.
    pub fn materialize(
        &self,
        name: &str,
        snapshot: &GraphSnapshot,
    ) -> Result<ProcessGraph, BuildError> {
        let started = Instant::now();
        GraphBuildStarted {
            name,
            strategy: &format!("{:?}", self.strategy()),
            node_count: snapshot.nodes.len(),
        }
        .log();

        let result = self.try_materialize(name, snapshot);
        match &result {
            Ok(graph) => GraphBuildCompleted {
                name,
                node_count: graph.len(),
                duration: started.elapsed(),
            }
            .log(),
            Err(error) => GraphBuildFailed { name, error }.log(),
        }
        result
    }

    fn try_materialize(
        &self,
        name: &str,
        snapshot: &GraphSnapshot,
    ) -> Result<ProcessGraph, BuildError> {
        validate_graph_snapshot(snapshot)
            .map_err(|errors| BuildError::new(name, BuildErrorKind::Validation(errors)))?;
        let mut graph = ProcessGraph::new(name).map_err(|e| BuildError::new(name, e))?;
        let root = graph.root();
        self.sync_level(&mut graph, root, name, snapshot)?;
        self.check_connectors(&graph, root)?;
        Ok(graph)
    }

    /// Makes the content of `protocol` match `snapshot`.
    ///
    /// Children absent from the description or re-typed in it are removed,
    /// kept children get the new config, new children are created. Ifaces
    /// and connectors are reconciled afterwards. Fails without touching
    /// `graph` if anything inside `protocol` is running.
    pub fn rebuild(
        &self,
        graph: &mut ProcessGraph,
        protocol: NodeId,
        snapshot: &GraphSnapshot,
    ) -> Result<(), BuildError> {
        let path = dotted_path(graph, protocol);
        let fail = |kind: BuildErrorKind| {
            let error = BuildError::new(path.clone(), kind);
            GraphBuildFailed {
                name: &path,
                error: &error,
            }
            .log();
            error
        };

        graph.protocol(protocol).map_err(|e| fail(e.into()))?;
        for id in graph.descendants(protocol) {
            if graph.status(id).map_err(|e| fail(e.into()))? == NodeStatus::Running {
                return Err(fail(GraphError::NodeRunning(graph.describe(id)).into()));
            }
        }
        validate_graph_snapshot(snapshot).map_err(|errors| fail(BuildErrorKind::Validation(errors)))?;

        let started = Instant::now();
        let mut staged = graph.clone();
        let staged_result = self
            .sync_level(&mut staged, protocol, &path, snapshot)
            .and_then(|()| self.check_connectors(&staged, protocol));
        if let Err(error) = staged_result {
            GraphBuildFailed {
                name: &path,
                error: &error,
            }
            .log();
            return Err(error);
        }
        *graph = staged;

        GraphBuildCompleted {
            name: &path,
            node_count: graph.descendants(protocol).len(),
            duration: started.elapsed(),
        }
        .log();
        Ok(())
    }

    fn sync_level(
        &self,
        graph: &mut ProcessGraph,
        protocol: NodeId,
        path: &str,
        snapshot: &GraphSnapshot,
    ) -> Result<(), BuildError> {
        let at = |e: GraphError| BuildError::new(path, e);

        // Wiring of this level is recreated below. Detaching it before
        // descending lets nested levels drop or retarget their own ifaces.
        self.detach_level(graph, protocol, path, snapshot)?;

        // Children gone from the description, or re-typed, go first.
        let existing: Vec<(String, NodeId)> = graph
            .protocol(protocol)
            .map_err(at)?
            .children()
            .iter()
            .map(|(name, id)| (name.clone(), *id))
            .collect();
        let mut kept = BTreeMap::new();
        for (name, id) in existing {
            let same_type = snapshot
                .nodes
                .get(&name)
                .map(|desc| desc.type_id == graph.node(id).map(|n| n.type_id()).unwrap_or_default())
                .unwrap_or(false);
            if same_type {
                kept.insert(name, id);
            } else {
                graph.remove_node(protocol, &name).map_err(at)?;
            }
        }

        // (1) nodes
        let mut nested = Vec::new();
        for (name, desc) in &snapshot.nodes {
            let node_path = format!("{}.{}", path, name);
            let in_node = |e: GraphError| BuildError::new(node_path.clone(), e);
            let id = match kept.get(name) {
                Some(&id) => {
                    let config = graph
                        .node(id)
                        .map_err(in_node)?
                        .config_spec()
                        .validate(&desc.config)
                        .map_err(|source| {
                            BuildError::new(
                                node_path.clone(),
                                BuildErrorKind::Config {
                                    node: node_path.clone(),
                                    source,
                                },
                            )
                        })?;
                    graph.set_config(id, config).map_err(in_node)?;
                    if let Some(inner) = &desc.graph {
                        nested.push((id, node_path.clone(), (**inner).clone()));
                    }
                    id
                }
                None => {
                    let template = self
                        .instantiator
                        .instantiate(self.registry, &node_path, desc)
                        .map_err(|kind| BuildError::new(node_path.clone(), kind))?;
                    let inner = match (&template.kind, &desc.graph) {
                        (TemplateKind::Protocol { .. }, Some(inner)) => Some((**inner).clone()),
                        (TemplateKind::Protocol { graph: template }, None) => template.clone(),
                        (TemplateKind::Task(_), Some(_)) => {
                            return Err(BuildError::new(
                                node_path.clone(),
                                BuildErrorKind::UnexpectedGraph {
                                    node: node_path.clone(),
                                    type_id: desc.type_id.clone(),
                                },
                            ))
                        }
                        (TemplateKind::Task(_), None) => None,
                    };
                    let id = graph.insert_node(protocol, name, template).map_err(in_node)?;
                    if let Some(inner) = inner {
                        nested.push((id, node_path.clone(), inner));
                    }
                    id
                }
            };
            self.apply_dynamic_ports(graph, id, &node_path, desc)?;
        }

        // (2) nested levels
        for (id, node_path, inner) in nested {
            validate_graph_snapshot(&inner).map_err(|errors| {
                BuildError::new(node_path.clone(), BuildErrorKind::Validation(errors))
            })?;
            self.sync_level(graph, id, &node_path, &inner)?;
        }

        // (3) ifaces
        self.sync_ifaces(graph, protocol, path, snapshot)?;

        // (4) connectors
        let check_now = self.check_types && self.instantiator.checks_types_while_wiring();
        for link in &snapshot.links {
            let from_node = graph.child(protocol, &link.from.node).map_err(at)?;
            let to_node = graph.child(protocol, &link.to.node).map_err(at)?;
            let from = graph.output_port(from_node, &link.from.port).map_err(at)?;
            let to = graph.input_port(to_node, &link.to.port).map_err(at)?;
            if check_now {
                graph.connect(protocol, from, to).map_err(at)?;
            } else {
                graph.connect_unchecked(protocol, from, to).map_err(at)?;
            }
        }
        Ok(())
    }

    /// Removes the connectors of `protocol` and every iface that the level
    /// above does not pin.
    ///
    /// Parents are detached before their nested levels, so below the level
    /// being rebuilt every iface goes. At that level an iface still linked
    /// by the enclosing protocol is kept when its target is unchanged;
    /// retargeting it fails with `IofaceConnectedInParent`.
    fn detach_level(
        &self,
        graph: &mut ProcessGraph,
        protocol: NodeId,
        path: &str,
        snapshot: &GraphSnapshot,
    ) -> Result<(), BuildError> {
        let at = |e: GraphError| BuildError::new(path, e);

        let stale: Vec<_> = graph
            .connectors(protocol)
            .map_err(at)?
            .iter()
            .map(|c| c.to.clone())
            .collect();
        for to in stale {
            graph.disconnect(protocol, &to).map_err(at)?;
        }

        let parent = graph.node(protocol).map_err(at)?.parent();
        let body = graph.protocol(protocol).map_err(at)?;
        let mut bound = Vec::new();
        for (kind, ifaces) in [
            (IofaceKind::Interface, body.interfaces()),
            (IofaceKind::Outerface, body.outerfaces()),
        ] {
            for (name, iface) in ifaces {
                let child = graph.node(iface.child).map_err(at)?.instance_name();
                let wanted = match kind {
                    IofaceKind::Interface => snapshot
                        .interfaces
                        .get(name)
                        .map(|i| (i.to.node.as_str(), i.to.port.as_str())),
                    IofaceKind::Outerface => snapshot
                        .outerfaces
                        .get(name)
                        .map(|o| (o.from.node.as_str(), o.from.port.as_str())),
                };
                bound.push((kind, name.clone(), wanted == Some((child, iface.port.as_str()))));
            }
        }

        for (kind, name, unchanged) in bound {
            let pinned = match parent {
                Some(parent) => graph
                    .boundary_port_is_linked(parent, protocol, kind, &name)
                    .map_err(at)?,
                None => false,
            };
            if pinned && unchanged {
                continue;
            }
            graph.remove_ioface(protocol, kind, &name).map_err(at)?;
        }
        Ok(())
    }

    /// Adds the ifaces of `snapshot` that `protocol` does not have yet.
    fn sync_ifaces(
        &self,
        graph: &mut ProcessGraph,
        protocol: NodeId,
        path: &str,
        snapshot: &GraphSnapshot,
    ) -> Result<(), BuildError> {
        let at = |e: GraphError| BuildError::new(path, e);

        for (name, iface) in &snapshot.interfaces {
            if graph.protocol(protocol).map_err(at)?.interfaces().contains_key(name) {
                continue;
            }
            let child = graph.child(protocol, &iface.to.node).map_err(at)?;
            graph
                .add_interface(protocol, name, child, &iface.to.port)
                .map_err(at)?;
        }
        for (name, iface) in &snapshot.outerfaces {
            if graph.protocol(protocol).map_err(at)?.outerfaces().contains_key(name) {
                continue;
            }
            let child = graph.child(protocol, &iface.from.node).map_err(at)?;
            graph
                .add_outerface(protocol, name, child, &iface.from.port)
                .map_err(at)?;
        }
        Ok(())
    }

    /// Adds the dynamic ports listed in a description entry that the node
    /// does not have yet.
    fn apply_dynamic_ports(
        &self,
        graph: &mut ProcessGraph,
        id: NodeId,
        path: &str,
        desc: &NodeSnapshot,
    ) -> Result<(), BuildError> {
        let groups = [
            (PortDirection::Input, desc.inputs.as_deref()),
            (PortDirection::Output, desc.outputs.as_deref()),
        ];
        for (direction, ports) in groups {
            for port in ports.unwrap_or_default() {
                let node = graph.node(id).map_err(|e| BuildError::new(path, e))?;
                if node.ports(direction).contains(&port.name) {
                    continue;
                }
                if !node.io_specs(direction).is_dynamic() {
                    return Err(BuildError::new(
                        path,
                        GraphError::NotDynamic {
                            node: path.to_string(),
                            direction,
                        },
                    ));
                }
                let spec = self
                    .registry
                    .port_spec(port)
                    .map_err(|e| BuildError::new(path, e))?;
                graph
                    .push_port(id, direction, &port.name, spec, true)
                    .map_err(|e| BuildError::new(path, e))?;
            }
        }
        Ok(())
    }

    fn check_connectors(&self, graph: &ProcessGraph, top: NodeId) -> Result<(), BuildError> {
        if !self.check_types {
            return Ok(());
        }
        for id in graph.descendants(top) {
            let is_protocol = graph
                .node(id)
                .map(|n| n.is_protocol())
                .unwrap_or(false);
            if is_protocol {
                graph
                    .validate_connectors(id)
                    .map_err(|e| BuildError::new(dotted_path(graph, id), e))?;
            }
        }
        Ok(())
    }

    /// Saves one record per node of `graph` and returns how many were written.
    pub fn persist(
        graph: &ProcessGraph,
        store: &dyn NodeStore,
    ) -> Result<usize, BuildError> {
        let root = graph.root();
        let mut count = 0;
        for id in graph.descendants(root) {
            let record = node_record(graph, id).map_err(|e| BuildError::new(dotted_path(graph, id), e))?;
            store
                .save_node(record)
                .map_err(|e| BuildError::new(dotted_path(graph, id), e))?;
            count += 1;
        }
        GraphPersisted {
            name: &graph.describe(root),
            record_count: count,
        }
        .log();
        Ok(count)
    }
}

/// Record of node `id` as a [`NodeStore`] keeps it. Protocol boundary ports
/// share their slot with a child port and are not recorded.
pub fn node_record(graph: &ProcessGraph, id: NodeId) -> Result<NodeRecord, GraphError> {
    let node = graph.node(id)?;
    let ports = |direction: PortDirection| -> Vec<PortRecord> {
        if node.is_protocol() {
            return Vec::new();
        }
        node.ports(direction)
            .iter()
            .map(|port| {
                let slot = graph.slot(port.slot());
                PortRecord {
                    name: port.name().to_string(),
                    spec: port.spec().clone(),
                    dynamic: port.is_dynamic(),
                    resource: slot.resource().cloned(),
                    provided: slot.is_provided(),
                }
            })
            .collect()
    };
    Ok(NodeRecord {
        id,
        parent: node.parent(),
        instance_name: node.instance_name().to_string(),
        type_id: node.type_id().to_string(),
        config: node.config().clone(),
        status: node.status(),
        error: node.error().map(|e| e.kind.to_string()),
        inputs: ports(PortDirection::Input),
        outputs: ports(PortDirection::Output),
    })
}

fn dotted_path(graph: &ProcessGraph, id: NodeId) -> String {
    graph.instance_chain(id).join(".")
}
