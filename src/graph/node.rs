// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::connector::Connector;
use super::ioface::Ioface;
use super::port::{IoSpecs, PortDirection, Ports};
use crate::config::{ConfigSpec, ConfigValues, GraphSnapshot};
use crate::errors::ExecutionError;
use crate::traits::{NodeRecord, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn new() -> Self {
        NodeId(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        NodeId(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a node.
///
/// `PartiallyRun` marks a protocol whose last run ended with some children
/// unable to start. It is not terminal: running the protocol again resumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    Draft,
    Running,
    Success,
    Error,
    PartiallyRun,
}

impl NodeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeStatus::Success | NodeStatus::Error)
    }

    /// Draft nodes and partially run protocols may be started.
    pub fn is_startable(&self) -> bool {
        matches!(self, NodeStatus::Draft | NodeStatus::PartiallyRun)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeStatus::Draft => "DRAFT",
            NodeStatus::Running => "RUNNING",
            NodeStatus::Success => "SUCCESS",
            NodeStatus::Error => "ERROR",
            NodeStatus::PartiallyRun => "PARTIALLY_RUN",
        };
        f.write_str(s)
    }
}

/// Contents of a protocol node.
#[derive(Debug, Clone, Default)]
pub struct ProtocolBody {
    pub(crate) children: BTreeMap<String, NodeId>,
    pub(crate) connectors: Vec<Connector>,
    pub(crate) interfaces: BTreeMap<String, Ioface>,
    pub(crate) outerfaces: BTreeMap<String, Ioface>,
}

impl ProtocolBody {
    pub fn children(&self) -> &BTreeMap<String, NodeId> {
        &self.children
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    pub fn interfaces(&self) -> &BTreeMap<String, Ioface> {
        &self.interfaces
    }

    pub fn outerfaces(&self) -> &BTreeMap<String, Ioface> {
        &self.outerfaces
    }
}

#[derive(Clone)]
pub enum NodeKind {
    Task(Arc<dyn Task>),
    Protocol(ProtocolBody),
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Task(task) => f.debug_tuple("Task").field(&task.name()).finish(),
            NodeKind::Protocol(body) => f.debug_tuple("Protocol").field(body).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessNode {
    pub(crate) id: NodeId,
    pub(crate) instance_name: String,
    pub(crate) type_id: String,
    pub(crate) config: ConfigValues,
    pub(crate) config_spec: ConfigSpec,
    pub(crate) input_specs: IoSpecs,
    pub(crate) output_specs: IoSpecs,
    pub(crate) inputs: Ports,
    pub(crate) outputs: Ports,
    pub(crate) status: NodeStatus,
    pub(crate) parent: Option<NodeId>,
    pub(crate) error: Option<ExecutionError>,
    pub(crate) kind: NodeKind,
}

impl ProcessNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn config(&self) -> &ConfigValues {
        &self.config
    }

    pub fn config_spec(&self) -> &ConfigSpec {
        &self.config_spec
    }

    pub fn inputs(&self) -> &Ports {
        &self.inputs
    }

    pub fn outputs(&self) -> &Ports {
        &self.outputs
    }

    pub fn ports(&self, direction: PortDirection) -> &Ports {
        match direction {
            PortDirection::Input => &self.inputs,
            PortDirection::Output => &self.outputs,
        }
    }

    pub(crate) fn ports_mut(&mut self, direction: PortDirection) -> &mut Ports {
        match direction {
            PortDirection::Input => &mut self.inputs,
            PortDirection::Output => &mut self.outputs,
        }
    }

    pub fn io_specs(&self, direction: PortDirection) -> &IoSpecs {
        match direction {
            PortDirection::Input => &self.input_specs,
            PortDirection::Output => &self.output_specs,
        }
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn error(&self) -> Option<&ExecutionError> {
        self.error.as_ref()
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self.kind, NodeKind::Protocol(_))
    }

    pub fn protocol(&self) -> Option<&ProtocolBody> {
        match &self.kind {
            NodeKind::Protocol(body) => Some(body),
            NodeKind::Task(_) => None,
        }
    }

    pub(crate) fn protocol_mut(&mut self) -> Option<&mut ProtocolBody> {
        match &mut self.kind {
            NodeKind::Protocol(body) => Some(body),
            NodeKind::Task(_) => None,
        }
    }
}

#[derive(Clone)]
pub enum TemplateKind {
    Task(Arc<dyn Task>),
    /// `graph` is the registered default content of the protocol type, if any.
    Protocol { graph: Option<GraphSnapshot> },
}

/// Everything needed to insert a node into a graph.
///
/// Built by the [`builder`](crate::builder) from a resolved type. `restored`
/// carries the stored state of a node read back from a
/// [`NodeStore`](crate::traits::NodeStore).
#[derive(Clone)]
pub struct NodeTemplate {
    pub id: NodeId,
    pub type_id: String,
    pub config: ConfigValues,
    pub config_spec: ConfigSpec,
    pub inputs: IoSpecs,
    pub outputs: IoSpecs,
    pub kind: TemplateKind,
    pub restored: Option<NodeRecord>,
}

impl fmt::Debug for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateKind::Task(task) => f.debug_tuple("Task").field(&task.name()).finish(),
            TemplateKind::Protocol { graph } => f
                .debug_struct("Protocol")
                .field("graph", &graph.as_ref().map(|g| g.nodes.len()))
                .finish(),
        }
    }
}

impl fmt::Debug for NodeTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTemplate")
            .field("id", &self.id)
            .field("type_id", &self.type_id)
            .field("config", &self.config)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("kind", &self.kind)
            .field("restored", &self.restored.as_ref().map(|r| r.status))
            .finish()
    }
}

impl NodeTemplate {
    /// A protocol with no declared ports or config.
    pub fn protocol(type_id: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            type_id: type_id.into(),
            config: ConfigValues::default(),
            config_spec: ConfigSpec::default(),
            inputs: IoSpecs::default(),
            outputs: IoSpecs::default(),
            kind: TemplateKind::Protocol { graph: None },
            restored: None,
        }
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self.kind, TemplateKind::Protocol { .. })
    }
}

/// Instance names must match `^\w+$`.
pub fn is_valid_instance_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}
