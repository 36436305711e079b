// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::graph::{IofaceKind, NodeStatus, PortDirection};

/// Structural failures raised while editing a [`ProcessGraph`](crate::graph::ProcessGraph).
///
/// Node fields carry the instance-name chain of the node (`"root > q > task"`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("Node '{0}' does not exist in the graph")]
    UnknownNode(String),

    #[error("Protocol '{protocol}' does not contain a node named '{name}'")]
    UnknownChild { protocol: String, name: String },

    #[error("Node '{node}' has no {direction} port named '{port}'")]
    UnknownPort {
        node: String,
        direction: PortDirection,
        port: String,
    },

    #[error("Node '{node}' already has an {direction} port named '{port}'")]
    DuplicatePort {
        node: String,
        direction: PortDirection,
        port: String,
    },

    #[error("Protocol '{protocol}' already contains a node named '{name}'")]
    DuplicateNodeName { protocol: String, name: String },

    #[error("A node with id {0} already exists in the graph")]
    DuplicateNodeId(String),

    #[error("Invalid instance name '{0}': only letters, digits and underscores are allowed")]
    InvalidInstanceName(String),

    #[error("Node '{0}' is not a protocol")]
    NotAProtocol(String),

    #[error("Node '{node}' is not a direct child of protocol '{protocol}'")]
    NotADirectChild { protocol: String, node: String },

    #[error("Input port '{port}' of node '{node}' is already connected")]
    InputAlreadyConnected { node: String, port: String },

    #[error("Input port '{port}' of node '{node}' is not connected")]
    InputNotConnected { node: String, port: String },

    #[error(
        "Output '{from_port}' of '{from_node}' [{from_types}] is not compatible with \
         input '{to_port}' of '{to_node}' [{to_types}]"
    )]
    IncompatibleTypes {
        from_node: String,
        from_port: String,
        from_types: String,
        to_node: String,
        to_port: String,
        to_types: String,
    },

    #[error("Resource of type '{resource_type}' is not accepted by port '{port}' of '{node}' [{accepted}]")]
    IncompatibleResource {
        node: String,
        port: String,
        resource_type: String,
        accepted: String,
    },

    #[error("Connecting '{from}' to '{to}' would create a cycle")]
    CycleDetected { from: String, to: String },

    #[error("Protocol '{protocol}' already has an {kind} named '{name}'")]
    DuplicateIoface {
        protocol: String,
        kind: IofaceKind,
        name: String,
    },

    #[error("Protocol '{protocol}' has no {kind} named '{name}'")]
    UnknownIoface {
        protocol: String,
        kind: IofaceKind,
        name: String,
    },

    #[error(
        "The {kind} '{name}' of '{protocol}' is connected in the parent protocol '{parent}', \
         remove that link first"
    )]
    IofaceConnectedInParent {
        kind: IofaceKind,
        name: String,
        protocol: String,
        parent: String,
    },

    #[error("Node '{0}' is running")]
    NodeRunning(String),

    #[error("Node '{node}' is {status}, its ports can only be edited while it is a draft")]
    NodeNotDraft { node: String, status: NodeStatus },

    #[error("Node '{node}' does not declare dynamic {direction} ports")]
    NotDynamic {
        node: String,
        direction: PortDirection,
    },

    #[error("Port '{port}' of node '{node}' is not a dynamic port")]
    NotADynamicPort { node: String, port: String },

    #[error("The root protocol cannot be removed")]
    RootRemoval,
}
