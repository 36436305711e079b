// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The live process graph: nodes, ports, connectors and ifaces held in one arena.

mod arena;
mod connector;
mod dump;
mod dynamic;
mod ioface;
mod lifecycle;
mod node;
mod port;
mod resource;
mod wiring;

pub use arena::ProcessGraph;
pub use connector::{Connector, InputPortRef, OutputPortRef};
pub use ioface::{Ioface, IofaceKind};
pub use node::{
    is_valid_instance_name, NodeId, NodeKind, NodeStatus, NodeTemplate, ProcessNode,
    ProtocolBody, TemplateKind,
};
pub use port::{IoSpecs, Port, PortDirection, PortSpec, Ports, Slot, SlotId};
pub use resource::{Resource, ResourceId, ResourceRef, ResourceType};
