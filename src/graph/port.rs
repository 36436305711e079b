// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Typed ports and the slots that hold their values.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::resource::{ResourceRef, ResourceType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    Input,
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => f.write_str("input"),
            PortDirection::Output => f.write_str("output"),
        }
    }
}

/// What a port accepts.
///
/// `types` is never empty. An optional port is always ready. With
/// `subclass` set, supertypes of an accepted type are accepted as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    types: Vec<ResourceType>,
    optional: bool,
    subclass: bool,
}

impl PortSpec {
    pub fn new(resource_type: ResourceType) -> Self {
        Self {
            types: vec![resource_type],
            optional: false,
            subclass: false,
        }
    }

    /// Accepts any of `types`. An empty list falls back to the root type.
    pub fn one_of(types: Vec<ResourceType>) -> Self {
        if types.is_empty() {
            return Self::any();
        }
        Self {
            types,
            optional: false,
            subclass: false,
        }
    }

    /// Accepts every resource.
    pub fn any() -> Self {
        Self::new(ResourceType::root())
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_subclasses(mut self) -> Self {
        self.subclass = true;
        self
    }

    pub fn types(&self) -> &[ResourceType] {
        &self.types
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn accepts_subclasses(&self) -> bool {
        self.subclass
    }

    pub fn default_type(&self) -> &ResourceType {
        &self.types[0]
    }

    /// Whether a resource of `resource_type` may be placed in this port.
    pub fn resource_type_is_compatible(&self, resource_type: &ResourceType) -> bool {
        self.types.iter().any(|accepted| {
            resource_type.is_subtype_of(accepted)
                || (self.subclass && accepted.is_subtype_of(resource_type))
        })
    }

    /// Whether an output port with this spec may feed an input port with `input`.
    pub fn is_compatible_with(&self, input: &PortSpec) -> bool {
        if self
            .types
            .iter()
            .any(|t| input.resource_type_is_compatible(t))
        {
            return true;
        }
        self.subclass
            && input
                .types
                .iter()
                .any(|t| self.resource_type_is_compatible(t))
    }

    /// Accepted type names joined for error messages.
    pub fn describe_types(&self) -> String {
        self.types
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(usize);

/// Arena cell behind one or more ports.
///
/// `provided` is separate from the value so an optional port can be marked
/// satisfied while holding nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slot {
    resource: Option<ResourceRef>,
    provided: bool,
}

impl Slot {
    pub fn resource(&self) -> Option<&ResourceRef> {
        self.resource.as_ref()
    }

    pub fn is_provided(&self) -> bool {
        self.provided
    }

    pub fn is_empty(&self) -> bool {
        self.resource.is_none() && !self.provided
    }

    pub(crate) fn provide(&mut self, resource: Option<ResourceRef>) {
        self.resource = resource;
        self.provided = true;
    }

    pub(crate) fn clear(&mut self) {
        self.resource = None;
        self.provided = false;
    }
}

/// Slot storage. Released cells are reused by later allocations.
#[derive(Debug, Clone, Default)]
pub(crate) struct Slots {
    cells: Vec<Slot>,
    free: Vec<SlotId>,
}

impl Slots {
    pub(crate) fn alloc(&mut self) -> SlotId {
        match self.free.pop() {
            Some(id) => {
                self.cells[id.0] = Slot::default();
                id
            }
            None => {
                self.cells.push(Slot::default());
                SlotId(self.cells.len() - 1)
            }
        }
    }

    /// Returns `id` to the free list. No port may refer to it afterwards.
    pub(crate) fn release(&mut self, id: SlotId) {
        if !self.free.contains(&id) {
            self.cells[id.0].clear();
            self.free.push(id);
        }
    }

    /// Number of slots in use.
    pub(crate) fn live(&self) -> usize {
        self.cells.len() - self.free.len()
    }

    pub(crate) fn get(&self, id: SlotId) -> &Slot {
        &self.cells[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: SlotId) -> &mut Slot {
        &mut self.cells[id.0]
    }
}

#[derive(Debug, Clone)]
pub struct Port {
    name: String,
    spec: PortSpec,
    slot: SlotId,
    dynamic: bool,
}

impl Port {
    pub(crate) fn new(name: impl Into<String>, spec: PortSpec, slot: SlotId, dynamic: bool) -> Self {
        Self {
            name: name.into(),
            spec,
            slot,
            dynamic,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &PortSpec {
        &self.spec
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }
}

/// Ports of one side of a node, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Ports(Vec<Port>);

impl Ports {
    pub fn get(&self, name: &str) -> Option<&Port> {
        self.0.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.0.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn push(&mut self, port: Port) {
        self.0.push(port);
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Port> {
        let index = self.0.iter().position(|p| p.name == name)?;
        Some(self.0.remove(index))
    }
}

/// Port declarations of one side of a node type.
///
/// A `Dynamic` group starts with `ports` and can grow one port at a time;
/// `additional` is the spec given to ports added later.
#[derive(Debug, Clone)]
pub enum IoSpecs {
    Fixed(Vec<(String, PortSpec)>),
    Dynamic {
        ports: Vec<(String, PortSpec)>,
        additional: Option<PortSpec>,
    },
}

impl Default for IoSpecs {
    fn default() -> Self {
        IoSpecs::Fixed(Vec::new())
    }
}

impl IoSpecs {
    pub fn fixed<I, S>(ports: I) -> Self
    where
        I: IntoIterator<Item = (S, PortSpec)>,
        S: Into<String>,
    {
        IoSpecs::Fixed(ports.into_iter().map(|(n, s)| (n.into(), s)).collect())
    }

    pub fn dynamic<I, S>(ports: I, additional: Option<PortSpec>) -> Self
    where
        I: IntoIterator<Item = (S, PortSpec)>,
        S: Into<String>,
    {
        IoSpecs::Dynamic {
            ports: ports.into_iter().map(|(n, s)| (n.into(), s)).collect(),
            additional,
        }
    }

    pub fn ports(&self) -> &[(String, PortSpec)] {
        match self {
            IoSpecs::Fixed(ports) => ports,
            IoSpecs::Dynamic { ports, .. } => ports,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, IoSpecs::Dynamic { .. })
    }

    /// Spec for a port appended to a dynamic group.
    pub fn additional_port_spec(&self) -> Option<PortSpec> {
        match self {
            IoSpecs::Fixed(_) => None,
            IoSpecs::Dynamic { additional, .. } => {
                Some(additional.clone().unwrap_or_else(PortSpec::any))
            }
        }
    }
}
