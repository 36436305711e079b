// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Explicit registry of node types and resource types.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::consts::{GENERIC_PROTOCOL_TYPE, ROOT_RESOURCE_TYPE};
use crate::config::{ConfigSpec, GraphSnapshot, PortSnapshot};
use crate::errors::RegistryError;
use crate::graph::{IoSpecs, PortSpec, ResourceType};
use crate::traits::Task;

/// Produces a fresh task instance for every node of a task type.
pub type TaskFactory = Arc<dyn Fn() -> Arc<dyn Task> + Send + Sync>;

#[derive(Clone)]
pub enum ResolvedKind {
    Task(TaskFactory),
    /// `template` is the default content of a registered protocol type
    Protocol { template: Option<GraphSnapshot> },
}

/// What the builder needs to know about a type id.
#[derive(Clone)]
pub struct ResolvedType {
    pub type_id: String,
    pub inputs: IoSpecs,
    pub outputs: IoSpecs,
    pub config: ConfigSpec,
    pub kind: ResolvedKind,
}

impl ResolvedType {
    pub fn is_protocol(&self) -> bool {
        matches!(self.kind, ResolvedKind::Protocol { .. })
    }
}

impl fmt::Debug for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedType")
            .field("type_id", &self.type_id)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("protocol", &self.is_protocol())
            .finish()
    }
}

/// Node types and resource types known to a builder.
///
/// Starts with the root resource type and the generic protocol type.
#[derive(Clone)]
pub struct TypeRegistry {
    node_types: HashMap<String, ResolvedType>,
    resource_types: HashMap<String, ResourceType>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut node_types: Vec<&String> = self.node_types.keys().collect();
        node_types.sort();
        let mut resource_types: Vec<&String> = self.resource_types.keys().collect();
        resource_types.sort();
        f.debug_struct("TypeRegistry")
            .field("node_types", &node_types)
            .field("resource_types", &resource_types)
            .finish()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            node_types: HashMap::new(),
            resource_types: HashMap::new(),
        };
        registry
            .resource_types
            .insert(ROOT_RESOURCE_TYPE.to_string(), ResourceType::root());
        registry.node_types.insert(
            GENERIC_PROTOCOL_TYPE.to_string(),
            ResolvedType {
                type_id: GENERIC_PROTOCOL_TYPE.to_string(),
                inputs: IoSpecs::default(),
                outputs: IoSpecs::default(),
                config: ConfigSpec::default(),
                kind: ResolvedKind::Protocol { template: None },
            },
        );
        registry
    }

    /// Registers resource type `name` as a child of `parent`.
    pub fn register_resource_type(
        &mut self,
        name: &str,
        parent: &str,
    ) -> Result<ResourceType, RegistryError> {
        if self.resource_types.contains_key(name) {
            return Err(RegistryError::DuplicateResourceType(name.to_string()));
        }
        let parent = self.resource_type(parent)?;
        let resource_type = ResourceType::derive(name, &parent);
        self.resource_types
            .insert(name.to_string(), resource_type.clone());
        Ok(resource_type)
    }

    pub fn resource_type(&self, name: &str) -> Result<ResourceType, RegistryError> {
        self.resource_types
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownResourceType(name.to_string()))
    }

    /// Registers a task type. The factory is called once here to read the
    /// task's port and config declarations.
    pub fn register_task<F>(&mut self, type_id: &str, factory: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Arc<dyn Task> + Send + Sync + 'static,
    {
        self.ensure_free(type_id)?;
        let probe = factory();
        let resolved = ResolvedType {
            type_id: type_id.to_string(),
            inputs: probe.input_specs(),
            outputs: probe.output_specs(),
            config: probe.config_spec(),
            kind: ResolvedKind::Task(Arc::new(factory)),
        };
        self.node_types.insert(type_id.to_string(), resolved);
        Ok(())
    }

    /// Registers a protocol type whose instances start from `template`.
    pub fn register_protocol(
        &mut self,
        type_id: &str,
        template: GraphSnapshot,
        config: ConfigSpec,
    ) -> Result<(), RegistryError> {
        self.ensure_free(type_id)?;
        self.node_types.insert(
            type_id.to_string(),
            ResolvedType {
                type_id: type_id.to_string(),
                inputs: IoSpecs::default(),
                outputs: IoSpecs::default(),
                config,
                kind: ResolvedKind::Protocol {
                    template: Some(template),
                },
            },
        );
        Ok(())
    }

    fn ensure_free(&self, type_id: &str) -> Result<(), RegistryError> {
        if self.node_types.contains_key(type_id) {
            return Err(RegistryError::DuplicateType(type_id.to_string()));
        }
        Ok(())
    }

    pub fn resolve_type(&self, type_id: &str) -> Result<&ResolvedType, RegistryError> {
        self.node_types
            .get(type_id)
            .ok_or_else(|| RegistryError::UnknownType(type_id.to_string()))
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.node_types.contains_key(type_id)
    }

    pub fn type_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.node_types.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Port spec described by a dumped dynamic port.
    pub fn port_spec(&self, port: &PortSnapshot) -> Result<PortSpec, RegistryError> {
        if port.types.is_empty() {
            return Err(RegistryError::EmptyPortTypes(port.name.clone()));
        }
        let types = port
            .types
            .iter()
            .map(|name| self.resource_type(name))
            .collect::<Result<Vec<_>, _>>()?;
        let mut spec = PortSpec::one_of(types);
        if port.optional {
            spec = spec.optional();
        }
        if port.subclass {
            spec = spec.with_subclasses();
        }
        Ok(spec)
    }
}
