// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! What a task sees: its context, an input snapshot, and the outputs it returns.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;

use super::progress::ProgressHandle;
use crate::config::consts::{DYNAMIC_INPUT_KEY, DYNAMIC_OUTPUT_KEY};
use crate::config::ConfigValues;
use crate::errors::ExecutionErrorKind;
use crate::graph::{NodeId, PortDirection, ProcessGraph, ProcessNode, Resource, ResourceRef, SlotId};
use crate::traits::ResourceCodec;

/// Everything a running task may use besides its inputs.
#[derive(Clone)]
pub struct TaskContext {
    config: ConfigValues,
    progress: ProgressHandle,
    codec: Arc<dyn ResourceCodec>,
    instance_path: String,
}

impl TaskContext {
    pub fn new(
        config: ConfigValues,
        progress: ProgressHandle,
        codec: Arc<dyn ResourceCodec>,
        instance_path: impl Into<String>,
    ) -> Self {
        Self {
            config,
            progress,
            codec,
            instance_path: instance_path.into(),
        }
    }

    /// Validated config of the node, defaults filled in.
    pub fn config(&self) -> &ConfigValues {
        &self.config
    }

    pub fn progress(&self) -> &ProgressHandle {
        &self.progress
    }

    pub fn codec(&self) -> &Arc<dyn ResourceCodec> {
        &self.codec
    }

    /// `root > q > task`
    pub fn instance_path(&self) -> &str {
        &self.instance_path
    }

    /// Hands `resource` to the codec and returns a reference for an output.
    pub async fn store(&self, resource: Resource) -> anyhow::Result<ResourceRef> {
        Ok(self.codec.serialize(resource).await?)
    }

    pub async fn load(&self, reference: &ResourceRef) -> anyhow::Result<Resource> {
        Ok(self.codec.deserialize(reference).await?)
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("instance_path", &self.instance_path)
            .field("config", &self.config)
            .finish()
    }
}

/// Snapshot of a node's inputs taken when it starts.
///
/// Fixed ports are keyed by name; an optional port with no value maps to
/// `None`. A dynamic input group is passed as one collection under
/// [`DYNAMIC_INPUT_KEY`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskInputs {
    values: BTreeMap<String, Option<ResourceRef>>,
    collections: BTreeMap<String, Vec<ResourceRef>>,
}

impl TaskInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: Option<ResourceRef>) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn with_collection(mut self, values: Vec<ResourceRef>) -> Self {
        self.collections.insert(DYNAMIC_INPUT_KEY.to_string(), values);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ResourceRef> {
        self.values.get(name).and_then(Option::as_ref)
    }

    /// Value of `name`, or an error if the port is absent or holds nothing.
    pub fn require(&self, name: &str) -> anyhow::Result<&ResourceRef> {
        self.get(name)
            .ok_or_else(|| anyhow!("input '{}' has no value", name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn get_collection(&self, key: &str) -> Option<&[ResourceRef]> {
        self.collections.get(key).map(Vec::as_slice)
    }

    /// The dynamic input group, empty when the node has none.
    pub fn collection(&self) -> &[ResourceRef] {
        self.get_collection(DYNAMIC_INPUT_KEY).unwrap_or(&[])
    }
}

/// Values returned by a task.
///
/// A dynamic output group is returned as one collection under
/// [`DYNAMIC_OUTPUT_KEY`] and distributed over the ports in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskOutputs {
    values: BTreeMap<String, ResourceRef>,
    collections: BTreeMap<String, Vec<ResourceRef>>,
}

impl TaskOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ResourceRef) {
        self.values.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: ResourceRef) -> Self {
        self.insert(name, value);
        self
    }

    pub fn set_collection(&mut self, values: Vec<ResourceRef>) {
        self.collections.insert(DYNAMIC_OUTPUT_KEY.to_string(), values);
    }

    pub fn with_collection(mut self, values: Vec<ResourceRef>) -> Self {
        self.set_collection(values);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ResourceRef> {
        self.values.get(name)
    }

    pub fn collection(&self) -> Option<&[ResourceRef]> {
        self.collections.get(DYNAMIC_OUTPUT_KEY).map(Vec::as_slice)
    }
}

/// Builds the input snapshot of `id` from its slots.
pub(crate) fn collect_inputs(
    graph: &ProcessGraph,
    id: NodeId,
) -> Result<TaskInputs, ExecutionErrorKind> {
    let node = graph
        .node(id)
        .map_err(|e| ExecutionErrorKind::InvalidGraph(e.to_string()))?;
    let mut inputs = TaskInputs::new();
    let mut missing = Vec::new();

    if node.io_specs(PortDirection::Input).is_dynamic() {
        let mut collection = Vec::new();
        for port in node.inputs().iter() {
            let slot = graph.slot(port.slot());
            match slot.resource() {
                Some(resource) => collection.push(resource.clone()),
                None if port.spec().is_optional() => {}
                None => missing.push(port.name().to_string()),
            }
        }
        inputs = inputs.with_collection(collection);
    } else {
        for port in node.inputs().iter() {
            let value = graph.slot(port.slot()).resource().cloned();
            if value.is_none() && !port.spec().is_optional() {
                missing.push(port.name().to_string());
                continue;
            }
            inputs = inputs.with(port.name(), value);
        }
    }

    if !missing.is_empty() {
        return Err(ExecutionErrorKind::MissingInputs(missing));
    }
    Ok(inputs)
}

/// Checks returned outputs against the node's output ports and pairs each
/// port slot with its new value. Every output slot is listed, so optional
/// outputs left empty are still marked provided.
pub(crate) fn check_outputs(
    node: &ProcessNode,
    outputs: TaskOutputs,
) -> Result<Vec<(SlotId, Option<ResourceRef>)>, String> {
    let mut problems = Vec::new();
    let mut values = Vec::with_capacity(node.outputs().len());

    let dynamic = node.io_specs(PortDirection::Output).is_dynamic();
    let collection = outputs.collection().unwrap_or(&[]);
    if dynamic && collection.len() > node.outputs().len() {
        return Err(format!(
            "returned {} resources for {} dynamic output ports",
            collection.len(),
            node.outputs().len()
        ));
    }
    if !dynamic && !collection.is_empty() {
        problems.push("returned a collection but declares no dynamic outputs".to_string());
    }
    for name in outputs.values.keys() {
        if dynamic || !node.outputs().contains(name) {
            problems.push(format!("returned undeclared output '{}'", name));
        }
    }

    for (index, port) in node.outputs().iter().enumerate() {
        let value = if dynamic {
            collection.get(index)
        } else {
            outputs.get(port.name())
        };
        match value {
            Some(resource) if !port.spec().resource_type_is_compatible(resource.resource_type()) => {
                problems.push(format!(
                    "output '{}' of type '{}' is not accepted by the port [{}]",
                    port.name(),
                    resource.resource_type(),
                    port.spec().describe_types()
                ));
            }
            None if !port.spec().is_optional() => {
                problems.push(format!("mandatory output '{}' was not returned", port.name()));
            }
            _ => values.push((port.slot(), value.cloned())),
        }
    }

    if problems.is_empty() {
        Ok(values)
    } else {
        Err(problems.join("; "))
    }
}
