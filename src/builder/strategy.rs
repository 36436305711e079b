// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Node instantiation strategies.
//!
//! The builder walks a graph description and asks a [`NodeInstantiator`]
//! for the [`NodeTemplate`] behind each entry. Strategies differ in where
//! a node comes from:
//!
//! * [`CreateNew`] - resolve the type, validate the config, fresh id
//! * [`ReadExisting`] - restore the stored record named by the entry's id
//! * [`UpdateOrCreate`] - restore when the stored record has the same type,
//!   with the description's config applied on top, otherwise create new

use crate::config::{BuildStrategy, ConfigValues, NodeSnapshot, ResolvedKind, ResolvedType, TypeRegistry};
use crate::errors::BuildErrorKind;
use crate::graph::{NodeId, NodeTemplate, TemplateKind};
use crate::observability::messages::builder::NodeRestored;
use crate::observability::messages::StructuredLog;
use crate::traits::{NodeRecord, NodeStore};

/// Produces the template of one node of a graph description.
pub trait NodeInstantiator {
    fn strategy(&self) -> BuildStrategy;

    /// Whether connector types can be checked while wiring. Strategies that
    /// restore stored nodes wire first and check once the graph is complete.
    fn checks_types_while_wiring(&self) -> bool {
        true
    }

    /// `path` is the dotted instance path of the node, used in errors.
    fn instantiate(
        &self,
        registry: &TypeRegistry,
        path: &str,
        snapshot: &NodeSnapshot,
    ) -> Result<NodeTemplate, BuildErrorKind>;
}

/// Template for a fresh node of `resolved` type with `config` validated
/// against the type's config spec.
pub fn new_template(
    resolved: &ResolvedType,
    path: &str,
    config: &ConfigValues,
    id: NodeId,
) -> Result<NodeTemplate, BuildErrorKind> {
    let config = resolved
        .config
        .validate(config)
        .map_err(|source| BuildErrorKind::Config {
            node: path.to_string(),
            source,
        })?;
    let kind = match &resolved.kind {
        ResolvedKind::Task(factory) => TemplateKind::Task(factory()),
        ResolvedKind::Protocol { template } => TemplateKind::Protocol {
            graph: template.clone(),
        },
    };
    Ok(NodeTemplate {
        id,
        type_id: resolved.type_id.clone(),
        config,
        config_spec: resolved.config.clone(),
        inputs: resolved.inputs.clone(),
        outputs: resolved.outputs.clone(),
        kind,
        restored: None,
    })
}

fn restored_template(
    registry: &TypeRegistry,
    path: &str,
    record: NodeRecord,
) -> Result<NodeTemplate, BuildErrorKind> {
    let resolved = registry.resolve_type(&record.type_id)?;
    let mut template = new_template(resolved, path, &record.config, record.id)?;
    NodeRestored {
        node: path,
        type_id: &record.type_id,
        status: &record.status.to_string(),
    }
    .log();
    template.restored = Some(record);
    Ok(template)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CreateNew;

impl NodeInstantiator for CreateNew {
    fn strategy(&self) -> BuildStrategy {
        BuildStrategy::CreateNew
    }

    fn instantiate(
        &self,
        registry: &TypeRegistry,
        path: &str,
        snapshot: &NodeSnapshot,
    ) -> Result<NodeTemplate, BuildErrorKind> {
        let resolved = registry.resolve_type(&snapshot.type_id)?;
        new_template(resolved, path, &snapshot.config, NodeId::new())
    }
}

/// Restores every node from a [`NodeStore`]. Entries must carry an id.
pub struct ReadExisting<'s> {
    store: &'s dyn NodeStore,
}

impl<'s> ReadExisting<'s> {
    pub fn new(store: &'s dyn NodeStore) -> Self {
        Self { store }
    }
}

impl NodeInstantiator for ReadExisting<'_> {
    fn strategy(&self) -> BuildStrategy {
        BuildStrategy::ReadExisting
    }

    fn checks_types_while_wiring(&self) -> bool {
        false
    }

    fn instantiate(
        &self,
        registry: &TypeRegistry,
        path: &str,
        snapshot: &NodeSnapshot,
    ) -> Result<NodeTemplate, BuildErrorKind> {
        let id = snapshot
            .id
            .map(NodeId::from_uuid)
            .ok_or_else(|| BuildErrorKind::MissingId(path.to_string()))?;
        let record = self
            .store
            .load_node(id)?
            .ok_or_else(|| BuildErrorKind::MissingRecord {
                node: path.to_string(),
                id: id.to_string(),
            })?;
        if record.type_id != snapshot.type_id {
            return Err(BuildErrorKind::TypeChanged {
                node: path.to_string(),
                stored: record.type_id,
                requested: snapshot.type_id.clone(),
            });
        }
        restored_template(registry, path, record)
    }
}

/// Restores nodes whose stored record matches the entry's type and creates
/// the rest.
pub struct UpdateOrCreate<'s> {
    store: &'s dyn NodeStore,
}

impl<'s> UpdateOrCreate<'s> {
    pub fn new(store: &'s dyn NodeStore) -> Self {
        Self { store }
    }
}

impl NodeInstantiator for UpdateOrCreate<'_> {
    fn strategy(&self) -> BuildStrategy {
        BuildStrategy::UpdateOrCreate
    }

    fn checks_types_while_wiring(&self) -> bool {
        false
    }

    fn instantiate(
        &self,
        registry: &TypeRegistry,
        path: &str,
        snapshot: &NodeSnapshot,
    ) -> Result<NodeTemplate, BuildErrorKind> {
        let Some(id) = snapshot.id.map(NodeId::from_uuid) else {
            return CreateNew.instantiate(registry, path, snapshot);
        };
        match self.store.load_node(id)? {
            Some(mut record) if record.type_id == snapshot.type_id => {
                for (name, value) in snapshot.config.iter() {
                    record.config.insert(name.clone(), value.clone());
                }
                restored_template(registry, path, record)
            }
            Some(record) => {
                tracing::info!(
                    node = path,
                    stored = %record.type_id,
                    requested = %snapshot.type_id,
                    "Stored node has another type, creating a new one"
                );
                CreateNew.instantiate(registry, path, snapshot)
            }
            None => {
                let resolved = registry.resolve_type(&snapshot.type_id)?;
                new_template(resolved, path, &snapshot.config, id)
            }
        }
    }
}
