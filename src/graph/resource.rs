// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Resource types and references.
//!
//! Resource types form a single-inheritance tree rooted at
//! [`ROOT_RESOURCE_TYPE`]. A [`ResourceRef`] is what flows through ports: an
//! opaque id tagged with its type. The data behind it lives in a
//! [`ResourceCodec`](crate::traits::ResourceCodec).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::consts::ROOT_RESOURCE_TYPE;

struct TypeNode {
    name: String,
    parent: Option<ResourceType>,
}

/// A named node in the resource type tree.
///
/// Cloning is cheap. Two types are equal when their names are equal; the
/// [`TypeRegistry`](crate::config::TypeRegistry) keeps names unique.
#[derive(Clone)]
pub struct ResourceType(Arc<TypeNode>);

impl ResourceType {
    /// The root of every type tree.
    pub fn root() -> Self {
        ResourceType(Arc::new(TypeNode {
            name: ROOT_RESOURCE_TYPE.to_string(),
            parent: None,
        }))
    }

    pub fn derive(name: impl Into<String>, parent: &ResourceType) -> Self {
        ResourceType(Arc::new(TypeNode {
            name: name.into(),
            parent: Some(parent.clone()),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn parent(&self) -> Option<&ResourceType> {
        self.0.parent.as_ref()
    }

    /// This type followed by its ancestors up to the root.
    pub fn lineage(&self) -> impl Iterator<Item = &ResourceType> {
        std::iter::successors(Some(self), |t| t.parent())
    }

    /// True when `self` is `other` or descends from it.
    pub fn is_subtype_of(&self, other: &ResourceType) -> bool {
        self.lineage().any(|t| t.name() == other.name())
    }
}

impl PartialEq for ResourceType {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for ResourceType {}

impl Hash for ResourceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceType({})", self.name())
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(Uuid);

impl ResourceId {
    pub fn new() -> Self {
        ResourceId(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        ResourceId(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Reference to an immutable resource. Identity is the id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    id: ResourceId,
    resource_type: ResourceType,
}

impl ResourceRef {
    pub fn new(resource_type: ResourceType) -> Self {
        Self::with_id(ResourceId::new(), resource_type)
    }

    pub fn with_id(id: ResourceId, resource_type: ResourceType) -> Self {
        Self { id, resource_type }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }
}

/// Materialized resource content handed to and returned by the codec.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub resource_type: ResourceType,
    pub content: serde_json::Value,
}

impl Resource {
    pub fn new(resource_type: ResourceType, content: serde_json::Value) -> Self {
        Self {
            resource_type,
            content,
        }
    }
}
