// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-memory implementations of the storage collaborators.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::sync::RwLock as AsyncRwLock;

use crate::errors::{CodecError, StoreError};
use crate::graph::{NodeId, Resource, ResourceId, ResourceRef};
use crate::traits::{NodeRecord, NodeStore, ResourceCodec};

/// [`NodeStore`] keeping records in a map. Saving overwrites by id.
#[derive(Debug, Default)]
pub struct InMemoryNodeStore {
    records: RwLock<HashMap<NodeId, NodeRecord>>,
}

impl InMemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NodeStore for InMemoryNodeStore {
    fn load_node(&self, id: NodeId) -> Result<Option<NodeRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(records.get(&id).cloned())
    }

    fn save_node(&self, record: NodeRecord) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        records.insert(record.id, record);
        Ok(())
    }
}

/// [`ResourceCodec`] keeping resources in a map keyed by reference id.
#[derive(Debug, Default)]
pub struct InMemoryResourceCodec {
    resources: AsyncRwLock<HashMap<ResourceId, Resource>>,
}

impl InMemoryResourceCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.resources.read().await.len()
    }
}

#[async_trait]
impl ResourceCodec for InMemoryResourceCodec {
    async fn serialize(&self, resource: Resource) -> Result<ResourceRef, CodecError> {
        let reference = ResourceRef::new(resource.resource_type.clone());
        self.resources.write().await.insert(reference.id(), resource);
        Ok(reference)
    }

    async fn deserialize(&self, reference: &ResourceRef) -> Result<Resource, CodecError> {
        let resources = self.resources.read().await;
        let resource = resources
            .get(&reference.id())
            .ok_or_else(|| CodecError::NotFound(reference.id().to_string()))?;
        if !resource.resource_type.is_subtype_of(reference.resource_type()) {
            return Err(CodecError::TypeMismatch {
                id: reference.id().to_string(),
                stored: resource.resource_type.name().to_string(),
                referenced: reference.resource_type().name().to_string(),
            });
        }
        Ok(resource.clone())
    }
}
