// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::errors::CodecError;
use crate::graph::{Resource, ResourceRef};

/// Turns resource content into references that can flow through ports, and back.
#[async_trait]
pub trait ResourceCodec: Send + Sync {
    async fn serialize(&self, resource: Resource) -> Result<ResourceRef, CodecError>;

    async fn deserialize(&self, reference: &ResourceRef) -> Result<Resource, CodecError>;
}
