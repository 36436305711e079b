// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Unknown node type '{0}'")]
    UnknownType(String),

    #[error("Node type '{0}' is already registered")]
    DuplicateType(String),

    #[error("Unknown resource type '{0}'")]
    UnknownResourceType(String),

    #[error("Resource type '{0}' is already registered")]
    DuplicateResourceType(String),

    #[error("Port '{0}' must accept at least one resource type")]
    EmptyPortTypes(String),
}
