// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Failures reported by a [`NodeStore`](crate::traits::NodeStore) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Node store backend failure: {0}")]
    Backend(String),
}

/// Failures reported by a [`ResourceCodec`](crate::traits::ResourceCodec) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Resource '{0}' is unknown to the codec")]
    NotFound(String),

    #[error("Resource '{id}' is stored as '{stored}' but was referenced as '{referenced}'")]
    TypeMismatch {
        id: String,
        stored: String,
        referenced: String,
    },

    #[error("Resource codec backend failure: {0}")]
    Backend(String),
}
