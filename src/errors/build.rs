// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use super::{ConfigError, GraphError, RegistryError, StoreError, ValidationError};

/// A failed build. `path` is the instance-name chain where the build stopped.
///
/// Builds are atomic, so receiving this error means no graph was produced
/// (or, for a rebuild, that the existing graph was left untouched).
#[derive(Debug, Clone, Error)]
#[error("Build failed at '{path}': {kind}")]
pub struct BuildError {
    pub path: String,
    #[source]
    pub kind: BuildErrorKind,
}

impl BuildError {
    pub fn new(path: impl Into<String>, kind: impl Into<BuildErrorKind>) -> Self {
        Self {
            path: path.into(),
            kind: kind.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum BuildErrorKind {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid config for node '{node}': {source}")]
    Config {
        node: String,
        #[source]
        source: ConfigError,
    },

    #[error("Invalid graph description:\n{}", format_validation(.0))]
    Validation(Vec<ValidationError>),

    #[error("Node '{0}' must carry an id to be read from the node store")]
    MissingId(String),

    #[error("Node '{node}' has no stored record with id {id}")]
    MissingRecord { node: String, id: String },

    #[error("Stored node '{node}' has type '{stored}' but the description asks for '{requested}'")]
    TypeChanged {
        node: String,
        stored: String,
        requested: String,
    },

    #[error("The {0} strategy needs a node store")]
    MissingStore(String),

    #[error("Node '{node}' of type '{type_id}' is a task and cannot hold a nested graph")]
    UnexpectedGraph { node: String, type_id: String },
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
