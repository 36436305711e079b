// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::backends::InMemoryResourceCodec;
use crate::builder::GraphBuilder;
use crate::config::{PipelineConfig, TypeRegistry};
use crate::engine::{Executor, ProgressHandle};
use crate::errors::{BuildError, ExecutionError, GraphError};
use crate::graph::ProcessGraph;
use crate::traits::{NodeStore, ResourceCodec};

/// A built pipeline ready to run: the graph plus the executor driving it.
pub struct Runtime {
    pub graph: ProcessGraph,
    pub executor: Executor,
}

impl Runtime {
    /// Runs the root protocol.
    pub async fn run(&mut self, progress: &ProgressHandle) -> Result<(), ExecutionError> {
        let root = self.graph.root();
        self.executor.run(&mut self.graph, root, progress).await
    }

    /// Resets the root protocol so that the next run starts over.
    pub fn reset(&mut self) -> Result<(), GraphError> {
        let root = self.graph.root();
        self.graph.reset(root)
    }
}

/// Pipeline runtime builder - turns a loaded config into a [`Runtime`].
///
/// The `builder:` section of the config picks the instantiation strategy;
/// `read_existing` and `update_or_create` need a node store.
///
/// # Examples
///
/// ```
/// use protograph::config::{parse_config, ConfigFormat, RuntimeBuilder, TypeRegistry};
///
/// let cfg = parse_config("name: empty\n", ConfigFormat::Yaml).unwrap();
/// let registry = TypeRegistry::new();
///
/// let runtime = RuntimeBuilder::from_config(&cfg, &registry, None).unwrap();
/// assert_eq!(runtime.graph.len(), 1);
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Builds the graph of `cfg` with an executor backed by an in-memory codec.
    pub fn from_config(
        cfg: &PipelineConfig,
        registry: &TypeRegistry,
        store: Option<&dyn NodeStore>,
    ) -> Result<Runtime, BuildError> {
        Self::with_codec(cfg, registry, store, Arc::new(InMemoryResourceCodec::new()))
    }

    /// Same as [`from_config`](Self::from_config) with a caller-provided codec.
    pub fn with_codec(
        cfg: &PipelineConfig,
        registry: &TypeRegistry,
        store: Option<&dyn NodeStore>,
        codec: Arc<dyn ResourceCodec>,
    ) -> Result<Runtime, BuildError> {
        let graph = GraphBuilder::from_options(registry, &cfg.builder, store)?
            .materialize(&cfg.name, &cfg.graph)?;
        Ok(Runtime {
            graph,
            executor: Executor::new(codec),
        })
    }
}
