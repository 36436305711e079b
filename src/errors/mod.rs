// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod build;
mod config;
mod execution;
mod graph;
mod loader;
mod registry;
mod store;

pub use build::{BuildError, BuildErrorKind};
pub use config::{ConfigError, ValidationError};
pub use execution::{ExecutionError, ExecutionErrorKind};
pub use graph::GraphError;
pub use loader::LoaderError;
pub use registry::RegistryError;
pub use store::{CodecError, StoreError};
