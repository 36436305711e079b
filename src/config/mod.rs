// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod loader;
mod params;
mod registry;
mod runtime;
mod snapshot;
mod validation;

pub mod consts;

pub use loader::{
    load_and_validate_config, load_config, parse_config, BuildStrategy, BuilderOptions,
    ConfigFormat, PipelineConfig,
};
pub use params::{ConfigSpec, ConfigValues, ParamKind, ParamSpec};
pub use registry::{ResolvedKind, ResolvedType, TaskFactory, TypeRegistry};
pub use runtime::{Runtime, RuntimeBuilder};
pub use snapshot::{
    GraphSnapshot, InterfaceSnapshot, LinkSnapshot, NodeSnapshot, OuterfaceSnapshot,
    PortRefSnapshot, PortSnapshot,
};
pub use validation::validate_graph_snapshot;
