// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{validate_graph_snapshot, GraphSnapshot};
use crate::errors::LoaderError;

/// A pipeline: a named root protocol, its content and how to build it.
///
/// Loaded from YAML, JSON or TOML, picked by file extension.
///
/// # Example
/// ```yaml
/// name: analysis
/// builder:
///   strategy: create_new
///   check_types: true
/// graph:
///   nodes:
///     load: { type: LoadTable, config: { path: data.csv } }
///     stats: { type: Describe }
///   links:
///     - { from: { node: load, port: out }, to: { node: stats, port: in } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    #[serde(default)]
    pub builder: BuilderOptions,
    #[serde(default)]
    pub graph: GraphSnapshot,
}

/// How nodes are instantiated while building.
///
/// * `CreateNew` - Resolve every type in the registry and create fresh nodes
/// * `ReadExisting` - Restore every node from the node store by id
/// * `UpdateOrCreate` - Restore nodes found in the store, create the others
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStrategy {
    #[default]
    CreateNew,
    ReadExisting,
    UpdateOrCreate,
}

/// Builder options.
///
/// # Fields
/// * `strategy` - Node instantiation strategy (defaults to `create_new`)
/// * `check_types` - Check connector port types at build time (defaults to true)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderOptions {
    #[serde(default)]
    pub strategy: BuildStrategy,
    #[serde(default = "default_check_types")]
    pub check_types: bool,
}

fn default_check_types() -> bool {
    true
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            strategy: BuildStrategy::default(),
            check_types: default_check_types(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self, LoaderError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match extension.as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "json" => Ok(ConfigFormat::Json),
            "toml" => Ok(ConfigFormat::Toml),
            other => Err(LoaderError::UnsupportedFormat(other.to_string())),
        }
    }
}

pub fn parse_config(content: &str, format: ConfigFormat) -> Result<PipelineConfig, LoaderError> {
    let cfg = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Toml => toml::from_str(content)?,
    };
    Ok(cfg)
}

/// Load a pipeline config, format picked from the file extension.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, LoaderError> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let content = fs::read_to_string(path).map_err(|source| LoaderError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&content, format)
}

/// Load a pipeline config and run structural validation on its graph.
///
/// Every validation problem is reported, not just the first.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, LoaderError> {
    let cfg = load_config(path)?;
    validate_graph_snapshot(&cfg.graph).map_err(LoaderError::Invalid)?;
    Ok(cfg)
}
