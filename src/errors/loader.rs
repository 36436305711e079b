// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use super::ValidationError;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML pipeline config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON pipeline config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML pipeline config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unsupported pipeline config extension '{0}' (expected yaml, yml, json or toml)")]
    UnsupportedFormat(String),

    #[error("Pipeline config validation failed:\n{}", format_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
