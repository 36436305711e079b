// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Name of the root of every resource type tree
pub const ROOT_RESOURCE_TYPE: &str = "Resource";
/// Type id of the built-in generic protocol (a container with no fixed content)
pub const GENERIC_PROTOCOL_TYPE: &str = "Protocol";
/// Key under which a dynamic input group is handed to a task, also the name prefix of its ports
pub const DYNAMIC_INPUT_KEY: &str = "source";
/// Key under which a task returns its dynamic output group, also the name prefix of its ports
pub const DYNAMIC_OUTPUT_KEY: &str = "target";
/// Default log filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info";
