// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;      // in-memory store and codec, progress sinks
pub mod builder;       // graph descriptions -> live graphs
pub mod config;        // descriptions, loader, registry, validation
pub mod engine;        // executor and task IO
pub mod errors;        // error handling
pub mod graph;         // nodes, ports, connectors, ifaces
pub mod observability;
pub mod traits;        // collaborator abstractions
