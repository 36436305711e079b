// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Building live graphs from graph descriptions.
//!
//! [`GraphBuilder`] materializes a [`GraphSnapshot`](crate::config::GraphSnapshot)
//! into a [`ProcessGraph`](crate::graph::ProcessGraph), rebuilds a protocol
//! after its description was edited, and persists node records. Where each
//! node comes from is decided by a [`NodeInstantiator`] strategy.

pub mod graph_builder;
pub mod strategy;

pub use graph_builder::{node_record, GraphBuilder};
pub use strategy::{new_template, CreateNew, NodeInstantiator, ReadExisting, UpdateOrCreate};
