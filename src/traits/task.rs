// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::config::ConfigSpec;
use crate::engine::{TaskContext, TaskInputs, TaskOutputs};
use crate::graph::IoSpecs;

/// Outcome of [`Task::check_before_run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreRunCheck {
    Proceed,
    /// Refuse to run; the node ends in error with this message.
    Veto(String),
}

/// A leaf unit of work.
///
/// Port and config declarations are read once when the type is registered.
/// `run` receives a snapshot of the node's inputs and its validated config,
/// and returns the values of its outputs.
#[async_trait]
pub trait Task: Send + Sync {
    async fn run(&self, ctx: TaskContext, inputs: TaskInputs) -> anyhow::Result<TaskOutputs>;

    async fn check_before_run(&self, _ctx: &TaskContext, _inputs: &TaskInputs) -> PreRunCheck {
        PreRunCheck::Proceed
    }

    fn name(&self) -> &'static str;

    fn input_specs(&self) -> IoSpecs {
        IoSpecs::default()
    }

    fn output_specs(&self) -> IoSpecs {
        IoSpecs::default()
    }

    fn config_spec(&self) -> ConfigSpec {
        ConfigSpec::default()
    }
}
