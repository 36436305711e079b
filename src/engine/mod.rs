// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Execution of process graphs.
//!
//! [`Executor`] walks a [`ProcessGraph`](crate::graph::ProcessGraph) and runs
//! every node that becomes ready, tasks concurrently, protocols by deriving
//! their status from their children. Tasks see their inputs as
//! [`TaskInputs`] and report back [`TaskOutputs`], which are checked against
//! the output ports before anything is written.

pub mod executor;
pub mod io;
pub mod progress;
#[cfg(test)]
mod integration_tests;

pub use executor::Executor;
pub use io::{TaskContext, TaskInputs, TaskOutputs};
pub use progress::ProgressHandle;
