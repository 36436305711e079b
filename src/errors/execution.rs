// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// A failure raised while running a node.
///
/// `chain` is the list of instance names from the root protocol down to the
/// node that failed, so `Display` reads `root > q > failing_task: <reason>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {kind}", .chain.join(" > "))]
pub struct ExecutionError {
    pub chain: Vec<String>,
    pub kind: ExecutionErrorKind,
}

impl ExecutionError {
    pub fn new(chain: Vec<String>, kind: ExecutionErrorKind) -> Self {
        Self { chain, kind }
    }

    /// Instance-name chain rendered as `root > q > task`.
    pub fn instance_path(&self) -> String {
        self.chain.join(" > ")
    }

    /// Instance name of the failing node itself.
    pub fn failing_node(&self) -> Option<&str> {
        self.chain.last().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionErrorKind {
    #[error("task failed: {0}")]
    TaskFailed(String),

    /// The task vetoed its own run in `check_before_run`.
    #[error("run stopped before start: {0}")]
    Stopped(String),

    #[error("output contract violated: {0}")]
    OutputContract(String),

    #[error("missing mandatory inputs: {}", .0.join(", "))]
    MissingInputs(Vec<String>),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("task panicked: {0}")]
    Panicked(String),

    /// The graph was inconsistent while running the node.
    #[error("graph error: {0}")]
    InvalidGraph(String),

    /// Recorded on a protocol whose children failed.
    #[error("child nodes failed: {}", .0.join(", "))]
    ChildFailed(Vec<String>),
}
