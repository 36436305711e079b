// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Event-driven executor over a [`ProcessGraph`].
//!
//! The executor is the single owner of the graph while a run is in progress.
//! Task bodies run concurrently on a [`JoinSet`] and only report back a
//! [`Completion`]; every status change, slot write and propagation happens
//! on the executor side, one completion at a time.
//!
//! ## Scheduling
//!
//! Work is driven by a FIFO of events:
//!
//! * `Start(node)` starts the node if it is ready. A task is spawned; a
//!   protocol becomes `Running`, queues `Start` for each child and then
//!   queues `Settle` for itself.
//! * `Settle(protocol)` derives the protocol status once none of its
//!   children is running: all `Success` gives `Success`, any `Error` gives
//!   `Error`, anything else gives `PartiallyRun`.
//!
//! The queue is drained before waiting on the next completion, so a
//! protocol is never settled while its own children are still being
//! started. A node becomes ready when its last upstream sibling succeeds,
//! which is the moment its `Start` is queued.
//!
//! ## Failure
//!
//! A failing task is marked `Error` and recorded; its siblings keep running
//! and its downstream nodes simply never become ready. Panics inside a task
//! are caught at the spawn boundary and reported as failures of that node.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;

use super::io::{check_outputs, collect_inputs, TaskContext, TaskOutputs};
use super::progress::ProgressHandle;
use crate::backends::InMemoryResourceCodec;
use crate::errors::{ExecutionError, ExecutionErrorKind, GraphError};
use crate::graph::{NodeId, NodeKind, NodeStatus, ProcessGraph};
use crate::observability::messages::engine::{
    NodeFailed, NodeStarted, NodeSucceeded, ProtocolSettled, RunCompleted, RunFailed, RunSkipped,
    RunStarted,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{PreRunCheck, ResourceCodec, Task};

/// Runs nodes of a [`ProcessGraph`].
///
/// # Examples
///
/// ```rust,no_run
/// use protograph::engine::{Executor, ProgressHandle};
/// use protograph::graph::ProcessGraph;
///
/// # async fn run(graph: &mut ProcessGraph) -> Result<(), protograph::errors::ExecutionError> {
/// let executor = Executor::in_memory();
/// let root = graph.root();
/// executor.run(graph, root, &ProgressHandle::tracing()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Executor {
    codec: Arc<dyn ResourceCodec>,
}

impl Executor {
    pub fn new(codec: Arc<dyn ResourceCodec>) -> Self {
        Self { codec }
    }

    /// Executor backed by an [`InMemoryResourceCodec`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryResourceCodec::new()))
    }

    pub fn codec(&self) -> &Arc<dyn ResourceCodec> {
        &self.codec
    }

    /// Runs `node` and everything it makes ready.
    ///
    /// A node that is not ready is left alone and the call returns `Ok(())`,
    /// which makes a second run of a finished graph a no-op. Running a
    /// single task inside a protocol also runs the siblings it feeds, but
    /// never settles a parent that is not itself running.
    ///
    /// Returns the first recorded failure once every started task has
    /// finished. Siblings of a failing node still run to completion.
    pub async fn run(
        &self,
        graph: &mut ProcessGraph,
        node: NodeId,
        progress: &ProgressHandle,
    ) -> Result<(), ExecutionError> {
        let path = graph.describe(node);
        let status = graph.status(node).map_err(|e| {
            ExecutionError::new(vec![node.to_string()], ExecutionErrorKind::InvalidGraph(e.to_string()))
        })?;
        if !graph.is_ready(node) {
            RunSkipped { node: &path, status }.log();
            return Ok(());
        }

        let started = Instant::now();
        RunStarted {
            node: &path,
            node_count: graph.descendants(node).len(),
        }
        .log();

        let mut dispatch = Dispatch {
            codec: Arc::clone(&self.codec),
            graph,
            progress,
            queue: VecDeque::from([Event::Start(node)]),
            in_flight: JoinSet::new(),
            started: HashMap::new(),
            errors: Vec::new(),
        };
        dispatch.drive().await;

        let Dispatch { graph, errors, .. } = dispatch;
        let failure_count = errors.len();
        match errors.into_iter().next() {
            Some(first) => {
                RunFailed {
                    node: &path,
                    error: &first,
                    failure_count,
                }
                .log();
                Err(first)
            }
            None => {
                RunCompleted {
                    node: &path,
                    status: graph.status(node).unwrap_or(status),
                    duration: started.elapsed(),
                }
                .log();
                Ok(())
            }
        }
    }
}

enum Event {
    Start(NodeId),
    Settle(NodeId),
}

/// What a spawned task hands back to the executor.
struct Completion {
    node: NodeId,
    outcome: Result<TaskOutputs, ExecutionErrorKind>,
}

struct Dispatch<'a> {
    codec: Arc<dyn ResourceCodec>,
    graph: &'a mut ProcessGraph,
    progress: &'a ProgressHandle,
    queue: VecDeque<Event>,
    in_flight: JoinSet<Completion>,
    started: HashMap<NodeId, Instant>,
    errors: Vec<ExecutionError>,
}

impl Dispatch<'_> {
    async fn drive(&mut self) {
        loop {
            while let Some(event) = self.queue.pop_front() {
                let (id, result) = match event {
                    Event::Start(id) => (id, self.start(id)),
                    Event::Settle(id) => (id, self.settle(id)),
                };
                if let Err(e) = result {
                    self.record_graph_error(id, e);
                }
            }

            match self.in_flight.join_next().await {
                Some(Ok(completion)) => {
                    let id = completion.node;
                    if let Err(e) = self.complete(completion) {
                        self.record_graph_error(id, e);
                    }
                }
                // The wrapper future catches panics of the task body, so
                // this only fires on cancellation.
                Some(Err(e)) => tracing::error!(error = %e, "task wrapper did not complete"),
                None => break,
            }
        }
    }

    fn start(&mut self, id: NodeId) -> Result<(), GraphError> {
        if !self.graph.is_ready(id) {
            return Ok(());
        }
        let task = match self.graph.node(id)?.kind() {
            NodeKind::Task(task) => Some(Arc::clone(task)),
            NodeKind::Protocol(_) => None,
        };
        match task {
            Some(task) => self.start_task(id, task),
            None => self.start_protocol(id),
        }
    }

    fn start_task(&mut self, id: NodeId, task: Arc<dyn Task>) -> Result<(), GraphError> {
        let path = self.graph.describe(id);
        self.graph.set_status(id, NodeStatus::Running)?;
        self.graph.set_error(id, None)?;
        self.started.insert(id, Instant::now());

        let progress = self.progress.for_node(path.clone());
        progress.start();
        NodeStarted {
            node: &path,
            kind: "task",
        }
        .log();

        let node = self.graph.node(id)?;
        let config = match node.config_spec().validate(node.config()) {
            Ok(config) => config,
            Err(e) => return self.fail(id, ExecutionErrorKind::InvalidConfig(e.to_string())),
        };
        let inputs = match collect_inputs(self.graph, id) {
            Ok(inputs) => inputs,
            Err(kind) => return self.fail(id, kind),
        };

        let ctx = TaskContext::new(config, progress, Arc::clone(&self.codec), path);
        self.in_flight.spawn(async move {
            let body = tokio::spawn(async move {
                if let PreRunCheck::Veto(reason) = task.check_before_run(&ctx, &inputs).await {
                    return Err(ExecutionErrorKind::Stopped(reason));
                }
                task.run(ctx, inputs)
                    .await
                    .map_err(|e| ExecutionErrorKind::TaskFailed(format!("{:#}", e)))
            });
            let outcome = match body.await {
                Ok(outcome) => outcome,
                Err(e) => Err(ExecutionErrorKind::Panicked(panic_message(e))),
            };
            Completion { node: id, outcome }
        });
        Ok(())
    }

    fn start_protocol(&mut self, id: NodeId) -> Result<(), GraphError> {
        let path = self.graph.describe(id);
        self.graph.set_status(id, NodeStatus::Running)?;
        self.graph.set_error(id, None)?;
        self.progress.for_node(path.clone()).start();
        NodeStarted {
            node: &path,
            kind: "protocol",
        }
        .log();

        for child in self.graph.children(id)? {
            self.queue.push_back(Event::Start(child));
        }
        self.queue.push_back(Event::Settle(id));
        Ok(())
    }

    fn complete(&mut self, completion: Completion) -> Result<(), GraphError> {
        let id = completion.node;
        let outputs = match completion.outcome {
            Ok(outputs) => outputs,
            Err(kind) => return self.fail(id, kind),
        };
        let values = match check_outputs(self.graph.node(id)?, outputs) {
            Ok(values) => values,
            Err(violation) => return self.fail(id, ExecutionErrorKind::OutputContract(violation)),
        };
        for (slot, value) in values {
            self.graph.slot_mut(slot).provide(value);
        }
        self.graph.set_status(id, NodeStatus::Success)?;

        let path = self.graph.describe(id);
        self.progress.for_node(path.clone()).stop("done");
        NodeSucceeded {
            node: &path,
            duration: self
                .started
                .remove(&id)
                .map(|at| at.elapsed())
                .unwrap_or_default(),
        }
        .log();

        self.finish_successful(id)
    }

    /// Feeds the outputs of a node that just succeeded downstream.
    fn finish_successful(&mut self, id: NodeId) -> Result<(), GraphError> {
        for fed in self.graph.propagate_outputs(id)? {
            self.queue.push_back(Event::Start(fed));
        }
        self.settle_parent(id)
    }

    fn settle_parent(&mut self, id: NodeId) -> Result<(), GraphError> {
        if let Some(parent) = self.graph.node(id)?.parent() {
            self.queue.push_back(Event::Settle(parent));
        }
        Ok(())
    }

    fn fail(&mut self, id: NodeId, kind: ExecutionErrorKind) -> Result<(), GraphError> {
        let path = self.graph.describe(id);
        NodeFailed {
            node: &path,
            error: &kind,
        }
        .log();
        self.progress.for_node(path).stop(&kind.to_string());
        self.started.remove(&id);

        let error = ExecutionError::new(self.graph.instance_chain(id), kind);
        self.graph.set_status(id, NodeStatus::Error)?;
        self.graph.set_error(id, Some(error.clone()))?;
        self.errors.push(error);
        self.settle_parent(id)
    }

    fn settle(&mut self, id: NodeId) -> Result<(), GraphError> {
        if self.graph.status(id)? != NodeStatus::Running {
            return Ok(());
        }
        let mut failed = Vec::new();
        let mut pending = Vec::new();
        for child in self.graph.children(id)? {
            let node = self.graph.node(child)?;
            match node.status() {
                NodeStatus::Running => return Ok(()),
                NodeStatus::Success => {}
                NodeStatus::Error => failed.push(node.instance_name().to_string()),
                NodeStatus::Draft | NodeStatus::PartiallyRun => {
                    pending.push(node.instance_name().to_string())
                }
            }
        }

        let path = self.graph.describe(id);
        let progress = self.progress.for_node(path.clone());
        if !failed.is_empty() {
            let error = ExecutionError::new(
                self.graph.instance_chain(id),
                ExecutionErrorKind::ChildFailed(failed.clone()),
            );
            self.graph.set_status(id, NodeStatus::Error)?;
            self.graph.set_error(id, Some(error))?;
            progress.stop("failed");
            ProtocolSettled {
                node: &path,
                status: NodeStatus::Error,
                pending: &failed,
            }
            .log();
            self.settle_parent(id)
        } else if pending.is_empty() {
            self.graph.set_status(id, NodeStatus::Success)?;
            progress.stop("done");
            ProtocolSettled {
                node: &path,
                status: NodeStatus::Success,
                pending: &pending,
            }
            .log();
            self.finish_successful(id)
        } else {
            self.graph.set_status(id, NodeStatus::PartiallyRun)?;
            progress.stop("partially run");
            ProtocolSettled {
                node: &path,
                status: NodeStatus::PartiallyRun,
                pending: &pending,
            }
            .log();
            self.settle_parent(id)
        }
    }

    fn record_graph_error(&mut self, id: NodeId, error: GraphError) {
        let kind = ExecutionErrorKind::InvalidGraph(error.to_string());
        if self.graph.contains(id) {
            if let Err(e) = self.fail(id, kind) {
                tracing::error!(error = %e, "could not record failure");
            }
        } else {
            self.errors.push(ExecutionError::new(vec![id.to_string()], kind));
        }
    }
}

fn panic_message(error: tokio::task::JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
