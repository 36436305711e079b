// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::json;

use crate::backends::stub::{fixtures, read_number, Fixtures, RecordingProgress};
use crate::builder::GraphBuilder;
use crate::config::{ConfigValues, GraphSnapshot, NodeSnapshot, PortSnapshot};
use crate::engine::{Executor, ProgressHandle};
use crate::errors::ExecutionErrorKind;
use crate::graph::{NodeId, NodeStatus, PortDirection, ProcessGraph, Resource};
use crate::observability::init_test_tracing;

fn build(fx: &Fixtures, snapshot: &GraphSnapshot) -> ProcessGraph {
    init_test_tracing();
    GraphBuilder::create_new(&fx.registry)
        .materialize("p", snapshot)
        .expect("graph builds")
}

fn source(value: i64, delay_ms: i64) -> NodeSnapshot {
    NodeSnapshot::new("Source").with_config(
        ConfigValues::default()
            .with("value", json!(value))
            .with("delay_ms", json!(delay_ms)),
    )
}

fn with_config(type_id: &str, name: &str, value: serde_json::Value) -> NodeSnapshot {
    NodeSnapshot::new(type_id).with_config(ConfigValues::default().with(name, value))
}

fn dynamic_ports(prefix: &str, count: usize) -> Option<Vec<PortSnapshot>> {
    Some(
        (0..count)
            .map(|i| PortSnapshot {
                name: format!("{}_{}", prefix, i),
                types: vec!["Number".into()],
                optional: true,
                subclass: false,
            })
            .collect(),
    )
}

fn status(graph: &ProcessGraph, path: &str) -> NodeStatus {
    graph.status(graph.find(path).unwrap()).unwrap()
}

async fn output_number(executor: &Executor, graph: &ProcessGraph, path: &str, port: &str) -> i64 {
    let node = graph.find(path).unwrap();
    let value = graph
        .port_resource(node, PortDirection::Output, port)
        .unwrap()
        .cloned()
        .expect("output written");
    read_number(executor.codec().as_ref(), &value).await
}

fn chain(length: usize) -> GraphSnapshot {
    let mut snapshot = GraphSnapshot::default().node("n0", source(1, 0));
    for i in 1..length {
        let from = format!("n{}", i - 1);
        let to = format!("n{}", i);
        snapshot = snapshot
            .node(to.clone(), NodeSnapshot::new("Step"))
            .link((from.as_str(), "out"), (to.as_str(), "in"));
    }
    snapshot
}

fn nested() -> GraphSnapshot {
    GraphSnapshot::default()
        .node("a", source(4, 0))
        .node(
            "inner",
            NodeSnapshot::new("Protocol").with_graph(
                GraphSnapshot::default()
                    .node("x", NodeSnapshot::new("Step"))
                    .node("y", NodeSnapshot::new("Step"))
                    .link(("x", "out"), ("y", "in"))
                    .interface("in", ("x", "in"))
                    .outerface("out", ("y", "out")),
            ),
        )
        .node("c", NodeSnapshot::new("Step"))
        .link(("a", "out"), ("inner", "in"))
        .link(("inner", "out"), ("c", "in"))
}

fn all_ports_empty(graph: &ProcessGraph) -> bool {
    graph.nodes().all(|node| {
        [PortDirection::Input, PortDirection::Output]
            .into_iter()
            .all(|direction| {
                node.ports(direction).iter().all(|port| {
                    let slot = graph.port_slot(node.id(), direction, port.name()).unwrap();
                    !slot.is_provided() && slot.is_empty()
                })
            })
    })
}

/// Engine scenarios over graphs built from descriptions
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sequential_chain_runs_in_order() {
        let fx = fixtures();
        let mut graph = build(&fx, &chain(3));
        let executor = Executor::in_memory();
        let root = graph.root();

        executor.run(&mut graph, root, &ProgressHandle::tracing()).await.unwrap();

        assert_eq!(graph.status(root).unwrap(), NodeStatus::Success);
        for name in ["n0", "n1", "n2"] {
            assert_eq!(status(&graph, name), NodeStatus::Success);
        }
        assert_eq!(output_number(&executor, &graph, "n2", "out").await, 3);

        let log = &fx.log;
        let end_n0 = log.position("end p > n0").unwrap();
        let start_n1 = log.position("start p > n1").unwrap();
        let end_n1 = log.position("end p > n1").unwrap();
        let start_n2 = log.position("start p > n2").unwrap();
        assert!(end_n0 < start_n1);
        assert!(end_n1 < start_n2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_fan_in_waits_for_all_branches_running_concurrently() {
        let fx = fixtures();
        let snapshot = GraphSnapshot::default()
            .node("a", source(2, 100))
            .node("b", source(3, 100))
            .node("join", NodeSnapshot::new("Join"))
            .link(("a", "out"), ("join", "a"))
            .link(("b", "out"), ("join", "b"));
        let mut graph = build(&fx, &snapshot);
        let executor = Executor::in_memory();
        let root = graph.root();

        executor.run(&mut graph, root, &ProgressHandle::tracing()).await.unwrap();

        assert_eq!(output_number(&executor, &graph, "join", "out").await, 5);
        let log = &fx.log;
        let starts = [
            log.position("start p > a").unwrap(),
            log.position("start p > b").unwrap(),
        ];
        let ends = [
            log.position("end p > a").unwrap(),
            log.position("end p > b").unwrap(),
        ];
        let join = log.position("start p > join").unwrap();
        assert!(starts.iter().max() < ends.iter().min(), "branches overlap: {:?}", log.events());
        assert!(ends.iter().all(|end| *end < join));
    }

    #[test]
    fn test_table_to_image_link_fails_build_naming_both_types() {
        let fx = fixtures();
        let snapshot = GraphSnapshot::default()
            .node("tables", NodeSnapshot::new("TableSource"))
            .node("viewer", NodeSnapshot::new("ImageViewer"))
            .link(("tables", "out"), ("viewer", "in"));

        let err = GraphBuilder::create_new(&fx.registry)
            .materialize("p", &snapshot)
            .err()
            .expect("build fails");

        let message = err.to_string();
        assert!(message.contains("Table") && message.contains("Image"), "{}", message);
    }

    #[tokio::test]
    async fn test_unconnected_optional_input_resolves_to_none() {
        let fx = fixtures();
        let snapshot = GraphSnapshot::default()
            .node("a", source(5, 0))
            .node("join", NodeSnapshot::new("OptionalJoin"))
            .link(("a", "out"), ("join", "a"));
        let mut graph = build(&fx, &snapshot);
        let executor = Executor::in_memory();
        let root = graph.root();

        executor.run(&mut graph, root, &ProgressHandle::tracing()).await.unwrap();

        assert_eq!(output_number(&executor, &graph, "join", "out").await, 5);
        assert_eq!(fx.log.count("no b p > join"), 1);
    }

    #[tokio::test]
    async fn test_nested_protocol_passes_values_through_ifaces() {
        let fx = fixtures();
        let mut graph = build(&fx, &nested());
        let executor = Executor::in_memory();
        let root = graph.root();

        executor.run(&mut graph, root, &ProgressHandle::tracing()).await.unwrap();

        assert_eq!(status(&graph, "inner"), NodeStatus::Success);
        assert_eq!(status(&graph, "inner.y"), NodeStatus::Success);
        assert_eq!(output_number(&executor, &graph, "inner", "out").await, 6);
        assert_eq!(output_number(&executor, &graph, "c", "out").await, 7);
        assert!(fx.log.position("start p > inner > x").is_some());
    }

    #[tokio::test]
    async fn test_failure_is_tagged_with_instance_chain_and_isolated() {
        let fx = fixtures();
        let snapshot = GraphSnapshot::default()
            .node("sibling", source(1, 50))
            .node(
                "q",
                NodeSnapshot::new("Protocol").with_graph(
                    GraphSnapshot::default()
                        .node("failing_task", with_config("Fail", "delay_ms", json!(10)))
                        .node("ok", source(1, 50))
                        .node("after", NodeSnapshot::new("Step"))
                        .link(("failing_task", "out"), ("after", "in")),
                ),
            );
        let mut graph = build(&fx, &snapshot);
        let executor = Executor::in_memory();
        let root = graph.root();

        let err = executor
            .run(&mut graph, root, &ProgressHandle::tracing())
            .await
            .unwrap_err();

        assert_eq!(err.instance_path(), "p > q > failing_task");
        assert!(
            err.to_string().starts_with("p > q > failing_task: task failed:"),
            "{}",
            err
        );
        assert!(err.to_string().contains("boom"));
        assert_eq!(status(&graph, "sibling"), NodeStatus::Success);
        assert_eq!(status(&graph, "q.ok"), NodeStatus::Success);
        assert_eq!(status(&graph, "q.after"), NodeStatus::Draft);
        assert_eq!(status(&graph, "q"), NodeStatus::Error);
        assert_eq!(graph.status(root).unwrap(), NodeStatus::Error);

        let q = graph.find("q").unwrap();
        assert_eq!(
            graph.node(q).unwrap().error().map(|e| e.kind.clone()),
            Some(ExecutionErrorKind::ChildFailed(vec!["failing_task".into()]))
        );
        let failing = graph.find("q.failing_task").unwrap();
        assert_eq!(graph.node(failing).unwrap().error(), Some(&err));
    }

    #[tokio::test]
    async fn test_second_run_of_finished_graph_is_a_no_op() {
        let fx = fixtures();
        let mut graph = build(&fx, &chain(2));
        let executor = Executor::in_memory();
        let root = graph.root();
        let n1 = graph.find("n1").unwrap();

        executor.run(&mut graph, root, &ProgressHandle::tracing()).await.unwrap();
        let first = graph.port_resource(n1, PortDirection::Output, "out").unwrap().cloned();
        executor.run(&mut graph, root, &ProgressHandle::tracing()).await.unwrap();
        executor.run(&mut graph, n1, &ProgressHandle::tracing()).await.unwrap();

        assert_eq!(
            graph.port_resource(n1, PortDirection::Output, "out").unwrap().cloned(),
            first
        );
        assert_eq!(fx.log.count("start p > n0"), 1);
        assert_eq!(fx.log.count("start p > n1"), 1);
    }

    #[tokio::test]
    async fn test_reset_root_clears_everything_and_allows_rerun() {
        let fx = fixtures();
        let mut graph = build(&fx, &nested());
        let executor = Executor::in_memory();
        let root = graph.root();
        executor.run(&mut graph, root, &ProgressHandle::tracing()).await.unwrap();
        let c = graph.find("c").unwrap();
        let first = graph.port_resource(c, PortDirection::Output, "out").unwrap().cloned();

        graph.reset(root).unwrap();

        assert!(graph.nodes().all(|n| n.status() == NodeStatus::Draft));
        assert!(graph.nodes().all(|n| n.error().is_none()));
        assert!(all_ports_empty(&graph));

        executor.run(&mut graph, root, &ProgressHandle::tracing()).await.unwrap();
        assert_eq!(output_number(&executor, &graph, "c", "out").await, 7);
        assert_ne!(graph.port_resource(c, PortDirection::Output, "out").unwrap().cloned(), first);
        assert_eq!(fx.log.count("start p > inner > x"), 2);
    }

    #[tokio::test]
    async fn test_reset_behind_outerface_reruns_consumers_in_parent() {
        let fx = fixtures();
        let mut graph = build(&fx, &nested());
        let executor = Executor::in_memory();
        let root = graph.root();
        executor.run(&mut graph, root, &ProgressHandle::tracing()).await.unwrap();
        let c = graph.find("c").unwrap();
        let c_out_before = graph.port_resource(c, PortDirection::Output, "out").unwrap().cloned();

        graph.reset(graph.find("inner.y").unwrap()).unwrap();
        assert_eq!(status(&graph, "c"), NodeStatus::Draft);
        assert_eq!(status(&graph, "inner"), NodeStatus::PartiallyRun);
        assert_eq!(status(&graph, "inner.x"), NodeStatus::Success);

        executor.run(&mut graph, root, &ProgressHandle::tracing()).await.unwrap();

        assert_eq!(graph.status(root).unwrap(), NodeStatus::Success);
        assert_eq!(fx.log.count("start p > inner > x"), 1);
        assert_eq!(fx.log.count("start p > inner > y"), 2);
        assert_eq!(fx.log.count("start p > c"), 2);
        let inner = graph.find("inner").unwrap();
        assert_eq!(
            graph.port_resource(c, PortDirection::Input, "in").unwrap(),
            graph.port_resource(inner, PortDirection::Output, "out").unwrap()
        );
        assert_ne!(
            graph.port_resource(c, PortDirection::Output, "out").unwrap().cloned(),
            c_out_before
        );
        assert_eq!(output_number(&executor, &graph, "c", "out").await, 7);
    }

    #[tokio::test]
    async fn test_blocked_child_leaves_protocol_partially_run_until_resumed() {
        let fx = fixtures();
        let snapshot = GraphSnapshot::default()
            .node("a", source(1, 0))
            .node("blocked", NodeSnapshot::new("Step"));
        let mut graph = build(&fx, &snapshot);
        let executor = Executor::in_memory();
        let root = graph.root();

        executor.run(&mut graph, root, &ProgressHandle::tracing()).await.unwrap();
        assert_eq!(graph.status(root).unwrap(), NodeStatus::PartiallyRun);
        assert_eq!(status(&graph, "a"), NodeStatus::Success);
        assert_eq!(status(&graph, "blocked"), NodeStatus::Draft);

        let value = executor
            .codec()
            .serialize(Resource::new(fx.number.clone(), json!(10)))
            .await
            .unwrap();
        let blocked = graph.find("blocked").unwrap();
        graph.set_input(blocked, "in", Some(value)).unwrap();
        executor.run(&mut graph, root, &ProgressHandle::tracing()).await.unwrap();

        assert_eq!(graph.status(root).unwrap(), NodeStatus::Success);
        assert_eq!(output_number(&executor, &graph, "blocked", "out").await, 11);
        assert_eq!(fx.log.count("start p > a"), 1);
    }

    #[tokio::test]
    async fn test_single_node_run_cascades_downstream_only() {
        let fx = fixtures();
        let snapshot = chain(3).node("other", source(1, 0));
        let mut graph = build(&fx, &snapshot);
        let executor = Executor::in_memory();
        let root = graph.root();
        let n0 = graph.find("n0").unwrap();

        executor.run(&mut graph, n0, &ProgressHandle::tracing()).await.unwrap();

        assert_eq!(status(&graph, "n2"), NodeStatus::Success);
        assert_eq!(status(&graph, "other"), NodeStatus::Draft);
        assert_eq!(graph.status(root).unwrap(), NodeStatus::Draft);
    }

    #[tokio::test]
    async fn test_reset_of_middle_node_reruns_only_downstream() {
        let fx = fixtures();
        let mut graph = build(&fx, &chain(3));
        let executor = Executor::in_memory();
        let root = graph.root();
        executor.run(&mut graph, root, &ProgressHandle::tracing()).await.unwrap();

        let n1 = graph.find("n1").unwrap();
        graph.reset(n1).unwrap();
        assert_eq!(graph.status(root).unwrap(), NodeStatus::PartiallyRun);
        assert_eq!(status(&graph, "n0"), NodeStatus::Success);
        assert_eq!(status(&graph, "n2"), NodeStatus::Draft);
        assert!(graph.is_ready(n1));

        executor.run(&mut graph, root, &ProgressHandle::tracing()).await.unwrap();
        assert_eq!(graph.status(root).unwrap(), NodeStatus::Success);
        assert_eq!(fx.log.count("start p > n0"), 1);
        assert_eq!(fx.log.count("start p > n1"), 2);
        assert_eq!(fx.log.count("start p > n2"), 2);
    }

    #[tokio::test]
    async fn test_dynamic_inputs_are_aggregated_in_port_order() {
        let fx = fixtures();
        let merge = NodeSnapshot {
            inputs: dynamic_ports("source", 3),
            ..NodeSnapshot::new("Merge")
        };
        let snapshot = GraphSnapshot::default()
            .node("a", source(1, 0))
            .node("b", source(2, 0))
            .node("c", source(3, 0))
            .node("merge", merge)
            .link(("a", "out"), ("merge", "source_0"))
            .link(("b", "out"), ("merge", "source_1"))
            .link(("c", "out"), ("merge", "source_2"));
        let mut graph = build(&fx, &snapshot);
        let executor = Executor::in_memory();
        let root = graph.root();

        executor.run(&mut graph, root, &ProgressHandle::tracing()).await.unwrap();

        assert_eq!(output_number(&executor, &graph, "merge", "out").await, 6);
        assert_eq!(fx.log.count("merged 3 p > merge"), 1);
    }

    #[tokio::test]
    async fn test_dynamic_outputs_are_distributed_positionally() {
        let fx = fixtures();
        let split = NodeSnapshot {
            outputs: dynamic_ports("target", 3),
            ..with_config("Split", "count", json!(2))
        };
        let snapshot = GraphSnapshot::default()
            .node("split", split)
            .node("step", NodeSnapshot::new("Step"))
            .link(("split", "target_1"), ("step", "in"));
        let mut graph = build(&fx, &snapshot);
        let executor = Executor::in_memory();
        let root = graph.root();

        executor.run(&mut graph, root, &ProgressHandle::tracing()).await.unwrap();

        assert_eq!(output_number(&executor, &graph, "split", "target_0").await, 0);
        assert_eq!(output_number(&executor, &graph, "step", "out").await, 2);
        let split = graph.find("split").unwrap();
        let last = graph.port_slot(split, PortDirection::Output, "target_2").unwrap();
        assert!(last.is_provided());
        assert!(last.resource().is_none());
    }

    #[tokio::test]
    async fn test_dynamic_output_overflow_violates_contract() {
        let fx = fixtures();
        let split = NodeSnapshot {
            outputs: dynamic_ports("target", 2),
            ..with_config("Split", "count", json!(3))
        };
        let mut graph = build(&fx, &GraphSnapshot::default().node("split", split));
        let executor = Executor::in_memory();
        let root = graph.root();

        let err = executor
            .run(&mut graph, root, &ProgressHandle::tracing())
            .await
            .unwrap_err();

        assert!(matches!(err.kind, ExecutionErrorKind::OutputContract(ref m) if m.contains("3 resources for 2")));
        assert_eq!(status(&graph, "split"), NodeStatus::Error);
    }

    #[tokio::test]
    async fn test_output_contract_violations_fail_the_node() {
        let fx = fixtures();
        let snapshot = GraphSnapshot::default()
            .node("missing", with_config("BadOutput", "mode", json!("missing")))
            .node("wrong", with_config("BadOutput", "mode", json!("wrong_type")))
            .node("after", NodeSnapshot::new("Step"))
            .link(("missing", "out"), ("after", "in"));
        let mut graph = build(&fx, &snapshot);
        let executor = Executor::in_memory();
        let root = graph.root();

        assert!(executor
            .run(&mut graph, root, &ProgressHandle::tracing())
            .await
            .is_err());

        let kind_of = |path: &str| {
            let id = graph.find(path).unwrap();
            graph.node(id).unwrap().error().map(|e| e.kind.clone())
        };
        assert!(matches!(kind_of("missing"), Some(ExecutionErrorKind::OutputContract(m)) if m.contains("'out'")));
        assert!(matches!(kind_of("wrong"), Some(ExecutionErrorKind::OutputContract(m)) if m.contains("'Table'")));
        assert_eq!(status(&graph, "after"), NodeStatus::Draft);
        let missing = graph.find("missing").unwrap();
        assert_eq!(graph.port_resource(missing, PortDirection::Output, "out").unwrap(), None);
    }

    #[tokio::test]
    async fn test_veto_stops_before_running() {
        let fx = fixtures();
        let mut graph = build(&fx, &GraphSnapshot::default().node("veto", NodeSnapshot::new("Veto")));
        let executor = Executor::in_memory();
        let root = graph.root();

        let err = executor
            .run(&mut graph, root, &ProgressHandle::tracing())
            .await
            .unwrap_err();

        assert_eq!(err.kind, ExecutionErrorKind::Stopped("inputs rejected".into()));
        assert_eq!(fx.log.count("start p > veto"), 0);
    }

    #[tokio::test]
    async fn test_panicking_task_is_reported_as_failure() {
        let fx = fixtures();
        let snapshot = GraphSnapshot::default()
            .node("panic", NodeSnapshot::new("Panic"))
            .node("fine", source(1, 0));
        let mut graph = build(&fx, &snapshot);
        let executor = Executor::in_memory();
        let root = graph.root();

        let err = executor
            .run(&mut graph, root, &ProgressHandle::tracing())
            .await
            .unwrap_err();

        assert_eq!(err.kind, ExecutionErrorKind::Panicked("stub panic".into()));
        assert_eq!(err.instance_path(), "p > panic");
        assert_eq!(status(&graph, "fine"), NodeStatus::Success);
    }

    #[tokio::test]
    async fn test_required_input_provided_empty_is_missing() {
        let fx = fixtures();
        let mut graph = build(&fx, &GraphSnapshot::default().node("step", NodeSnapshot::new("Step")));
        let executor = Executor::in_memory();
        let step = graph.find("step").unwrap();
        graph.set_input(step, "in", None).unwrap();

        let err = executor
            .run(&mut graph, step, &ProgressHandle::tracing())
            .await
            .unwrap_err();

        assert_eq!(err.kind, ExecutionErrorKind::MissingInputs(vec!["in".into()]));
    }

    #[tokio::test]
    async fn test_invalid_config_fails_at_start() {
        let fx = fixtures();
        let mut graph = build(&fx, &GraphSnapshot::default().node("a", source(1, 0)));
        let executor = Executor::in_memory();
        let a = graph.find("a").unwrap();
        graph
            .set_config(a, ConfigValues::default().with("value", json!("many")))
            .unwrap();

        let err = executor
            .run(&mut graph, a, &ProgressHandle::tracing())
            .await
            .unwrap_err();

        assert!(matches!(err.kind, ExecutionErrorKind::InvalidConfig(_)));
        assert_eq!(fx.log.count("start p > a"), 0);
    }

    #[tokio::test]
    async fn test_unknown_node_is_an_error() {
        let mut graph = ProcessGraph::new("p").unwrap();
        let err = Executor::in_memory()
            .run(&mut graph, NodeId::new(), &ProgressHandle::tracing())
            .await
            .unwrap_err();

        assert!(matches!(err.kind, ExecutionErrorKind::InvalidGraph(_)));
    }

    #[tokio::test]
    async fn test_progress_is_reported_per_node() {
        let fx = fixtures();
        let mut graph = build(&fx, &chain(2));
        let executor = Executor::in_memory();
        let root = graph.root();
        let sink = Arc::new(RecordingProgress::default());

        executor
            .run(&mut graph, root, &ProgressHandle::new(sink.clone()))
            .await
            .unwrap();

        let events = sink.events();
        for expected in [
            "start p",
            "start p > n0",
            "stop p > n0 done",
            "value p > n1 1 stepped",
            "stop p done",
        ] {
            assert!(events.iter().any(|e| e == expected), "{} missing in {:?}", expected, events);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_reset_then_rerun_restores_success(length in 1usize..6, reset_at in 0usize..6) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async {
                let fx = fixtures();
                let mut graph = build(&fx, &chain(length));
                let executor = Executor::in_memory();
                let root = graph.root();
                executor.run(&mut graph, root, &ProgressHandle::tracing()).await.unwrap();

                let target = graph.find(&format!("n{}", reset_at % length)).unwrap();
                graph.reset(target).unwrap();
                for i in 0..length {
                    let expected = if i < reset_at % length { NodeStatus::Success } else { NodeStatus::Draft };
                    prop_assert_eq!(status(&graph, &format!("n{}", i)), expected);
                }

                executor.run(&mut graph, root, &ProgressHandle::tracing()).await.unwrap();
                prop_assert_eq!(graph.status(root).unwrap(), NodeStatus::Success);
                prop_assert_eq!(output_number(&executor, &graph, &format!("n{}", length - 1), "out").await, length as i64);

                graph.reset(root).unwrap();
                prop_assert!(graph.nodes().all(|n| n.status() == NodeStatus::Draft));
                prop_assert!(all_ports_empty(&graph));
                Ok(())
            })?;
        }
    }
}
