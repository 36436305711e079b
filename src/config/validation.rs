// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural validation of graph descriptions.
//!
//! Runs before anything is instantiated so that a broken description is
//! reported as a whole instead of failing on the first bad link. Each
//! protocol level is checked on its own and nested graphs are visited
//! recursively.
//!
//! # Validation Pipeline
//!
//! For every protocol level:
//!
//! 1. **Instance names**: every node name matches `^\w+$`
//! 2. **References**: links and ifaces only mention declared nodes
//! 3. **Single feed**: no input port is fed by two links, or by a link and an interface
//! 4. **Cycle detection**: DFS over links, run only when references resolved
//!
//! Port names and types are not checked here; they depend on the node types
//! and are checked by the builder while wiring.
//!
//! ## Cycle Detection Algorithm
//! DFS with a recursion stack (gray nodes). When a back edge is found the
//! cycle path is cut out of the current DFS path and reported.
//! O(V + E) per protocol level.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::GraphSnapshot;
use crate::errors::ValidationError;
use crate::graph::is_valid_instance_name;
use crate::observability::messages::validation::{
    CyclicLinksDetected, UnresolvedNodeReference, ValidationFailed,
};
use crate::observability::messages::StructuredLog;

/// Validates a graph description and every nested graph in it.
///
/// # Returns
///
/// * `Ok(())` - The description can be handed to the builder
/// * `Err(Vec<ValidationError>)` - Every problem found, across all levels
pub fn validate_graph_snapshot(snapshot: &GraphSnapshot) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    validate_level(snapshot, "", &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        ValidationFailed {
            error_count: errors.len(),
        }
        .log();
        Err(errors)
    }
}

fn validate_level(snapshot: &GraphSnapshot, protocol: &str, errors: &mut Vec<ValidationError>) {
    errors.extend(validate_instance_names(snapshot, protocol));

    let reference_errors = validate_references(snapshot, protocol);
    let references_ok = reference_errors.is_empty();
    errors.extend(reference_errors);
    errors.extend(validate_single_feed(snapshot, protocol));

    if references_ok {
        if let Err(cycle_errors) = validate_acyclic_links(snapshot, protocol) {
            errors.extend(cycle_errors);
        }
    }

    for (name, node) in &snapshot.nodes {
        if let Some(graph) = &node.graph {
            let nested = if protocol.is_empty() {
                name.clone()
            } else {
                format!("{}.{}", protocol, name)
            };
            validate_level(graph, &nested, errors);
        }
    }
}

fn validate_instance_names(snapshot: &GraphSnapshot, protocol: &str) -> Vec<ValidationError> {
    snapshot
        .nodes
        .keys()
        .filter(|name| !is_valid_instance_name(name))
        .map(|name| ValidationError::InvalidInstanceName {
            protocol: protocol.to_string(),
            name: name.clone(),
        })
        .collect()
}

/// Every node named by a link, interface or outerface must be declared.
fn validate_references(snapshot: &GraphSnapshot, protocol: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut check = |node: &str, referenced_by: String| {
        if !snapshot.nodes.contains_key(node) {
            UnresolvedNodeReference {
                protocol,
                referenced_by: &referenced_by,
                node,
            }
            .log();
            errors.push(ValidationError::UnresolvedNode {
                protocol: protocol.to_string(),
                referenced_by,
                node: node.to_string(),
            });
        }
    };

    for link in &snapshot.links {
        let label = format!(
            "link {}.{} -> {}.{}",
            link.from.node, link.from.port, link.to.node, link.to.port
        );
        check(&link.from.node, label.clone());
        check(&link.to.node, label);
    }
    for (name, iface) in &snapshot.interfaces {
        check(&iface.to.node, format!("interface '{}'", name));
    }
    for (name, oface) in &snapshot.outerfaces {
        check(&oface.from.node, format!("outerface '{}'", name));
    }
    errors
}

fn validate_single_feed(snapshot: &GraphSnapshot, protocol: &str) -> Vec<ValidationError> {
    let mut feeds: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for link in &snapshot.links {
        *feeds
            .entry((link.to.node.as_str(), link.to.port.as_str()))
            .or_default() += 1;
    }
    for iface in snapshot.interfaces.values() {
        *feeds
            .entry((iface.to.node.as_str(), iface.to.port.as_str()))
            .or_default() += 1;
    }

    feeds
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|((node, port), _)| ValidationError::DuplicateInput {
            protocol: protocol.to_string(),
            node: node.to_string(),
            port: port.to_string(),
        })
        .collect()
}

fn validate_acyclic_links(
    snapshot: &GraphSnapshot,
    protocol: &str,
) -> Result<(), Vec<ValidationError>> {
    let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();
    for name in snapshot.nodes.keys() {
        graph.insert(name.as_str(), Vec::new());
    }
    for link in &snapshot.links {
        if let Some(targets) = graph.get_mut(link.from.node.as_str()) {
            targets.push(link.to.node.as_str());
        }
    }

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    // Sorted roots keep the reported cycle stable
    let mut roots: Vec<&str> = graph.keys().copied().collect();
    roots.sort_unstable();

    for node in roots {
        if !visited.contains(node) {
            if let Some(cycle) =
                dfs_cycle_detection(node, &graph, &mut visited, &mut rec_stack, &mut path)
            {
                let names: Vec<&str> = cycle.iter().map(String::as_str).collect();
                CyclicLinksDetected {
                    protocol,
                    cycle: &names,
                }
                .log();
                return Err(vec![ValidationError::CyclicLinks {
                    protocol: protocol.to_string(),
                    cycle,
                }]);
            }
        }
    }
    Ok(())
}

/// DFS with an explicit recursion stack. Returns the cycle path, first node
/// repeated at the end, when a back edge is found.
fn dfs_cycle_detection<'a>(
    node: &'a str,
    graph: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    rec_stack: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(neighbors) = graph.get(node) {
        for &neighbor in neighbors {
            if !visited.contains(neighbor) {
                if let Some(cycle) = dfs_cycle_detection(neighbor, graph, visited, rec_stack, path)
                {
                    return Some(cycle);
                }
            } else if rec_stack.contains(neighbor) {
                let start = path.iter().position(|n| *n == neighbor).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
                cycle.push(neighbor.to_string());
                return Some(cycle);
            }
        }
    }

    rec_stack.remove(node);
    path.pop();
    None
}
