// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The computation graph as handed to the provider.
//!
//! # Type-State Pattern
//!
//! ```text
//! Graph<Loaded>     : nodes parsed, not yet checked.
//!       │  .validate()
//!       ▼
//! Graph<Validated>  : indices, arguments and acyclicity verified,
//!                     edges derived. Ready for partitioning.
//! ```
//!
//! Capability discovery only ever sees a `Graph<Validated>`.

use crate::{GraphError, Node, NodeIndex};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: graph has been loaded but not validated.
#[derive(Debug, Clone)]
pub struct Loaded;

/// Marker: graph has been validated and is ready for partitioning.
#[derive(Debug, Clone)]
pub struct Validated;

/// Sealed trait for graph states.
pub trait GraphState: fmt::Debug + Clone {}
impl GraphState for Loaded {}
impl GraphState for Validated {}

// ── Identity ───────────────────────────────────────────────────────

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Identity token of one graph instance.
///
/// Allocated when the graph is constructed and carried through
/// validation. Clones share the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphId(u64);

impl GraphId {
    fn next() -> Self {
        Self(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graph#{}", self.0)
    }
}

/// A data dependency between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    /// Producing node.
    pub src_node: NodeIndex,
    /// Output slot on the producer.
    pub src_slot: usize,
    /// Consuming node.
    pub dst_node: NodeIndex,
    /// Input slot on the consumer.
    pub dst_slot: usize,
}

// ── Graph ──────────────────────────────────────────────────────────

/// A computation graph. `S` encodes the validation state.
#[derive(Debug, Clone)]
pub struct Graph<S: GraphState = Loaded> {
    /// Human-readable graph name.
    pub name: String,
    /// Nodes in index order.
    pub nodes: Vec<Node>,
    /// Graph-level input value names.
    pub inputs: Vec<String>,
    /// Graph-level output value names.
    pub outputs: Vec<String>,
    id: GraphId,
    model_path: Option<PathBuf>,
    is_subgraph: bool,
    edges: Vec<Edge>,
    _state: std::marker::PhantomData<S>,
}

// ── Loaded state ───────────────────────────────────────────────────

impl Graph<Loaded> {
    /// Creates a new top-level graph in the `Loaded` state.
    pub fn new(name: impl Into<String>, nodes: Vec<Node>) -> Self {
        Self {
            name: name.into(),
            nodes,
            inputs: Vec::new(),
            outputs: Vec::new(),
            id: GraphId::next(),
            model_path: None,
            is_subgraph: false,
            edges: Vec::new(),
            _state: std::marker::PhantomData,
        }
    }

    /// Records the file this graph was loaded from.
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    /// Sets the graph-level inputs and outputs.
    pub fn with_io(mut self, inputs: Vec<String>, outputs: Vec<String>) -> Self {
        self.inputs = inputs;
        self.outputs = outputs;
        self
    }

    /// Marks this graph as nested inside another node (e.g. a loop body).
    pub fn as_subgraph(mut self) -> Self {
        self.is_subgraph = true;
        self
    }

    /// Validates the graph and transitions to the `Validated` state.
    ///
    /// # Checks
    /// - The graph is non-empty.
    /// - Node indices are consecutive starting from 0.
    /// - Node names are unique.
    /// - No value is produced by more than one node.
    /// - The graph is acyclic.
    pub fn validate(self) -> Result<Graph<Validated>, GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::InvalidGraph("graph contains no nodes".into()));
        }

        let mut seen_names = HashSet::new();
        for (i, node) in self.nodes.iter().enumerate() {
            if node.index.get() != i {
                return Err(GraphError::InvalidNode {
                    node: node.name.clone(),
                    detail: format!("expected index {i}, got {}", node.index),
                });
            }
            if !seen_names.insert(node.name.as_str()) {
                return Err(GraphError::InvalidNode {
                    node: node.name.clone(),
                    detail: "duplicate node name".into(),
                });
            }
        }

        // value name → (producer, output slot)
        let mut producers: HashMap<&str, (NodeIndex, usize)> = HashMap::new();
        for node in &self.nodes {
            for (slot, out) in node.outputs.iter().enumerate() {
                if out.is_empty() {
                    continue;
                }
                if producers.insert(out.as_str(), (node.index, slot)).is_some() {
                    return Err(GraphError::InvalidNode {
                        node: node.name.clone(),
                        detail: format!("value '{out}' is produced more than once"),
                    });
                }
            }
        }

        let mut edges = Vec::new();
        for node in &self.nodes {
            for (slot, input) in node.inputs.iter().enumerate() {
                if let Some(&(src_node, src_slot)) = producers.get(input.as_str()) {
                    edges.push(Edge {
                        src_node,
                        src_slot,
                        dst_node: node.index,
                        dst_slot: slot,
                    });
                }
            }
        }
        edges.sort();

        let order = kahn_order(self.nodes.len(), &edges);
        if order.len() != self.nodes.len() {
            return Err(GraphError::InvalidGraph(format!(
                "graph '{}' contains a cycle",
                self.name
            )));
        }

        Ok(Graph {
            name: self.name,
            nodes: self.nodes,
            inputs: self.inputs,
            outputs: self.outputs,
            id: self.id,
            model_path: self.model_path,
            is_subgraph: self.is_subgraph,
            edges,
            _state: std::marker::PhantomData,
        })
    }
}

// ── Validated state ────────────────────────────────────────────────

impl Graph<Validated> {
    /// Returns the total number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the edges, sorted by producer.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns an iterator over the nodes in index order.
    pub fn iter_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Returns a node by index.
    pub fn node(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index.get())
    }

    /// Returns the node producing `value`, if any node does.
    pub fn producer_of(&self, value: &str) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|n| n.outputs.iter().any(|o| o == value))
    }

    /// Returns node indices in topological order.
    ///
    /// Ties are broken by the lowest index, so the order is a pure
    /// function of the graph's structure.
    pub fn topological_order(&self) -> Vec<NodeIndex> {
        kahn_order(self.nodes.len(), &self.edges)
    }

    /// Returns a summary string describing the graph.
    pub fn summary(&self) -> String {
        let op_types: BTreeSet<&str> = self.nodes.iter().map(|n| n.op_type.as_str()).collect();
        format!(
            "Graph '{}': {} nodes, {} edges, {} op types{}",
            self.name,
            self.num_nodes(),
            self.edges.len(),
            op_types.len(),
            if self.is_subgraph { " (subgraph)" } else { "" },
        )
    }
}

// ── Shared implementations ─────────────────────────────────────────

impl<S: GraphState> Graph<S> {
    /// Returns this instance's identity token.
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Returns `true` if this graph is nested inside another node.
    pub fn is_subgraph(&self) -> bool {
        self.is_subgraph
    }

    /// Returns the file this graph was loaded from, if known.
    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }
}

impl<S: GraphState> fmt::Display for Graph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Graph '{}' ({} nodes):", self.name, self.nodes.len())?;
        for node in &self.nodes {
            writeln!(f, "  {}", node.summary())?;
        }
        Ok(())
    }
}

/// Kahn's algorithm with a min-heap frontier. Returns fewer than
/// `num_nodes` indices when the edges contain a cycle.
fn kahn_order(num_nodes: usize, edges: &[Edge]) -> Vec<NodeIndex> {
    let mut in_degree = vec![0usize; num_nodes];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); num_nodes];
    for edge in edges {
        in_degree[edge.dst_node.get()] += 1;
        successors[edge.src_node.get()].push(edge.dst_node.get());
    }

    let mut frontier: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d == 0)
        .map(|(i, _)| i)
        .collect();

    let mut order = Vec::with_capacity(num_nodes);
    while let Some(current) = frontier.pop_first() {
        order.push(NodeIndex(current));
        for &next in &successors[current] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                frontier.insert(next);
            }
        }
    }
    order
}
