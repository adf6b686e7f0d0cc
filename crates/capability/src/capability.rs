// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Candidate partitions.
//!
//! A [`Capability`] names an ordered set of graph nodes that one backend
//! compiler is willing to execute. Partitions backed by a compiled unit
//! carry a [`MetaDef`]; the host copies its attributes onto the fused node
//! it creates, which is how the `index` recorded here reaches compile time.

use graph_ir::{AttributeValue, Graph, Node, NodeIndex};
use graph_ir::graph::Validated;
use std::collections::{BTreeMap, HashSet};

/// Fused-node attribute: position of the unit in its compiler's result list.
pub const INDEX_ATTR: &str = "index";

/// Fused-node attribute: rank of the compiler that produced the unit.
pub const COMPILER_RANK_ATTR: &str = "compiler_rank";

/// Metadata describing the fused node a partition collapses into.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MetaDef {
    /// Fused node name and op type.
    pub name: String,
    /// Fused node domain.
    pub domain: String,
    /// Values consumed from outside the partition.
    pub inputs: Vec<String>,
    /// Values produced inside the partition and needed outside it.
    pub outputs: Vec<String>,
    /// Attributes copied onto the fused node.
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl MetaDef {
    /// Derives the boundary inputs and outputs of `nodes` within `graph`.
    ///
    /// An output is kept if a node outside the partition consumes it or it
    /// is a graph output. Order follows node order, then argument order.
    pub fn for_nodes(
        name: impl Into<String>,
        domain: impl Into<String>,
        graph: &Graph<Validated>,
        nodes: &[NodeIndex],
    ) -> Self {
        let members: HashSet<NodeIndex> = nodes.iter().copied().collect();
        let produced_inside: HashSet<&str> = nodes
            .iter()
            .filter_map(|&i| graph.node(i))
            .flat_map(|n| n.outputs.iter().map(String::as_str))
            .collect();
        let consumed_outside: HashSet<&str> = graph
            .iter_nodes()
            .filter(|n| !members.contains(&n.index))
            .flat_map(|n| n.inputs.iter().map(String::as_str))
            .chain(graph.outputs.iter().map(String::as_str))
            .collect();

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        let mut seen_inputs = HashSet::new();
        for node in nodes.iter().filter_map(|&i| graph.node(i)) {
            for input in &node.inputs {
                if !input.is_empty()
                    && !produced_inside.contains(input.as_str())
                    && seen_inputs.insert(input.as_str())
                {
                    inputs.push(input.clone());
                }
            }
            for output in &node.outputs {
                if consumed_outside.contains(output.as_str()) {
                    outputs.push(output.clone());
                }
            }
        }

        Self {
            name: name.into(),
            domain: domain.into(),
            inputs,
            outputs,
            attributes: BTreeMap::new(),
        }
    }

    /// Adds or replaces an attribute.
    pub fn with_attribute(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }
}

/// An ordered node set, optionally collapsed into one fused node.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IndexedSubGraph {
    pub nodes: Vec<NodeIndex>,
    #[serde(default)]
    pub meta_def: Option<MetaDef>,
}

/// A candidate (or accepted) partition owned by one compiler.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Capability {
    /// Unique identifier, `"<compiler>:<position>"`.
    pub id: String,
    /// Rank of the owning compiler (0 = highest priority).
    pub compiler_rank: usize,
    /// The claimed nodes.
    pub sub_graph: IndexedSubGraph,
}

impl Capability {
    /// A plain node claim with no fused-node metadata.
    pub fn new(id: impl Into<String>, compiler_rank: usize, nodes: Vec<NodeIndex>) -> Self {
        Self {
            id: id.into(),
            compiler_rank,
            sub_graph: IndexedSubGraph {
                nodes,
                meta_def: None,
            },
        }
    }

    /// Attaches fused-node metadata.
    pub fn with_meta_def(mut self, meta_def: MetaDef) -> Self {
        self.sub_graph.meta_def = Some(meta_def);
        self
    }

    /// The claimed node indices, in order.
    pub fn nodes(&self) -> &[NodeIndex] {
        &self.sub_graph.nodes
    }

    /// Number of claimed nodes.
    pub fn num_nodes(&self) -> usize {
        self.sub_graph.nodes.len()
    }

    /// Returns `true` if this capability claims exactly one node.
    pub fn is_single_node(&self) -> bool {
        self.sub_graph.nodes.len() == 1
    }

    /// The `index` attribute recorded on the metadata, if any.
    pub fn index(&self) -> Option<usize> {
        self.sub_graph
            .meta_def
            .as_ref()
            .and_then(|m| m.attributes.get(INDEX_ATTR))
            .and_then(AttributeValue::as_int)
            .and_then(|i| usize::try_from(i).ok())
    }

    /// Builds the fused node a host would create for this capability.
    ///
    /// Returns `None` for plain node claims: those run through the host's
    /// own kernels and never reach compile.
    pub fn to_fused_node(&self, fused_index: usize) -> Option<Node> {
        let meta = self.sub_graph.meta_def.as_ref()?;
        let mut node = Node::new(fused_index, meta.name.clone(), meta.name.clone())
            .with_domain(meta.domain.clone())
            .with_args(meta.inputs.iter().cloned(), meta.outputs.iter().cloned());
        node.attributes = meta.attributes.clone();
        Some(node)
    }

    /// Returns a one-line summary.
    pub fn summary(&self) -> String {
        let mut nodes: Vec<usize> = self.nodes().iter().map(|n| n.get()).collect();
        nodes.sort_unstable();
        match self.index() {
            Some(index) => format!(
                "{} (rank {}, unit {}): nodes {:?}",
                self.id, self.compiler_rank, index, nodes
            ),
            None => format!("{} (rank {}): nodes {:?}", self.id, self.compiler_rank, nodes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// x → a → b → c → y, with `b`'s output also a graph output.
    fn chain_graph() -> Graph<Validated> {
        let nodes = vec![
            Node::new(0, "a", "Conv").with_args(["x", "w"], ["a_out"]),
            Node::new(1, "b", "Relu").with_args(["a_out"], ["b_out"]),
            Node::new(2, "c", "Pool").with_args(["b_out"], ["y"]),
        ];
        Graph::new("chain", nodes)
            .with_io(vec!["x".into()], vec!["y".into(), "b_out".into()])
            .validate()
            .unwrap()
    }

    #[test]
    fn test_meta_def_boundary() {
        let graph = chain_graph();
        let meta = MetaDef::for_nodes("fused", "test", &graph, &[NodeIndex(0), NodeIndex(1)]);
        assert_eq!(meta.inputs, vec!["x".to_string(), "w".to_string()]);
        assert_eq!(meta.outputs, vec!["b_out".to_string()]);
    }

    #[test]
    fn test_meta_def_keeps_graph_outputs() {
        let graph = chain_graph();
        let meta = MetaDef::for_nodes(
            "all",
            "test",
            &graph,
            &[NodeIndex(0), NodeIndex(1), NodeIndex(2)],
        );
        assert_eq!(meta.inputs, vec!["x".to_string(), "w".to_string()]);
        assert_eq!(meta.outputs, vec!["b_out".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_index_attribute() {
        let plain = Capability::new("xc:0", 0, vec![NodeIndex(3)]);
        assert_eq!(plain.index(), None);
        assert!(plain.is_single_node());

        let meta = MetaDef::for_nodes("fused", "test", &chain_graph(), &[NodeIndex(0)])
            .with_attribute(INDEX_ATTR, 4i64);
        let fused = Capability::new("xc:1", 0, vec![NodeIndex(0)]).with_meta_def(meta);
        assert_eq!(fused.index(), Some(4));
    }

    #[test]
    fn test_negative_index_is_ignored() {
        let meta = MetaDef::for_nodes("fused", "test", &chain_graph(), &[NodeIndex(0)])
            .with_attribute(INDEX_ATTR, -1i64);
        let cap = Capability::new("xc:0", 0, vec![NodeIndex(0)]).with_meta_def(meta);
        assert_eq!(cap.index(), None);
    }

    #[test]
    fn test_to_fused_node() {
        let graph = chain_graph();
        let meta = MetaDef::for_nodes("fused_ab", "vendor", &graph, &[NodeIndex(0), NodeIndex(1)])
            .with_attribute(INDEX_ATTR, 0i64)
            .with_attribute(COMPILER_RANK_ATTR, 1i64);
        let cap = Capability::new("tvm:0", 1, vec![NodeIndex(0), NodeIndex(1)]).with_meta_def(meta);

        let fused = cap.to_fused_node(7).unwrap();
        assert_eq!(fused.index, NodeIndex(7));
        assert_eq!(fused.op_type, "fused_ab");
        assert_eq!(fused.domain, "vendor");
        assert_eq!(fused.attribute_int(INDEX_ATTR), Some(0));
        assert_eq!(fused.attribute_int(COMPILER_RANK_ATTR), Some(1));

        assert!(Capability::new("tvm:1", 1, vec![NodeIndex(2)])
            .to_fused_node(8)
            .is_none());
    }

    #[test]
    fn test_summary() {
        let cap = Capability::new("xc:3", 0, vec![NodeIndex(2), NodeIndex(1)]);
        let s = cap.summary();
        assert!(s.contains("xc:3"));
        assert!(s.contains("nodes [1, 2]"));
        assert!(!s.contains("unit"));

        let fused = Capability::new("xc:4", 1, vec![NodeIndex(5), NodeIndex(3)]).with_meta_def(
            MetaDef::for_nodes("xc_4", "xc", &chain_graph(), &[NodeIndex(1)])
                .with_attribute(INDEX_ATTR, 0i64),
        );
        assert!(fused.summary().ends_with("(rank 1, unit 0): nodes [3, 5]"));
    }
}
