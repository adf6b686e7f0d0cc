// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON graph manifest parsing.
//!
//! # Format
//! ```json
//! {
//!   "name": "tiny-cnn",
//!   "inputs": ["x"],
//!   "outputs": ["y"],
//!   "nodes": [
//!     { "name": "conv", "op_type": "Conv", "inputs": ["x", "w"], "outputs": ["c"] },
//!     { "name": "relu", "op_type": "Relu", "inputs": ["c"], "outputs": ["y"],
//!       "attributes": { "alpha": { "float": 0.0 } } }
//!   ]
//! }
//! ```
//!
//! Node indices are implied by position in `nodes`.

use crate::graph::{Graph, GraphState, Loaded};
use crate::{AttributeValue, GraphError, Node};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Top-level graph manifest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GraphManifest {
    /// Human-readable graph name.
    pub name: String,
    /// Whether this graph is nested inside a control-flow node.
    #[serde(default)]
    pub is_subgraph: bool,
    /// Graph-level input value names.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Graph-level output value names.
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Node definitions in index order.
    pub nodes: Vec<ManifestNode>,
}

/// A single node entry in the manifest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManifestNode {
    pub name: String,
    pub op_type: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl GraphManifest {
    /// Loads a manifest from a JSON file path.
    pub fn from_file(path: &Path) -> Result<Self, GraphError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parses a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let manifest: Self = serde_json::from_str(json)?;
        Ok(manifest)
    }

    /// Serialises the manifest to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the manifest to a JSON file.
    pub fn to_file(&self, path: &Path) -> Result<(), GraphError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Builds a manifest describing an existing graph.
    pub fn from_graph<S: GraphState>(graph: &Graph<S>) -> Self {
        Self {
            name: graph.name.clone(),
            is_subgraph: graph.is_subgraph(),
            inputs: graph.inputs.clone(),
            outputs: graph.outputs.clone(),
            nodes: graph
                .nodes
                .iter()
                .map(|n| ManifestNode {
                    name: n.name.clone(),
                    op_type: n.op_type.clone(),
                    domain: n.domain.clone(),
                    inputs: n.inputs.clone(),
                    outputs: n.outputs.clone(),
                    attributes: n.attributes.clone(),
                })
                .collect(),
        }
    }

    /// Validates that the manifest is internally consistent.
    ///
    /// Checks:
    /// - At least one node is defined.
    /// - Every node has a non-empty op type.
    /// - No duplicate node names.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::InvalidGraph("manifest contains no nodes".into()));
        }

        let mut seen_names = HashSet::new();
        for node in &self.nodes {
            if !seen_names.insert(&node.name) {
                return Err(GraphError::InvalidNode {
                    node: node.name.clone(),
                    detail: "duplicate node name".into(),
                });
            }
            if node.op_type.trim().is_empty() {
                return Err(GraphError::InvalidNode {
                    node: node.name.clone(),
                    detail: "missing op type".into(),
                });
            }
        }

        let declared: HashSet<&str> = self.inputs.iter().map(String::as_str).collect();
        let produced: HashSet<&str> = self
            .nodes
            .iter()
            .flat_map(|n| n.outputs.iter().map(String::as_str))
            .collect();
        for node in &self.nodes {
            for input in &node.inputs {
                if !input.is_empty()
                    && !declared.contains(input.as_str())
                    && !produced.contains(input.as_str())
                {
                    tracing::debug!(
                        "node '{}' consumes '{}' which is neither a graph input nor produced (initializer?)",
                        node.name,
                        input,
                    );
                }
            }
        }

        Ok(())
    }

    /// Converts the manifest into an unvalidated [`Graph`].
    pub fn into_graph(self) -> Graph<Loaded> {
        let nodes = self
            .nodes
            .into_iter()
            .enumerate()
            .map(|(i, n)| Node {
                index: i.into(),
                name: n.name,
                op_type: n.op_type,
                domain: n.domain,
                inputs: n.inputs,
                outputs: n.outputs,
                attributes: n.attributes,
            })
            .collect();
        let graph = Graph::new(self.name, nodes).with_io(self.inputs, self.outputs);
        if self.is_subgraph {
            graph.as_subgraph()
        } else {
            graph
        }
    }
}
