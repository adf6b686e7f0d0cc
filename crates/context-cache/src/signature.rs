// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Content signature of a pre-partition graph.
//!
//! Covers node topology and operator identity: nodes in topological order
//! (op type, domain, argument names), the derived edge list, and graph
//! inputs and outputs. Node names and attributes are not hashed, so
//! renaming a node keeps its cache entry valid.

use graph_ir::graph::Validated;
use graph_ir::Graph;
use std::fmt;

/// Hex-encoded blake3 digest of a graph's topology.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct GraphSignature(String);

impl GraphSignature {
    /// Computes the signature of `graph`.
    pub fn of(graph: &Graph<Validated>) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"graph-signature-v1");

        write_list(&mut hasher, &graph.inputs);
        write_list(&mut hasher, &graph.outputs);

        let order = graph.topological_order();
        write_len(&mut hasher, order.len());
        for index in order {
            let Some(node) = graph.node(index) else {
                continue;
            };
            write_len(&mut hasher, index.get());
            write_str(&mut hasher, &node.op_type);
            write_str(&mut hasher, &node.domain);
            write_list(&mut hasher, &node.inputs);
            write_list(&mut hasher, &node.outputs);
        }

        write_len(&mut hasher, graph.edges().len());
        for edge in graph.edges() {
            write_len(&mut hasher, edge.src_node.get());
            write_len(&mut hasher, edge.src_slot);
            write_len(&mut hasher, edge.dst_node.get());
            write_len(&mut hasher, edge.dst_slot);
        }

        Self(hasher.finalize().to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GraphSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn write_len(hasher: &mut blake3::Hasher, value: usize) {
    hasher.update(&(value as u64).to_le_bytes());
}

fn write_str(hasher: &mut blake3::Hasher, value: &str) {
    write_len(hasher, value.len());
    hasher.update(value.as_bytes());
}

fn write_list(hasher: &mut blake3::Hasher, values: &[String]) {
    write_len(hasher, values.len());
    for value in values {
        write_str(hasher, value);
    }
}
