// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for accepted partition sets.

use graph_ir::NodeIndex;

/// Structural violations found when validating a [`crate::PartitionSet`].
#[derive(Debug, thiserror::Error)]
pub enum PartitionError {
    /// A capability names no nodes.
    #[error("capability '{id}' contains no nodes")]
    EmptyPartition { id: String },

    /// A capability names a node the graph does not have.
    #[error("capability '{id}' references node {node}, graph has {num_nodes} nodes")]
    NodeOutOfRange {
        id: String,
        node: NodeIndex,
        num_nodes: usize,
    },

    /// Two single-node capabilities claim the same node.
    #[error("node {node} is claimed by single-node capabilities '{first}' and '{second}'")]
    DuplicateSingleNode {
        node: NodeIndex,
        first: String,
        second: String,
    },
}
