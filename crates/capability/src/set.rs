// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The accepted partition set.

use crate::{Capability, PartitionError};
use graph_ir::NodeIndex;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Capabilities accepted for execution, in merge order.
///
/// Immutable once built. Single-node claims never repeat a node; a node
/// may still appear in a multi-node partition and a single-node one.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PartitionSet {
    capabilities: Vec<Capability>,
}

impl PartitionSet {
    pub fn new(capabilities: Vec<Capability>) -> Self {
        Self { capabilities }
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities.iter()
    }

    /// Checks the set against a graph of `num_nodes` nodes.
    pub fn validate(&self, num_nodes: usize) -> Result<(), PartitionError> {
        let mut single_owner: HashMap<NodeIndex, &str> = HashMap::new();

        for cap in &self.capabilities {
            if cap.nodes().is_empty() {
                return Err(PartitionError::EmptyPartition { id: cap.id.clone() });
            }
            if let Some(&node) = cap.nodes().iter().find(|n| n.get() >= num_nodes) {
                return Err(PartitionError::NodeOutOfRange {
                    id: cap.id.clone(),
                    node,
                    num_nodes,
                });
            }
            if cap.is_single_node() {
                let node = cap.nodes()[0];
                if let Some(first) = single_owner.insert(node, &cap.id) {
                    return Err(PartitionError::DuplicateSingleNode {
                        node,
                        first: first.to_string(),
                        second: cap.id.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Every node claimed by at least one partition.
    pub fn covered_nodes(&self) -> BTreeSet<NodeIndex> {
        self.capabilities
            .iter()
            .flat_map(|c| c.nodes().iter().copied())
            .collect()
    }

    /// Nodes claimed by more than one partition.
    pub fn overlapping_nodes(&self) -> BTreeSet<NodeIndex> {
        let mut counts: BTreeMap<NodeIndex, usize> = BTreeMap::new();
        for cap in &self.capabilities {
            let distinct: BTreeSet<NodeIndex> = cap.nodes().iter().copied().collect();
            for node in distinct {
                *counts.entry(node).or_default() += 1;
            }
        }
        counts
            .into_iter()
            .filter(|&(_, n)| n > 1)
            .map(|(node, _)| node)
            .collect()
    }

    /// Number of accepted partitions owned by `compiler_rank`.
    pub fn count_for_rank(&self, compiler_rank: usize) -> usize {
        self.capabilities
            .iter()
            .filter(|c| c.compiler_rank == compiler_rank)
            .count()
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        let mut s = format!(
            "Partition set: {} partitions covering {} nodes\n",
            self.capabilities.len(),
            self.covered_nodes().len()
        );
        for cap in &self.capabilities {
            s.push_str(&format!("  {}\n", cap.summary()));
        }
        let overlaps = self.overlapping_nodes();
        if !overlaps.is_empty() {
            let nodes: Vec<usize> = overlaps.iter().map(|n| n.get()).collect();
            s.push_str(&format!("  overlapping nodes: {:?}\n", nodes));
        }
        s
    }
}

impl From<Vec<Capability>> for PartitionSet {
    fn from(capabilities: Vec<Capability>) -> Self {
        Self::new(capabilities)
    }
}

impl<'a> IntoIterator for &'a PartitionSet {
    type Item = &'a Capability;
    type IntoIter = std::slice::Iter<'a, Capability>;

    fn into_iter(self) -> Self::IntoIter {
        self.capabilities.iter()
    }
}
