// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Ranked capability merging.
//!
//! Two lists are merged at a time, the left one taking precedence. Only
//! single-node claims participate in conflict resolution: a lower-ranked
//! single-node candidate is dropped if its node is already claimed by a
//! single-node partition. Multi-node candidates are always kept, since
//! splitting them would invalidate their fused-node metadata.
//!
//! The result is deterministic for a given pair of ordered inputs.

use crate::Capability;
use graph_ir::NodeIndex;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Merges a lower-ranked list into a higher-ranked one.
///
/// Every candidate of `higher` is kept in order, followed by the accepted
/// candidates of `lower` in order.
pub fn merge_capabilities(higher: Vec<Capability>, lower: Vec<Capability>) -> Vec<Capability> {
    let mut claimed: HashSet<NodeIndex> = higher
        .iter()
        .filter(|c| c.is_single_node())
        .map(|c| c.nodes()[0])
        .collect();

    let mut merged = higher;
    merged.reserve(lower.len());

    for candidate in lower {
        if candidate.nodes().is_empty() {
            warn!(id = %candidate.id, "Dropping capability with no nodes");
            continue;
        }

        if !candidate.is_single_node() {
            debug!(
                id = %candidate.id,
                nodes = candidate.num_nodes(),
                "Accepted multi-node capability"
            );
            merged.push(candidate);
            continue;
        }

        let node = candidate.nodes()[0];
        if claimed.insert(node) {
            debug!(id = %candidate.id, node = %node, "Accepted single-node capability");
            merged.push(candidate);
        } else {
            debug!(
                id = %candidate.id,
                node = %node,
                "Node already claimed by a higher-ranked compiler, dropping"
            );
        }
    }

    merged
}

/// Folds ranked lists (rank 0 first) through [`merge_capabilities`].
pub fn merge_ranked<I>(ranked: I) -> Vec<Capability>
where
    I: IntoIterator<Item = Vec<Capability>>,
{
    ranked
        .into_iter()
        .fold(Vec::new(), merge_capabilities)
}
