// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Backend compilers as proposal sources.
//!
//! A [`ProposalSource`] inspects a validated graph and returns the node sets
//! it can execute, together with one [`CompiledUnit`] per partition it
//! intends to run as a fused node. Both the units and the optional artifact
//! blob are opaque to this crate.

use crate::capability::{Capability, MetaDef, COMPILER_RANK_ATTR, INDEX_ATTR};
use graph_ir::graph::Validated;
use graph_ir::{Graph, NodeIndex};
use kernel_state::{BackendError, CompiledUnit};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-compiler options, passed through as a flat string map.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct CompilerOptions(pub BTreeMap<String, String>);

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an option, replacing any previous value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renders the options as the JSON object handed to a backend.
    pub fn to_json(&self) -> String {
        // A string-to-string map always serializes.
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

/// One partition offered by a backend.
#[derive(Debug, Clone)]
pub struct ProposedPartition {
    /// Name given to the fused node.
    pub name: String,
    /// Claimed nodes, in execution order.
    pub nodes: Vec<NodeIndex>,
    /// Compiled unit executing the partition, if the backend fuses it.
    pub unit: Option<Arc<dyn CompiledUnit>>,
}

impl ProposedPartition {
    pub fn new(name: impl Into<String>, nodes: Vec<NodeIndex>) -> Self {
        Self {
            name: name.into(),
            nodes,
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: Arc<dyn CompiledUnit>) -> Self {
        self.unit = Some(unit);
        self
    }
}

/// Everything a backend returns for one graph.
#[derive(Debug, Clone, Default)]
pub struct Proposal {
    pub partitions: Vec<ProposedPartition>,
    /// Opaque compiled artifact, persisted by the context cache.
    pub artifact: Option<Vec<u8>>,
}

impl Proposal {
    pub fn new(partitions: Vec<ProposedPartition>) -> Self {
        Self {
            partitions,
            artifact: None,
        }
    }

    pub fn with_artifact(mut self, artifact: Vec<u8>) -> Self {
        self.artifact = Some(artifact);
        self
    }

    /// Converts the proposal into ranked capabilities and the unit list
    /// their `index` attributes point into.
    ///
    /// Units are numbered in proposal order, skipping partitions without
    /// one; those become plain node claims.
    pub fn into_capabilities(
        self,
        source: &str,
        compiler_rank: usize,
        graph: &Graph<Validated>,
    ) -> (Vec<Capability>, Vec<Arc<dyn CompiledUnit>>) {
        let mut capabilities = Vec::with_capacity(self.partitions.len());
        let mut units: Vec<Arc<dyn CompiledUnit>> = Vec::new();

        for (position, partition) in self.partitions.into_iter().enumerate() {
            let id = format!("{source}:{position}");
            let mut capability = Capability::new(id, compiler_rank, partition.nodes);
            if let Some(unit) = partition.unit {
                let meta = MetaDef::for_nodes(partition.name, source, graph, capability.nodes())
                    .with_attribute(INDEX_ATTR, units.len() as i64)
                    .with_attribute(COMPILER_RANK_ATTR, compiler_rank as i64);
                capability = capability.with_meta_def(meta);
                units.push(unit);
            }
            capabilities.push(capability);
        }

        (capabilities, units)
    }
}

/// A backend compiler offering candidate partitions.
pub trait ProposalSource: Send + Sync {
    /// Unique name of this compiler.
    fn name(&self) -> &str;

    /// Version tag recorded in persisted context entries.
    fn version(&self) -> &str {
        "0"
    }

    /// Partitions `graph` and compiles the partitions it will fuse.
    fn propose(
        &self,
        graph: &Graph<Validated>,
        options: &CompilerOptions,
    ) -> Result<Proposal, BackendError>;

    /// Rebuilds a proposal from a previously persisted artifact.
    ///
    /// The returned partitions must match the persisted ones position for
    /// position. The default ignores the artifact and proposes again.
    fn restore(
        &self,
        graph: &Graph<Validated>,
        _artifact: &[u8],
        options: &CompilerOptions,
    ) -> Result<Proposal, BackendError> {
        self.propose(graph, options)
    }
}
