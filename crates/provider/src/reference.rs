// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reference backend: claims nodes by operator type.
//!
//! Claimed nodes connected by an edge are fused into one partition as
//! long as the partition stays convex, so a run of supported operators
//! becomes a multi-node partition and an isolated supported node a
//! single-node one. Every partition is backed
//! by a unit whose kernel copies input 0 to output 0.
//!
//! The artifact is the JSON list of node groups, which is enough to
//! rebuild the same partitions on a cache hit.

use crate::ProviderError;
use capability::{CompilerOptions, Proposal, ProposalSource, ProposedPartition};
use graph_ir::graph::Validated;
use graph_ir::{Graph, NodeIndex};
use kernel_state::{BackendError, CompiledUnit, KernelContext, KernelInstance};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// A [`ProposalSource`] supporting a fixed set of operator types.
#[derive(Debug, Clone)]
pub struct OpSetCompiler {
    name: String,
    ops: BTreeSet<String>,
    version: String,
}

impl OpSetCompiler {
    pub fn new<I, S>(name: impl Into<String>, ops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            ops: ops.into_iter().map(Into::into).collect(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Builds a compiler from its configured options.
    ///
    /// `ops` (required) is a comma-separated operator list; `version`
    /// overrides the version tag.
    pub fn from_options(name: &str, options: &CompilerOptions) -> Result<Self, ProviderError> {
        let ops = options.get("ops").ok_or_else(|| {
            ProviderError::ConfigError(format!("compiler '{name}' is missing the 'ops' option"))
        })?;
        let ops: Vec<&str> = ops
            .split(',')
            .map(str::trim)
            .filter(|op| !op.is_empty())
            .collect();
        if ops.is_empty() {
            return Err(ProviderError::ConfigError(format!(
                "compiler '{name}' supports no operators"
            )));
        }

        let compiler = Self::new(name, ops);
        Ok(match options.get("version") {
            Some(version) => compiler.with_version(version),
            None => compiler,
        })
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn supports(&self, op_type: &str) -> bool {
        self.ops.contains(op_type)
    }

    /// Grows convex groups of supported nodes in topological order.
    ///
    /// A node joins the group of its first supported producer unless that
    /// group also reaches it through a node outside the group; fusing it
    /// then would make the fused node both feed and consume that outside
    /// node. Groups are never merged, so they stay in order of their first
    /// node and each lists its nodes in topological order.
    fn groups(&self, graph: &Graph<Validated>) -> Vec<Vec<NodeIndex>> {
        let n = graph.num_nodes();
        let mut producers: Vec<Vec<usize>> = vec![Vec::new(); n];
        for edge in graph.edges() {
            producers[edge.dst_node.get()].push(edge.src_node.get());
        }

        let mut group_of: Vec<Option<usize>> = vec![None; n];
        // Groups with a path to each node, the node's own group included.
        let mut reached_by: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
        let mut groups: Vec<Vec<NodeIndex>> = Vec::new();

        for index in graph.topological_order() {
            let v = index.get();
            let upstream: BTreeSet<usize> = producers[v]
                .iter()
                .flat_map(|&p| reached_by[p].iter().copied())
                .collect();

            let supported = graph
                .node(index)
                .is_some_and(|node| self.supports(&node.op_type));
            if supported {
                let joinable = producers[v].iter().find_map(|&p| {
                    let g = group_of[p]?;
                    let escapes = producers[v]
                        .iter()
                        .any(|&q| group_of[q] != Some(g) && reached_by[q].contains(&g));
                    (!escapes).then_some(g)
                });
                let g = joinable.unwrap_or_else(|| {
                    groups.push(Vec::new());
                    groups.len() - 1
                });
                groups[g].push(index);
                group_of[v] = Some(g);
            }

            let mut reach = upstream;
            reach.extend(group_of[v]);
            reached_by[v] = reach;
        }

        groups
    }

    fn build(&self, groups: Vec<Vec<NodeIndex>>) -> Result<Proposal, BackendError> {
        let raw: Vec<Vec<usize>> = groups
            .iter()
            .map(|g| g.iter().map(|n| n.get()).collect())
            .collect();
        let artifact =
            serde_json::to_vec(&raw).map_err(|e| BackendError::new(&self.name, e.to_string()))?;

        let partitions = groups
            .into_iter()
            .enumerate()
            .map(|(k, nodes)| {
                let name = format!("{}_{k}", self.name);
                let unit = Arc::new(CopyUnit { name: name.clone() });
                ProposedPartition::new(name, nodes).with_unit(unit)
            })
            .collect();

        Ok(Proposal::new(partitions).with_artifact(artifact))
    }
}

impl ProposalSource for OpSetCompiler {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn propose(
        &self,
        graph: &Graph<Validated>,
        options: &CompilerOptions,
    ) -> Result<Proposal, BackendError> {
        debug!(compiler = %self.name, options = %options.to_json(), "Partitioning {}", graph.name);
        self.build(self.groups(graph))
    }

    fn restore(
        &self,
        graph: &Graph<Validated>,
        artifact: &[u8],
        _options: &CompilerOptions,
    ) -> Result<Proposal, BackendError> {
        let raw: Vec<Vec<usize>> = serde_json::from_slice(artifact)
            .map_err(|e| BackendError::new(&self.name, format!("unreadable artifact: {e}")))?;

        let mut groups = Vec::with_capacity(raw.len());
        for group in raw {
            let mut nodes = Vec::with_capacity(group.len());
            for index in group {
                match graph.node(NodeIndex(index)) {
                    Some(node) if self.supports(&node.op_type) => nodes.push(node.index),
                    _ => {
                        return Err(BackendError::new(
                            &self.name,
                            format!("artifact references unsupported node {index}"),
                        ))
                    }
                }
            }
            groups.push(nodes);
        }

        debug!(compiler = %self.name, partitions = groups.len(), "Restored from artifact");
        self.build(groups)
    }
}

/// Compiled unit of the reference backend.
#[derive(Debug)]
struct CopyUnit {
    name: String,
}

impl CompiledUnit for CopyUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn instantiate(&self) -> Result<Box<dyn KernelInstance>, BackendError> {
        Ok(Box::new(CopyKernel {
            unit: self.name.clone(),
        }))
    }
}

struct CopyKernel {
    unit: String,
}

impl KernelInstance for CopyKernel {
    fn compute(&mut self, ctx: &mut KernelContext) -> Result<(), BackendError> {
        let data = ctx
            .input(0)
            .ok_or_else(|| BackendError::new(&self.unit, "missing input 0"))?
            .to_vec();
        ctx.set_output(0, data);
        Ok(())
    }
}
