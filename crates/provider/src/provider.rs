// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The execution provider façade.
//!
//! ```text
//! get_capability(graph)
//!     │  cache hit? ── yes ──► restore units per rank ──► cached set
//!     │  no
//!     ▼
//!  rank 0 propose ─┐
//!  rank 1 propose ─┼─► merge_ranked ──► PartitionSet ──► store context model
//!  rank N propose ─┘        │
//!                      UnitArena (populated once per rank)
//!                           │
//! compile(fused nodes) ─────┴──► ComputeEntryPoint per fused node
//! ```

use crate::arena::{RankRecord, UnitArena};
use crate::{ProviderConfig, ProviderError};
use capability::{merge_ranked, PartitionSet, ProposalSource, COMPILER_RANK_ATTR, INDEX_ATTR};
use context_cache::{CacheEntry, ContextCache};
use graph_ir::graph::Validated;
use graph_ir::{Graph, GraphId, Node};
use kernel_state::ComputeEntryPoint;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-compiler artifacts bundled into the single cached blob.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct ArtifactBundle {
    compilers: Vec<BundledArtifact>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct BundledArtifact {
    name: String,
    /// Hex-encoded artifact share.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    artifact: Option<String>,
}

/// Partitions graphs across ranked backend compilers and compiles the
/// accepted partitions into compute entry points.
///
/// # Example
/// ```no_run
/// use provider::{ExecutionProvider, OpSetCompiler, ProviderConfig};
/// use capability::ProposalSource;
/// use graph_ir::GraphLoader;
/// use std::path::Path;
///
/// # fn main() -> Result<(), provider::ProviderError> {
/// let config = ProviderConfig::from_file(Path::new("provider.toml"))?;
/// let sources: Vec<Box<dyn ProposalSource>> = config
///     .compilers
///     .iter()
///     .map(|c| OpSetCompiler::from_options(&c.name, &c.options).map(|s| Box::new(s) as Box<dyn ProposalSource>))
///     .collect::<Result<_, _>>()?;
/// let mut provider = ExecutionProvider::new(config, sources)?;
///
/// let graph = GraphLoader::load(Path::new("models/net.json"))?;
/// let accepted = provider.get_capability(&graph)?;
/// println!("{}", accepted.summary());
/// # Ok(())
/// # }
/// ```
pub struct ExecutionProvider {
    config: ProviderConfig,
    sources: Vec<Box<dyn ProposalSource>>,
    arena: UnitArena,
    cache: Option<ContextCache>,
    accepted_ranks: BTreeSet<usize>,
    last_graph: Option<GraphId>,
}

impl ExecutionProvider {
    /// Creates a provider. `sources` must match the configured compilers
    /// by name, in rank order.
    pub fn new(
        config: ProviderConfig,
        sources: Vec<Box<dyn ProposalSource>>,
    ) -> Result<Self, ProviderError> {
        config.validate()?;

        let configured = config.compiler_names();
        let provided: Vec<&str> = sources.iter().map(|s| s.name()).collect();
        if configured != provided {
            return Err(ProviderError::ConfigError(format!(
                "compilers {provided:?} do not match configuration {configured:?}"
            )));
        }

        let cache = config.cache.enabled.then(|| {
            ContextCache::new(
                config.name.clone(),
                config.cache.embed_mode,
                config.cache.context_model_path.clone(),
            )
        });

        info!(
            provider = %config.name,
            compilers = ?provided,
            cache = config.cache.enabled,
            "Execution provider created"
        );

        Ok(Self {
            arena: UnitArena::new(sources.len()),
            config,
            sources,
            cache,
            accepted_ranks: BTreeSet::new(),
            last_graph: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn arena(&self) -> &UnitArena {
        &self.arena
    }

    /// The last graph instance capability discovery ran for.
    pub fn last_graph(&self) -> Option<GraphId> {
        self.last_graph
    }

    /// Version tag covering every configured compiler.
    pub fn compiler_version(&self) -> String {
        self.sources
            .iter()
            .map(|s| format!("{}@{}", s.name(), s.version()))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Returns the partitions this provider accepts for `graph`.
    ///
    /// Subgraphs are never partitioned. Each compiler proposes at most
    /// once per provider: a compiler that already ran contributes nothing
    /// to later calls. Backend failures are returned unmodified.
    pub fn get_capability(&mut self, graph: &Graph<Validated>) -> Result<PartitionSet, ProviderError> {
        if graph.is_subgraph() {
            debug!(graph = %graph.name, "Subgraphs are not partitioned");
            return Ok(PartitionSet::default());
        }

        let mut pending = Vec::new();
        for rank in 0..self.sources.len() {
            match self.arena.record(rank) {
                None => pending.push(rank),
                Some(record) if record.graph() == graph.id() => {
                    debug!(compiler = self.sources[rank].name(), "Already compiled this graph");
                }
                Some(record) => {
                    warn!(
                        compiler = self.sources[rank].name(),
                        compiled = %record.graph(),
                        requested = %graph.id(),
                        "Compiler already compiled another graph, skipping"
                    );
                }
            }
        }
        if pending.is_empty() {
            return Ok(PartitionSet::default());
        }

        let fresh = pending.len() == self.sources.len();
        if fresh {
            if let Some(set) = self.restore_from_cache(graph) {
                self.last_graph = Some(graph.id());
                return Ok(set);
            }
        }

        // Nothing is recorded until every pending rank has proposed and the
        // merged set validates, so a failed call leaves no rank populated.
        let mut ranked = Vec::with_capacity(pending.len());
        let mut records = Vec::with_capacity(pending.len());
        for rank in pending {
            let source = &self.sources[rank];
            let options = &self.config.compilers[rank].options;
            info!(compiler = source.name(), rank, "Requesting capabilities");

            let proposal = source.propose(graph, options)?;
            let artifact = proposal.artifact.clone();
            let (capabilities, units) = proposal.into_capabilities(source.name(), rank, graph);
            debug!(
                compiler = source.name(),
                candidates = capabilities.len(),
                units = units.len(),
                "Proposal received"
            );

            records.push((rank, RankRecord::new(graph.id(), units, artifact)));
            ranked.push(capabilities);
        }

        let set = PartitionSet::new(merge_ranked(ranked));
        set.validate(graph.num_nodes())?;

        for (rank, record) in records {
            if self.arena.populate(rank, record).is_err() {
                warn!(rank, "Rank already populated, keeping existing units");
            }
        }
        self.accepted_ranks
            .extend(set.iter().map(|c| c.compiler_rank));
        self.last_graph = Some(graph.id());

        if fresh {
            self.store_to_cache(graph, &set);
        }

        info!(
            graph = %graph.name,
            partitions = set.len(),
            covered = set.covered_nodes().len(),
            "Capability discovery complete"
        );
        debug!("{}", set.summary());
        Ok(set)
    }

    /// Binds each fused node to the unit named by its `index` attribute.
    ///
    /// Nodes without an `index` belong to another provider and are
    /// skipped. With a `compiler_rank` attribute the unit is looked up in
    /// that rank; otherwise the first rank with accepted partitions that
    /// has a unit at `index` is used.
    pub fn compile(&self, fused: &[Node]) -> Result<Vec<ComputeEntryPoint>, ProviderError> {
        let mut entries = Vec::with_capacity(fused.len());

        for node in fused {
            let Some(index) = node.attribute_int(INDEX_ATTR) else {
                debug!(node = %node.name, "No index attribute, skipping");
                continue;
            };
            let rank_attr = node.attribute_int(COMPILER_RANK_ATTR);
            let unknown = || ProviderError::UnknownUnit {
                node: node.name.clone(),
                rank: rank_attr,
                index,
            };
            let slot = usize::try_from(index).map_err(|_| unknown())?;

            let (rank, unit) = match rank_attr {
                Some(rank) => usize::try_from(rank)
                    .ok()
                    .and_then(|r| self.arena.unit(r, slot).map(|u| (r, u)))
                    .ok_or_else(unknown)?,
                None => self
                    .accepted_ranks
                    .iter()
                    .find_map(|&r| self.arena.unit(r, slot).map(|u| (r, u)))
                    .ok_or_else(unknown)?,
            };

            debug!(node = %node.name, rank, index = slot, unit = unit.name(), "Bound fused node");
            entries.push(ComputeEntryPoint::new(
                node.name.clone(),
                rank,
                slot,
                Arc::clone(unit),
            ));
        }

        info!(fused = fused.len(), bound = entries.len(), "Compile complete");
        Ok(entries)
    }

    /// Rebuilds every rank from the context model. Any inconsistency is a
    /// cache miss.
    fn restore_from_cache(&mut self, graph: &Graph<Validated>) -> Option<PartitionSet> {
        let cache = self.cache.as_ref()?;
        let entry = match cache.load(graph) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Context model unavailable, running discovery");
                return None;
            }
        };

        let version = self.compiler_version();
        if entry.compiler_version != version {
            warn!(
                cached = %entry.compiler_version,
                current = %version,
                "Context model built by other compiler versions, ignoring"
            );
            return None;
        }

        let bundle: ArtifactBundle = match serde_json::from_slice(&entry.artifact) {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!(error = %e, "Unreadable cached artifact, ignoring");
                return None;
            }
        };
        let bundled: Vec<&str> = bundle.compilers.iter().map(|c| c.name.as_str()).collect();
        if bundled != self.config.compiler_names() {
            warn!(cached = ?bundled, "Cached artifact covers other compilers, ignoring");
            return None;
        }

        let mut records = Vec::with_capacity(self.sources.len());
        for (rank, (source, share)) in self.sources.iter().zip(&bundle.compilers).enumerate() {
            let share = match share.artifact.as_deref().map(hex::decode).transpose() {
                Ok(share) => share,
                Err(e) => {
                    warn!(compiler = source.name(), error = %e, "Corrupt artifact share, ignoring");
                    return None;
                }
            };
            let options = &self.config.compilers[rank].options;
            let proposal = match source.restore(graph, share.as_deref().unwrap_or_default(), options) {
                Ok(proposal) => proposal,
                Err(e) => {
                    warn!(compiler = source.name(), error = %e, "Restore failed, running discovery");
                    return None;
                }
            };
            let artifact = proposal.artifact.clone().or(share);
            let (_, units) = proposal.into_capabilities(source.name(), rank, graph);
            records.push(RankRecord::new(graph.id(), units, artifact));
        }

        for cap in entry.partitions.iter() {
            if let Some(index) = cap.index() {
                let known = records
                    .get(cap.compiler_rank)
                    .is_some_and(|r| index < r.units().len());
                if !known {
                    warn!(id = %cap.id, index, "Cached partition has no restored unit, ignoring");
                    return None;
                }
            }
        }
        if let Err(e) = entry.partitions.validate(graph.num_nodes()) {
            warn!(error = %e, "Cached partitions invalid for this graph, ignoring");
            return None;
        }

        for (rank, record) in records.into_iter().enumerate() {
            if self.arena.populate(rank, record).is_err() {
                warn!(rank, "Rank already populated, keeping existing units");
            }
        }
        self.accepted_ranks
            .extend(entry.partitions.iter().map(|c| c.compiler_rank));

        info!(
            graph = %graph.name,
            partitions = entry.partitions.len(),
            "Restored capabilities from context model"
        );
        Some(entry.partitions)
    }

    /// Persists the accepted set. Failures are logged and otherwise ignored.
    fn store_to_cache(&self, graph: &Graph<Validated>, set: &PartitionSet) {
        let Some(cache) = &self.cache else {
            return;
        };

        let bundle = ArtifactBundle {
            compilers: self
                .sources
                .iter()
                .enumerate()
                .map(|(rank, source)| BundledArtifact {
                    name: source.name().to_string(),
                    artifact: self
                        .arena
                        .record(rank)
                        .and_then(RankRecord::artifact)
                        .map(hex::encode),
                })
                .collect(),
        };
        let artifact = match serde_json::to_vec(&bundle) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Cannot serialise artifacts, context model not written");
                return;
            }
        };

        let entry = CacheEntry::for_graph(graph, set.clone(), artifact, self.compiler_version());
        if let Err(e) = cache.store(graph, &entry) {
            warn!(error = %e, "Failed to write context model");
        }
    }
}

impl std::fmt::Debug for ExecutionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionProvider")
            .field("name", &self.config.name)
            .field("compilers", &self.config.compiler_names())
            .field("units", &self.arena.num_units())
            .field("last_graph", &self.last_graph)
            .finish()
    }
}
