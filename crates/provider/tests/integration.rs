// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: end-to-end partitioning pipeline.
//!
//! These tests exercise the complete flow from graph construction →
//! ranked capability discovery → merge → compile → lazy kernel state,
//! and the context model round trip across provider instances.

use capability::{
    Capability, CompilerOptions, PartitionSet, Proposal, ProposalSource, ProposedPartition,
    COMPILER_RANK_ATTR,
};
use context_cache::EmbedMode;
use graph_ir::{graph::Validated, Graph, GraphLoader, GraphManifest, Node, NodeIndex};
use kernel_state::{BackendError, CompiledUnit, KernelContext, KernelInstance};
use provider::{CompilerConfig, ExecutionProvider, OpSetCompiler, ProviderConfig, ProviderError};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Helpers ────────────────────────────────────────────────────

/// x → n0 → n1 → n2 → n3 → n4 → y
fn chain_graph() -> Graph<Validated> {
    chain(&["Conv", "Relu", "Add", "Mul", "Sigmoid"]).validate().unwrap()
}

fn chain(ops: &[&str]) -> Graph {
    let nodes = ops
        .iter()
        .enumerate()
        .map(|(i, op)| {
            let input = if i == 0 { "x".to_string() } else { format!("t{}", i - 1) };
            let output = if i + 1 == ops.len() { "y".to_string() } else { format!("t{i}") };
            Node::new(i, format!("n{i}"), *op).with_args([input], [output])
        })
        .collect();
    Graph::new("chain", nodes).with_io(vec!["x".into()], vec!["y".into()])
}

fn groups(set: &PartitionSet) -> Vec<Vec<usize>> {
    set.iter()
        .map(|c| c.nodes().iter().map(|n| n.get()).collect())
        .collect()
}

fn config(names: &[&str]) -> ProviderConfig {
    ProviderConfig {
        compilers: names
            .iter()
            .map(|n| CompilerConfig::new(*n, CompilerOptions::new()))
            .collect(),
        ..ProviderConfig::default()
    }
}

/// Unit whose kernel appends a marker byte to input 0.
#[derive(Debug)]
struct MarkUnit {
    name: String,
    mark: u8,
}

impl CompiledUnit for MarkUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn instantiate(&self) -> Result<Box<dyn KernelInstance>, BackendError> {
        Ok(Box::new(MarkKernel { mark: self.mark }))
    }
}

struct MarkKernel {
    mark: u8,
}

impl KernelInstance for MarkKernel {
    fn compute(&mut self, ctx: &mut KernelContext) -> Result<(), BackendError> {
        let mut data = ctx.input(0).unwrap_or_default().to_vec();
        data.push(self.mark);
        ctx.set_output(0, data);
        Ok(())
    }
}

/// Backend proposing a fixed list of node groups, every group fused.
struct Scripted {
    name: &'static str,
    groups: Vec<Vec<usize>>,
    calls: Arc<AtomicUsize>,
    failure: Option<&'static str>,
    failures_left: AtomicUsize,
}

impl Scripted {
    fn new(name: &'static str, groups: &[&[usize]]) -> Self {
        Self {
            name,
            groups: groups.iter().map(|g| g.to_vec()).collect(),
            calls: Arc::new(AtomicUsize::new(0)),
            failure: None,
            failures_left: AtomicUsize::new(0),
        }
    }

    fn failing(name: &'static str, message: &'static str) -> Self {
        Self {
            failure: Some(message),
            failures_left: AtomicUsize::new(usize::MAX),
            ..Self::new(name, &[])
        }
    }

    /// Fails the first `propose`, then behaves like [`Scripted::new`].
    fn failing_once(name: &'static str, groups: &[&[usize]], message: &'static str) -> Self {
        Self {
            failure: Some(message),
            failures_left: AtomicUsize::new(1),
            ..Self::new(name, groups)
        }
    }
}

impl ProposalSource for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    fn propose(
        &self,
        _graph: &Graph<Validated>,
        _options: &CompilerOptions,
    ) -> Result<Proposal, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.failure {
            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(BackendError::new(self.name, message));
            }
        }
        let partitions = self
            .groups
            .iter()
            .enumerate()
            .map(|(k, g)| {
                let name = format!("{}_{k}", self.name);
                let unit = Arc::new(MarkUnit {
                    name: name.clone(),
                    mark: k as u8,
                });
                ProposedPartition::new(name, g.iter().copied().map(NodeIndex).collect())
                    .with_unit(unit)
            })
            .collect();
        Ok(Proposal::new(partitions))
    }
}

/// Counts `propose` and `restore` calls of a wrapped backend.
struct Counting {
    inner: OpSetCompiler,
    proposes: Arc<AtomicUsize>,
    restores: Arc<AtomicUsize>,
}

impl Counting {
    fn new(inner: OpSetCompiler) -> Self {
        Self {
            inner,
            proposes: Arc::new(AtomicUsize::new(0)),
            restores: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ProposalSource for Counting {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn version(&self) -> &str {
        self.inner.version()
    }

    fn propose(
        &self,
        graph: &Graph<Validated>,
        options: &CompilerOptions,
    ) -> Result<Proposal, BackendError> {
        self.proposes.fetch_add(1, Ordering::SeqCst);
        self.inner.propose(graph, options)
    }

    fn restore(
        &self,
        graph: &Graph<Validated>,
        artifact: &[u8],
        options: &CompilerOptions,
    ) -> Result<Proposal, BackendError> {
        self.restores.fetch_add(1, Ordering::SeqCst);
        self.inner.restore(graph, artifact, options)
    }
}

fn fused_nodes(set: &PartitionSet, first_index: usize) -> Vec<Node> {
    set.iter()
        .enumerate()
        .filter_map(|(i, c)| c.to_fused_node(first_index + i))
        .collect()
}

// ── Discovery ──────────────────────────────────────────────────

#[test]
fn test_subgraph_yields_nothing() {
    let a = Scripted::new("a", &[&[0]]);
    let b = Scripted::new("b", &[&[1]]);
    let (a_calls, b_calls) = (a.calls.clone(), b.calls.clone());
    let mut provider =
        ExecutionProvider::new(config(&["a", "b"]), vec![Box::new(a), Box::new(b)]).unwrap();

    let subgraph = chain(&["Conv", "Relu"]).as_subgraph().validate().unwrap();
    assert!(provider.get_capability(&subgraph).unwrap().is_empty());
    assert_eq!(a_calls.load(Ordering::SeqCst), 0);
    assert_eq!(b_calls.load(Ordering::SeqCst), 0);
    assert!(provider.last_graph().is_none());
}

#[test]
fn test_two_compiler_merge() {
    let a = Scripted::new("a", &[&[0], &[1, 2]]);
    let b = Scripted::new("b", &[&[0], &[3], &[4]]);
    let mut provider =
        ExecutionProvider::new(config(&["a", "b"]), vec![Box::new(a), Box::new(b)]).unwrap();

    let graph = chain_graph();
    let set = provider.get_capability(&graph).unwrap();
    assert_eq!(groups(&set), vec![vec![0], vec![1, 2], vec![3], vec![4]]);

    let ranks: Vec<usize> = set.iter().map(|c| c.compiler_rank).collect();
    assert_eq!(ranks, vec![0, 0, 1, 1]);
    // b's {3} and {4} are its second and third units.
    let indices: Vec<Option<usize>> = set.iter().map(Capability::index).collect();
    assert_eq!(indices, vec![Some(0), Some(1), Some(1), Some(2)]);
    assert_eq!(provider.last_graph(), Some(graph.id()));
}

#[test]
fn test_multi_node_overlap_survives_merge() {
    let a = Scripted::new("a", &[&[1, 2, 3]]);
    let b = Scripted::new("b", &[&[2]]);
    let mut provider =
        ExecutionProvider::new(config(&["a", "b"]), vec![Box::new(a), Box::new(b)]).unwrap();

    let set = provider.get_capability(&chain_graph()).unwrap();
    assert_eq!(groups(&set), vec![vec![1, 2, 3], vec![2]]);
    assert_eq!(
        set.overlapping_nodes().into_iter().collect::<Vec<_>>(),
        vec![NodeIndex(2)]
    );
}

#[test]
fn test_compile_once_per_graph() {
    let a = Scripted::new("a", &[&[0]]);
    let calls = a.calls.clone();
    let mut provider = ExecutionProvider::new(config(&["a"]), vec![Box::new(a)]).unwrap();

    let graph = chain_graph();
    assert_eq!(provider.get_capability(&graph).unwrap().len(), 1);
    assert!(provider.get_capability(&graph).unwrap().is_empty());
    assert!(provider.get_capability(&graph.clone()).unwrap().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // A different graph cannot be compiled by a populated provider either.
    assert!(provider.get_capability(&chain_graph()).unwrap().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_backend_failure_is_unmodified() {
    let mut provider = ExecutionProvider::new(
        config(&["a"]),
        vec![Box::new(Scripted::failing("a", "device lost"))],
    )
    .unwrap();

    match provider.get_capability(&chain_graph()) {
        Err(ProviderError::Backend(e)) => {
            assert_eq!(e, BackendError::new("a", "device lost"));
            assert_eq!(
                ProviderError::Backend(e.clone()).to_string(),
                e.to_string()
            );
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_retry_after_backend_failure_keeps_rank_order() {
    let a = Scripted::new("a", &[&[0]]);
    let b = Scripted::failing_once("b", &[&[0], &[3]], "compiler busy");
    let (a_calls, b_calls) = (a.calls.clone(), b.calls.clone());
    let mut provider =
        ExecutionProvider::new(config(&["a", "b"]), vec![Box::new(a), Box::new(b)]).unwrap();

    let graph = chain_graph();
    assert!(matches!(
        provider.get_capability(&graph),
        Err(ProviderError::Backend(_))
    ));
    assert!(!provider.arena().is_populated(0));
    assert!(provider.last_graph().is_none());

    // Both ranks run again, so a's claim on node 0 still wins.
    let set = provider.get_capability(&graph).unwrap();
    assert_eq!(groups(&set), vec![vec![0], vec![3]]);
    let owners: Vec<(&str, usize)> = set.iter().map(|c| (c.id.as_str(), c.compiler_rank)).collect();
    assert_eq!(owners, vec![("a:0", 0), ("b:1", 1)]);
    assert_eq!(a_calls.load(Ordering::SeqCst), 2);
    assert_eq!(b_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_out_of_range_proposal_is_rejected() {
    let mut provider = ExecutionProvider::new(
        config(&["a"]),
        vec![Box::new(Scripted::new("a", &[&[0, 42]]))],
    )
    .unwrap();
    assert!(matches!(
        provider.get_capability(&chain_graph()),
        Err(ProviderError::PartitionError(_))
    ));
}

// ── Compile & execute ──────────────────────────────────────────

#[test]
fn test_compile_binds_fused_nodes() {
    let a = Scripted::new("a", &[&[0], &[1, 2]]);
    let b = Scripted::new("b", &[&[0], &[3], &[4]]);
    let mut provider =
        ExecutionProvider::new(config(&["a", "b"]), vec![Box::new(a), Box::new(b)]).unwrap();
    let set = provider.get_capability(&chain_graph()).unwrap();

    let mut fused = fused_nodes(&set, 5);
    fused.push(Node::new(9, "foreign", "OtherProviderOp"));
    let entries = provider.compile(&fused).unwrap();
    assert_eq!(entries.len(), 4);

    let bound: Vec<(usize, usize)> = entries
        .iter()
        .map(|e| (e.compiler_rank(), e.index()))
        .collect();
    assert_eq!(bound, vec![(0, 0), (0, 1), (1, 1), (1, 2)]);

    // Rank 1, unit 2 marks with its position.
    let entry = &entries[3];
    let mut slot = entry.create_state();
    assert!(!slot.is_instantiated());
    let mut ctx = KernelContext::new(vec![vec![7]]);
    entry.compute(&mut slot, &mut ctx).unwrap();
    assert!(slot.is_instantiated());
    assert_eq!(ctx.output(0), Some(&[7u8, 2][..]));

    entry.release_state(slot);
    let stats = entry.stats();
    assert_eq!(stats.instantiations, 1);
    assert_eq!(stats.releases, 1);
}

#[test]
fn test_compile_without_rank_uses_accepted_ranks() {
    let a = Scripted::new("a", &[&[0]]);
    let b = Scripted::new("b", &[&[0], &[3]]);
    let mut provider =
        ExecutionProvider::new(config(&["a", "b"]), vec![Box::new(a), Box::new(b)]).unwrap();
    let set = provider.get_capability(&chain_graph()).unwrap();
    assert_eq!(groups(&set), vec![vec![0], vec![3]]);

    let mut fused = fused_nodes(&set, 5);
    for node in &mut fused {
        node.attributes.remove(COMPILER_RANK_ATTR);
    }
    let entries = provider.compile(&fused).unwrap();
    // Without a rank both fused nodes resolve in rank 0 first; index 1
    // only exists in rank 1.
    assert_eq!(entries[0].compiler_rank(), 0);
    assert_eq!(entries[1].compiler_rank(), 1);
    assert_eq!(entries[1].index(), 1);
}

#[test]
fn test_compile_unknown_unit() {
    let mut provider = ExecutionProvider::new(
        config(&["a"]),
        vec![Box::new(Scripted::new("a", &[&[0]]))],
    )
    .unwrap();
    let set = provider.get_capability(&chain_graph()).unwrap();

    let mut fused = fused_nodes(&set, 5);
    fused[0]
        .attributes
        .insert(capability::INDEX_ATTR.into(), 7i64.into());
    match provider.compile(&fused) {
        Err(ProviderError::UnknownUnit { index, rank, .. }) => {
            assert_eq!(index, 7);
            assert_eq!(rank, Some(0));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_untouched_state_release_is_noop() {
    let mut provider = ExecutionProvider::new(
        config(&["a"]),
        vec![Box::new(Scripted::new("a", &[&[0, 1]]))],
    )
    .unwrap();
    let set = provider.get_capability(&chain_graph()).unwrap();
    let entries = provider.compile(&fused_nodes(&set, 5)).unwrap();

    let slot = entries[0].create_state();
    entries[0].release_state(slot);
    drop(entries[0].create_state());
    let stats = entries[0].stats();
    assert_eq!(stats.instantiations, 0);
    assert_eq!(stats.releases, 0);
}

#[tokio::test]
async fn test_concurrent_compute_across_partitions() {
    let a = Scripted::new("a", &[&[0], &[1, 2], &[3, 4]]);
    let mut provider = ExecutionProvider::new(config(&["a"]), vec![Box::new(a)]).unwrap();
    let set = provider.get_capability(&chain_graph()).unwrap();
    let entries = provider.compile(&fused_nodes(&set, 5)).unwrap();
    assert_eq!(entries.len(), 3);

    let mut handles = Vec::new();
    for entry in &entries {
        for worker in 0..4u8 {
            let entry = entry.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                let mut slot = entry.create_state();
                let mut last = Vec::new();
                for _ in 0..10 {
                    let mut ctx = KernelContext::new(vec![vec![worker]]);
                    entry.compute(&mut slot, &mut ctx).unwrap();
                    last = ctx.into_outputs().remove(0);
                }
                entry.release_state(slot);
                (entry.index(), last)
            }));
        }
    }

    for handle in handles {
        let (index, output) = handle.await.unwrap();
        assert_eq!(output.len(), 2);
        assert_eq!(output[1], index as u8);
    }

    for entry in &entries {
        let stats = entry.stats();
        assert_eq!(stats.instantiations, 4);
        assert_eq!(stats.releases, 4);
        assert_eq!(stats.computes, 40);
        assert_eq!(stats.live_instances(), 0);
    }
}

// ── Context model cache ────────────────────────────────────────

fn write_model(dir: &Path, ops: &[&str]) -> std::path::PathBuf {
    let path = dir.join("net.json");
    GraphManifest::from_graph(&chain(ops)).to_file(&path).unwrap();
    path
}

fn cached_provider(mode: EmbedMode) -> (ExecutionProvider, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let source = Counting::new(OpSetCompiler::new("xc", ["Conv", "Relu", "Mul"]).with_version("1.0"));
    let (proposes, restores) = (source.proposes.clone(), source.restores.clone());
    let mut config = config(&["xc"]);
    config.cache.enabled = true;
    config.cache.embed_mode = mode;
    let provider = ExecutionProvider::new(config, vec![Box::new(source)]).unwrap();
    (provider, proposes, restores)
}

fn roundtrip(mode: EmbedMode) {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(dir.path(), &["Conv", "Relu", "Add", "Mul", "Sigmoid"]);

    let (mut first, proposes, _) = cached_provider(mode);
    let graph = GraphLoader::load(&model).unwrap();
    let discovered = first.get_capability(&graph).unwrap();
    assert_eq!(groups(&discovered), vec![vec![0, 1], vec![3]]);
    assert_eq!(proposes.load(Ordering::SeqCst), 1);
    assert!(dir.path().join("net_ctx.json").exists());
    assert_eq!(
        dir.path().join("net_ctx_cache.bin").exists(),
        mode == EmbedMode::External
    );

    let (mut second, proposes, restores) = cached_provider(mode);
    let reloaded = GraphLoader::load(&model).unwrap();
    let restored = second.get_capability(&reloaded).unwrap();
    assert_eq!(restored, discovered);
    assert_eq!(proposes.load(Ordering::SeqCst), 0);
    assert_eq!(restores.load(Ordering::SeqCst), 1);

    let entries = second.compile(&fused_nodes(&restored, 5)).unwrap();
    assert_eq!(entries.len(), 2);
    let mut slot = entries[0].create_state();
    let mut ctx = KernelContext::new(vec![vec![1, 2, 3]]);
    entries[0].compute(&mut slot, &mut ctx).unwrap();
    assert_eq!(ctx.output(0), Some(&[1u8, 2, 3][..]));
}

#[test]
fn test_cache_roundtrip_embedded() {
    roundtrip(EmbedMode::Embedded);
}

#[test]
fn test_cache_roundtrip_external() {
    roundtrip(EmbedMode::External);
}

#[test]
fn test_changed_graph_misses_cache() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(dir.path(), &["Conv", "Relu", "Add", "Mul", "Sigmoid"]);

    let (mut first, _, _) = cached_provider(EmbedMode::Embedded);
    first.get_capability(&GraphLoader::load(&model).unwrap()).unwrap();

    // Same file, different operator: the stored signature no longer matches.
    write_model(dir.path(), &["Conv", "Relu", "Mul", "Mul", "Sigmoid"]);
    let (mut second, proposes, restores) = cached_provider(EmbedMode::Embedded);
    let set = second
        .get_capability(&GraphLoader::load(&model).unwrap())
        .unwrap();
    assert_eq!(groups(&set), vec![vec![0, 1, 2, 3]]);
    assert_eq!(proposes.load(Ordering::SeqCst), 1);
    assert_eq!(restores.load(Ordering::SeqCst), 0);
}

#[test]
fn test_corrupt_context_model_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(dir.path(), &["Conv", "Relu", "Add", "Mul", "Sigmoid"]);
    std::fs::write(dir.path().join("net_ctx.json"), r#"{"name":"x","nodes":[]}"#).unwrap();

    let (mut provider, proposes, _) = cached_provider(EmbedMode::Embedded);
    let set = provider
        .get_capability(&GraphLoader::load(&model).unwrap())
        .unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(proposes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_version_change_misses_cache() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(dir.path(), &["Conv", "Relu", "Add", "Mul", "Sigmoid"]);

    let (mut first, _, _) = cached_provider(EmbedMode::Embedded);
    first.get_capability(&GraphLoader::load(&model).unwrap()).unwrap();

    let source = Counting::new(OpSetCompiler::new("xc", ["Conv", "Relu", "Mul"]).with_version("2.0"));
    let proposes = source.proposes.clone();
    let mut config = config(&["xc"]);
    config.cache.enabled = true;
    let mut second = ExecutionProvider::new(config, vec![Box::new(source)]).unwrap();
    second
        .get_capability(&GraphLoader::load(&model).unwrap())
        .unwrap();
    assert_eq!(proposes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cache_without_model_path_still_partitions() {
    let (mut provider, proposes, _) = cached_provider(EmbedMode::Embedded);
    let set = provider.get_capability(&chain_graph()).unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(proposes.load(Ordering::SeqCst), 1);
}
