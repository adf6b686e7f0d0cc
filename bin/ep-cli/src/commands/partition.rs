// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `ep partition` command: discover, merge and compile partitions.
//!
//! Demonstrates the full provider pipeline:
//! ```text
//! ExecutionProvider::new → get_capability → fused nodes → compile → compute
//! ```

use super::{build_sources, load_config, truncate};
use graph_ir::GraphLoader;
use kernel_state::KernelContext;
use provider::ExecutionProvider;
use std::path::PathBuf;

pub async fn execute(
    model: PathBuf,
    config: Option<PathBuf>,
    compilers: Vec<String>,
    run: bool,
    input_bytes: usize,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║                ep · Graph Partitioner                ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // ── Configuration ──────────────────────────────────────────
    let config = load_config(config.as_deref(), &compilers)?;
    println!("  Provider: {}", config.name);
    for (rank, compiler) in config.compilers.iter().enumerate() {
        println!(
            "   rank {rank}: {:<16} {}",
            compiler.name,
            compiler.options.to_json()
        );
    }
    println!(
        "  Cache:    {}",
        if config.cache.enabled {
            config.cache.embed_mode.to_string()
        } else {
            "disabled".to_string()
        }
    );
    println!();

    let sources = build_sources(&config)?;
    let mut provider = ExecutionProvider::new(config, sources)?;

    // ── Discovery ──────────────────────────────────────────────
    println!("  [1/3] Discovering capabilities...");
    let graph = GraphLoader::load(&model).map_err(|e| {
        anyhow::anyhow!("failed to load graph from '{}': {e}", model.display())
    })?;
    let accepted = provider.get_capability(&graph)?;
    for line in accepted.summary().lines() {
        println!("        {line}");
    }
    let unclaimed = graph.num_nodes() - accepted.covered_nodes().len();
    println!("        {unclaimed} nodes left to the host");
    println!();

    // ── Compile ────────────────────────────────────────────────
    println!("  [2/3] Compiling fused nodes...");
    let fused: Vec<_> = accepted
        .iter()
        .enumerate()
        .filter_map(|(i, cap)| cap.to_fused_node(graph.num_nodes() + i))
        .collect();
    let entries = provider.compile(&fused)?;
    println!(
        "  {:<24} {:>6} {:>6}  {:<24}",
        "Fused node", "Rank", "Unit", "Backend unit"
    );
    println!("  {}", "-".repeat(64));
    for entry in &entries {
        println!(
            "  {:<24} {:>6} {:>6}  {:<24}",
            truncate(entry.fused_node(), 24),
            entry.compiler_rank(),
            entry.index(),
            truncate(entry.unit().name(), 24),
        );
    }
    println!();

    if !run {
        println!("  [3/3] Skipped execution (pass --run to execute).");
        return Ok(());
    }

    // ── Execute ────────────────────────────────────────────────
    println!("  [3/3] Executing {} fused nodes...", entries.len());
    let mut handles = Vec::with_capacity(entries.len());
    for entry in entries.iter().cloned() {
        handles.push(tokio::task::spawn_blocking(move || {
            let mut slot = entry.create_state();
            let mut ctx = KernelContext::new(vec![vec![0u8; input_bytes]]);
            let result = entry.compute(&mut slot, &mut ctx);
            entry.release_state(slot);
            (entry, result.map(|()| ctx.into_outputs()))
        }));
    }

    let mut failures = 0usize;
    for handle in handles {
        let (entry, result) = handle.await?;
        match result {
            Ok(outputs) => {
                let bytes: usize = outputs.iter().map(Vec::len).sum();
                println!(
                    "   {:<24} ok   {bytes} output bytes",
                    truncate(entry.fused_node(), 24)
                );
            }
            Err(e) => {
                failures += 1;
                println!("   {:<24} FAIL {e}", truncate(entry.fused_node(), 24));
            }
        }
        tracing::debug!("{}: {}", entry.fused_node(), entry.stats().summary());
    }
    println!();

    if failures > 0 {
        anyhow::bail!("{failures} fused nodes failed to execute");
    }
    Ok(())
}
