// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `ep inspect` command: display graph structure.

use super::truncate;
use context_cache::GraphSignature;
use graph_ir::GraphLoader;
use std::path::PathBuf;

pub async fn execute(model: PathBuf) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║                 ep · Graph Inspector                 ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let graph = GraphLoader::load(&model).map_err(|e| {
        anyhow::anyhow!("failed to load graph from '{}': {e}", model.display())
    })?;

    // ── Summary ────────────────────────────────────────────────
    println!("  Graph:     {}", graph.name);
    println!("  Nodes:     {}", graph.num_nodes());
    println!("  Edges:     {}", graph.edges().len());
    println!("  Inputs:    {}", graph.inputs.join(", "));
    println!("  Outputs:   {}", graph.outputs.join(", "));
    println!("  Subgraph:  {}", graph.is_subgraph());
    println!("  Signature: {}", GraphSignature::of(&graph));
    println!();

    // ── Per-Node Detail ────────────────────────────────────────
    println!(
        "  {:<4} {:<24} {:<18} {:<24} {:<24}",
        "Idx", "Name", "Op", "Inputs", "Outputs",
    );
    println!("  {}", "-".repeat(96));
    for node in graph.iter_nodes() {
        let op = if node.domain.is_empty() {
            node.op_type.clone()
        } else {
            format!("{}:{}", node.domain, node.op_type)
        };
        println!(
            "  {:<4} {:<24} {:<18} {:<24} {:<24}",
            node.index.get(),
            truncate(&node.name, 24),
            truncate(&op, 18),
            truncate(&node.inputs.join(","), 24),
            truncate(&node.outputs.join(","), 24),
        );
    }
    println!();

    let order: Vec<String> = graph
        .topological_order()
        .iter()
        .map(|n| n.to_string())
        .collect();
    println!("  Topological order: {}", order.join(" → "));
    println!();
    Ok(())
}
