// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `ep cache` commands: inspect or remove a graph's context model.
//!
//! The context model location follows the provider configuration when
//! `--config` is given, and the `<model stem>_ctx.json` default otherwise.

use anyhow::Context;
use context_cache::{artifact_path, ContextCache, GraphSignature};
use graph_ir::graph::Validated;
use graph_ir::{Graph, GraphLoader};
use provider::ProviderConfig;
use std::path::{Path, PathBuf};

fn open(model: &Path, config: Option<&Path>) -> anyhow::Result<(ContextCache, Graph<Validated>)> {
    let config = match config {
        Some(path) => ProviderConfig::from_file(path)?,
        None => ProviderConfig::default(),
    };
    let graph = GraphLoader::load(model)
        .with_context(|| format!("failed to load graph from '{}'", model.display()))?;
    let cache = ContextCache::new(
        config.name,
        config.cache.embed_mode,
        config.cache.context_model_path,
    );
    Ok((cache, graph))
}

pub async fn show(model: PathBuf, config: Option<PathBuf>) -> anyhow::Result<()> {
    let (cache, graph) = open(&model, config.as_deref())?;
    let context_path = cache.context_path(&graph)?;

    println!("  Model:         {}", model.display());
    println!("  Context model: {}", context_path.display());
    println!("  Signature:     {}", GraphSignature::of(&graph));

    if !context_path.exists() {
        println!("  Status:        absent");
        return Ok(());
    }

    match cache.load(&graph)? {
        Some(entry) => {
            println!("  Status:        valid");
            println!("  Compilers:     {}", entry.compiler_version);
            println!("  Artifact:      {} bytes", entry.artifact.len());
            for line in entry.partitions.summary().lines() {
                println!("   {line}");
            }
        }
        None => println!("  Status:        stale or malformed (will be rebuilt)"),
    }
    Ok(())
}

pub async fn clear(model: PathBuf, config: Option<PathBuf>) -> anyhow::Result<()> {
    let (cache, graph) = open(&model, config.as_deref())?;
    let context_path = cache.context_path(&graph)?;

    let mut removed = 0;
    for path in [context_path.clone(), artifact_path(&context_path, &model)] {
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to remove '{}'", path.display()))?;
            println!("  removed {}", path.display());
            removed += 1;
        }
    }
    if removed == 0 {
        println!("  nothing to remove for {}", model.display());
    }
    Ok(())
}
