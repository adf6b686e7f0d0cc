// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared helpers.

pub mod cache;
pub mod inspect;
pub mod partition;

use anyhow::Context;
use capability::{CompilerOptions, ProposalSource};
use provider::{CompilerConfig, OpSetCompiler, ProviderConfig};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .init();
}

/// Loads the provider configuration, or builds one from `name=Op1,Op2`
/// compiler specs when no file is given.
pub fn load_config(config: Option<&Path>, specs: &[String]) -> anyhow::Result<ProviderConfig> {
    if let Some(path) = config {
        return ProviderConfig::from_file(path)
            .with_context(|| format!("failed to load config '{}'", path.display()));
    }

    let mut compilers = Vec::with_capacity(specs.len());
    for spec in specs {
        let (name, ops) = spec
            .split_once('=')
            .with_context(|| format!("compiler spec '{spec}' is not of the form name=Op1,Op2"))?;
        compilers.push(CompilerConfig::new(
            name.trim(),
            CompilerOptions::new().with("ops", ops),
        ));
    }
    Ok(ProviderConfig {
        compilers,
        ..ProviderConfig::default()
    })
}

/// Builds one reference op-set compiler per configured compiler.
pub fn build_sources(config: &ProviderConfig) -> anyhow::Result<Vec<Box<dyn ProposalSource>>> {
    config
        .compilers
        .iter()
        .map(|c| {
            OpSetCompiler::from_options(&c.name, &c.options)
                .map(|s| Box::new(s) as Box<dyn ProposalSource>)
                .map_err(anyhow::Error::from)
        })
        .collect()
}

/// Truncates a string to `max_len` with ellipsis if needed.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
