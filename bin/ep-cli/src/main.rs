// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # ep
//!
//! Command-line interface for the partitioning execution provider.
//!
//! ## Usage
//! ```bash
//! # Inspect a graph manifest
//! ep inspect --model ./models/net.json
//!
//! # Partition with ranked compilers from a config file, then execute
//! ep --config provider.toml partition --model ./models/net.json --run
//!
//! # Partition with ad-hoc op-set compilers (rank order = argument order)
//! ep partition --model ./models/net.json --compiler xc=Conv,Relu --compiler tvm=Add
//!
//! # Show or remove the context model of a graph
//! ep cache show --model ./models/net.json
//! ep cache clear --model ./models/net.json
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ep",
    about = "Ranked graph partitioning across backend compilers",
    version,
    author
)]
struct Cli {
    /// Path to a provider TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a graph's nodes, edges, topological order and signature.
    Inspect {
        /// Path to the graph manifest.
        #[arg(short, long)]
        model: PathBuf,
    },

    /// Discover, merge and compile partitions for a graph.
    Partition {
        /// Path to the graph manifest.
        #[arg(short, long)]
        model: PathBuf,

        /// Op-set compiler as `name=Op1,Op2`; repeat in rank order.
        /// Ignored when `--config` is given.
        #[arg(long = "compiler")]
        compilers: Vec<String>,

        /// Execute every compiled partition once on a zero-filled input.
        #[arg(long)]
        run: bool,

        /// Bytes in the zero-filled input used by `--run`.
        #[arg(long, default_value_t = 16)]
        input_bytes: usize,
    },

    /// Inspect or remove the context model of a graph.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show where the context model lives and whether it is usable.
    Show {
        /// Path to the graph manifest.
        #[arg(short, long)]
        model: PathBuf,
    },

    /// Delete the context model and its external artifact.
    Clear {
        /// Path to the graph manifest.
        #[arg(short, long)]
        model: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Inspect { model } => commands::inspect::execute(model).await,
        Commands::Partition {
            model,
            compilers,
            run,
            input_bytes,
        } => commands::partition::execute(model, cli.config, compilers, run, input_bytes).await,
        Commands::Cache { action } => match action {
            CacheAction::Show { model } => commands::cache::show(model, cli.config).await,
            CacheAction::Clear { model } => commands::cache::clear(model, cli.config).await,
        },
    }
}
