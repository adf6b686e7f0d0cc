// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # provider
//!
//! The execution provider that partitions a graph among ranked backend
//! compilers and turns the accepted partitions into compute entry points.
//!
//! The provider takes:
//! - A validated `Graph` from `graph-ir`.
//! - One `ProposalSource` per configured compiler, in rank order.
//! - Optionally a context model written by an earlier run (`context-cache`).
//!
//! And produces a `PartitionSet` from `get_capability`, then one
//! `ComputeEntryPoint` per fused node from `compile`.
//!
//! # Concurrency
//! `get_capability` takes `&mut self` and runs sequentially, rank by rank.
//! `compile` takes `&self`; the entry points it returns own their units and
//! may be used from any number of threads, one slot per concurrent call.

pub mod arena;
mod config;
mod error;
mod provider;
mod reference;

pub use arena::{RankRecord, UnitArena};
pub use config::{CacheConfig, CompilerConfig, ProviderConfig};
pub use error::ProviderError;
pub use provider::ExecutionProvider;
pub use reference::OpSetCompiler;
