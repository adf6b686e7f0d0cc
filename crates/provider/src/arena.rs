// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-rank storage of compiled units.
//!
//! One record per compiler rank, written once during capability discovery
//! and never resized afterwards. Compile clones the `Arc`s out of it, so
//! compute calls never touch the arena.

use graph_ir::GraphId;
use kernel_state::CompiledUnit;
use std::sync::Arc;

/// Units produced by one compiler for one graph.
#[derive(Debug)]
pub struct RankRecord {
    graph: GraphId,
    units: Box<[Arc<dyn CompiledUnit>]>,
    artifact: Option<Vec<u8>>,
}

impl RankRecord {
    pub fn new(graph: GraphId, units: Vec<Arc<dyn CompiledUnit>>, artifact: Option<Vec<u8>>) -> Self {
        Self {
            graph,
            units: units.into_boxed_slice(),
            artifact,
        }
    }

    /// The graph instance these units were compiled for.
    pub fn graph(&self) -> GraphId {
        self.graph
    }

    pub fn units(&self) -> &[Arc<dyn CompiledUnit>] {
        &self.units
    }

    /// The compiler's opaque artifact, if it produced one.
    pub fn artifact(&self) -> Option<&[u8]> {
        self.artifact.as_deref()
    }
}

/// Fixed-length arena of [`RankRecord`]s indexed by compiler rank.
#[derive(Debug)]
pub struct UnitArena {
    ranks: Box<[Option<RankRecord>]>,
}

impl UnitArena {
    pub fn new(num_ranks: usize) -> Self {
        Self {
            ranks: (0..num_ranks).map(|_| None).collect(),
        }
    }

    pub fn num_ranks(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_populated(&self, rank: usize) -> bool {
        matches!(self.ranks.get(rank), Some(Some(_)))
    }

    /// Stores the record for `rank`.
    ///
    /// Returns the record back if the rank is out of range or already
    /// populated; an existing record is never replaced.
    pub fn populate(&mut self, rank: usize, record: RankRecord) -> Result<(), RankRecord> {
        match self.ranks.get_mut(rank) {
            Some(slot @ None) => {
                *slot = Some(record);
                Ok(())
            }
            _ => Err(record),
        }
    }

    pub fn record(&self, rank: usize) -> Option<&RankRecord> {
        self.ranks.get(rank).and_then(Option::as_ref)
    }

    /// The unit at `(rank, index)`.
    pub fn unit(&self, rank: usize, index: usize) -> Option<&Arc<dyn CompiledUnit>> {
        self.record(rank).and_then(|r| r.units.get(index))
    }

    /// Total number of units across all ranks.
    pub fn num_units(&self) -> usize {
        self.ranks.iter().flatten().map(|r| r.units.len()).sum()
    }
}
