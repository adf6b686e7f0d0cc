// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Compute entry points handed to the host executor.
//!
//! Binding happens at compile time and only records which unit a fused
//! node maps to. Kernel state is created lazily by the first
//! [`ComputeEntryPoint::compute`] on a slot.

use crate::{BackendError, CompiledUnit, KernelContext, StateSlot, StateStats, UnitStats};
use std::sync::Arc;

/// Create / compute / release hooks for one fused node.
///
/// Cloning is cheap; clones share the unit and the counters.
#[derive(Clone)]
pub struct ComputeEntryPoint {
    fused_node: String,
    compiler_rank: usize,
    index: usize,
    unit: Arc<dyn CompiledUnit>,
    stats: Arc<UnitStats>,
}

impl ComputeEntryPoint {
    /// Binds `fused_node` to the unit at `(compiler_rank, index)`.
    pub fn new(
        fused_node: impl Into<String>,
        compiler_rank: usize,
        index: usize,
        unit: Arc<dyn CompiledUnit>,
    ) -> Self {
        Self {
            fused_node: fused_node.into(),
            compiler_rank,
            index,
            unit,
            stats: Arc::new(UnitStats::default()),
        }
    }

    /// Name of the fused node this entry point serves.
    pub fn fused_node(&self) -> &str {
        &self.fused_node
    }

    /// Rank of the compiler that produced the bound unit.
    pub fn compiler_rank(&self) -> usize {
        self.compiler_rank
    }

    /// Position of the bound unit in its compiler's result list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The bound unit.
    pub fn unit(&self) -> &Arc<dyn CompiledUnit> {
        &self.unit
    }

    /// Create hook: returns an empty slot for the host to own.
    pub fn create_state(&self) -> StateSlot {
        StateSlot::with_stats(Arc::clone(&self.stats))
    }

    /// Compute hook: instantiates the slot on first use, then forwards to
    /// the instance. Failures are returned exactly as the backend raised them.
    pub fn compute(&self, slot: &mut StateSlot, ctx: &mut KernelContext) -> Result<(), BackendError> {
        let instance = slot.get_or_instantiate(self.unit.as_ref())?;
        let result = instance.compute(ctx);
        self.stats.record_compute(result.is_ok());
        if let Err(e) = &result {
            tracing::debug!("compute for '{}' failed: {e}", self.fused_node);
        }
        result
    }

    /// Release hook: tears the slot's instance down, if it has one.
    pub fn release_state(&self, mut slot: StateSlot) {
        slot.release();
    }

    /// Returns the lifecycle counters of all slots created by this entry.
    pub fn stats(&self) -> StateStats {
        self.stats.snapshot()
    }
}

impl std::fmt::Debug for ComputeEntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeEntryPoint")
            .field("fused_node", &self.fused_node)
            .field("compiler_rank", &self.compiler_rank)
            .field("index", &self.index)
            .field("unit", &self.unit.name())
            .finish()
    }
}
