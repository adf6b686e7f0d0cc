// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! RAII state slot that releases its kernel instance on drop.
//!
//! The host owns one [`StateSlot`] per fused-node instantiation. The slot
//! starts empty; the first compute call fills it. Because the instance is
//! held in an `Option` and moved out on release, it is torn down at most
//! once, and an untouched slot releases nothing.

use crate::{BackendError, CompiledUnit, KernelInstance, UnitStats};
use std::sync::Arc;

/// Per-invocation kernel state owned by the host executor.
pub struct StateSlot {
    /// The instance. `None` until first use and after release.
    instance: Option<Box<dyn KernelInstance>>,
    /// Counters shared with the entry point that created this slot.
    stats: Arc<UnitStats>,
}

impl StateSlot {
    /// Creates an empty slot with its own counters.
    pub fn new() -> Self {
        Self::with_stats(Arc::new(UnitStats::default()))
    }

    pub(crate) fn with_stats(stats: Arc<UnitStats>) -> Self {
        Self {
            instance: None,
            stats,
        }
    }

    /// Returns `true` once an instance has been created and not yet released.
    pub fn is_instantiated(&self) -> bool {
        self.instance.is_some()
    }

    /// Returns the instance, creating it from `unit` if the slot is empty.
    pub fn get_or_instantiate(
        &mut self,
        unit: &dyn CompiledUnit,
    ) -> Result<&mut (dyn KernelInstance + 'static), BackendError> {
        let instance = match self.instance.take() {
            Some(instance) => instance,
            None => {
                let instance = unit.instantiate()?;
                self.stats.record_instantiation();
                tracing::debug!("instantiated kernel state for unit '{}'", unit.name());
                instance
            }
        };
        Ok(&mut **self.instance.insert(instance))
    }

    /// Releases the instance, if any. Calling this again is a no-op.
    pub fn release(&mut self) {
        if let Some(instance) = self.instance.take() {
            instance.release();
            self.stats.record_release();
        }
    }

    pub(crate) fn stats(&self) -> &UnitStats {
        &self.stats
    }
}

impl Default for StateSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StateSlot {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for StateSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateSlot")
            .field("instantiated", &self.instance.is_some())
            .finish()
    }
}
