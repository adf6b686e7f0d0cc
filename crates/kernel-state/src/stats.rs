// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Kernel-state lifecycle statistics.
//!
//! [`UnitStats`] is shared by every slot created from one entry point.
//! Compute calls on different slots may run concurrently, so the counters
//! are atomics rather than a `Mutex`.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live lifecycle counters for one compute entry point.
#[derive(Debug, Default)]
pub struct UnitStats {
    instantiations: AtomicU64,
    releases: AtomicU64,
    computes: AtomicU64,
    compute_failures: AtomicU64,
}

impl UnitStats {
    pub(crate) fn record_instantiation(&self) {
        self.instantiations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_release(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_compute(&self, ok: bool) {
        self.computes.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.compute_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Takes a point-in-time copy of the counters.
    pub fn snapshot(&self) -> StateStats {
        StateStats {
            instantiations: self.instantiations.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            computes: self.computes.load(Ordering::Relaxed),
            compute_failures: self.compute_failures.load(Ordering::Relaxed),
        }
    }
}

/// A snapshot of [`UnitStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StateStats {
    /// Kernel instances created.
    pub instantiations: u64,
    /// Kernel instances torn down.
    pub releases: u64,
    /// Compute calls, successful or not.
    pub computes: u64,
    /// Compute calls that returned a backend failure.
    pub compute_failures: u64,
}

impl StateStats {
    /// Instances currently alive.
    pub fn live_instances(&self) -> u64 {
        self.instantiations.saturating_sub(self.releases)
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "States: {} created, {} released, {} live; {} computes ({} failed)",
            self.instantiations,
            self.releases,
            self.live_instances(),
            self.computes,
            self.compute_failures,
        )
    }
}
