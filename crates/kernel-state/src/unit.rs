// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The backend-facing handle traits.

use crate::{BackendError, KernelContext};

/// One sub-compilation produced by a backend compiler.
///
/// Units are created during capability discovery and are immutable
/// afterwards; they are shared across threads by every compute call site
/// bound to them.
pub trait CompiledUnit: Send + Sync + std::fmt::Debug {
    /// Human-readable name of this unit.
    fn name(&self) -> &str;

    /// Creates fresh kernel state for one fused-node instantiation.
    fn instantiate(&self) -> Result<Box<dyn KernelInstance>, BackendError>;
}

/// Instantiated kernel state, exclusively owned by one [`crate::StateSlot`].
pub trait KernelInstance: Send {
    /// Runs the kernel. A failure is returned to the host unmodified.
    fn compute(&mut self, ctx: &mut KernelContext) -> Result<(), BackendError>;

    /// Tears the state down. Called at most once per instance.
    fn release(self: Box<Self>) {}
}
