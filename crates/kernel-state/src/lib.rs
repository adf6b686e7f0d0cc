// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # kernel-state
//!
//! Bridges an accepted, fused partition to a callable compute entry point
//! with a correct state lifetime.
//!
//! # Key Components
//!
//! - [`CompiledUnit`]: one backend-produced sub-compilation. Its only job is
//!   to [`instantiate`](CompiledUnit::instantiate) kernel state.
//! - [`KernelInstance`]: the instantiated state: `compute` and `release`.
//! - [`StateSlot`]: the host-owned per-invocation slot. Starts empty, is
//!   filled on first compute, and releases its instance exactly once.
//! - [`ComputeEntryPoint`]: create / compute / release hooks bound to one
//!   `(compiler rank, index)` unit.
//! - [`StateStats`]: lifecycle counters shared by all slots of an entry.
//!
//! # Ownership Model
//!
//! ```text
//! ComputeEntryPoint::compute(slot, ctx)
//!       │  slot empty?
//!       ▼
//!   CompiledUnit::instantiate()  ──► Box<dyn KernelInstance>
//!       │                                   │ owned by
//!       ▼                                   ▼
//!   KernelInstance::compute(ctx)         StateSlot
//!                                           │ drop() / release()
//!                                           ▼
//!                               KernelInstance::release()   (once)
//! ```
//!
//! # Example
//! ```
//! use kernel_state::{BackendError, CompiledUnit, ComputeEntryPoint, KernelContext, KernelInstance};
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct Echo;
//! struct EchoKernel;
//!
//! impl KernelInstance for EchoKernel {
//!     fn compute(&mut self, ctx: &mut KernelContext) -> Result<(), BackendError> {
//!         let input = ctx.input(0).unwrap_or_default().to_vec();
//!         ctx.set_output(0, input);
//!         Ok(())
//!     }
//! }
//!
//! impl CompiledUnit for Echo {
//!     fn name(&self) -> &str { "echo" }
//!     fn instantiate(&self) -> Result<Box<dyn KernelInstance>, BackendError> {
//!         Ok(Box::new(EchoKernel))
//!     }
//! }
//!
//! let entry = ComputeEntryPoint::new("fused_0", 0, 0, Arc::new(Echo));
//! let mut slot = entry.create_state();
//! let mut ctx = KernelContext::new(vec![vec![1, 2, 3]]);
//! entry.compute(&mut slot, &mut ctx).unwrap();
//! assert_eq!(ctx.output(0), Some(&[1u8, 2, 3][..]));
//! entry.release_state(slot);
//! assert_eq!(entry.stats().releases, 1);
//! ```

mod context;
mod entry;
mod error;
mod slot;
mod stats;
mod unit;

pub use context::KernelContext;
pub use entry::ComputeEntryPoint;
pub use error::BackendError;
pub use slot::StateSlot;
pub use stats::{StateStats, UnitStats};
pub use unit::{CompiledUnit, KernelInstance};
