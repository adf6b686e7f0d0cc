// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # capability
//!
//! Candidate partitions ("capabilities"), the backend compilers that
//! propose them, and the rule that merges ranked proposals into one
//! accepted set.
//!
//! # Merge Rule
//!
//! | Lower-ranked candidate | Outcome |
//! |---|---|
//! | single node, already claimed | dropped |
//! | single node, unclaimed | accepted, node claimed |
//! | multiple nodes | accepted unconditionally |
//!
//! Multi-node partitions are never split or dropped, so a node may end up
//! in a multi-node partition and a single-node partition at once. The
//! host resolves such overlaps by execution order; [`PartitionSet::overlapping_nodes`]
//! reports them.
//!
//! # Trait-Based Extensibility
//!
//! Backends implement [`ProposalSource`]:
//!
//! ```ignore
//! struct MyCompiler;
//! impl ProposalSource for MyCompiler {
//!     fn name(&self) -> &str { "my-compiler" }
//!     fn propose(&self, graph: &Graph<Validated>, options: &CompilerOptions)
//!         -> Result<Proposal, BackendError> { /* ... */ }
//! }
//! ```

mod capability;
mod error;
pub mod merge;
mod set;
mod source;

pub use capability::{Capability, IndexedSubGraph, MetaDef, COMPILER_RANK_ATTR, INDEX_ATTR};
pub use error::PartitionError;
pub use merge::{merge_capabilities, merge_ranked};
pub use set::PartitionSet;
pub use source::{CompilerOptions, Proposal, ProposalSource, ProposedPartition};
