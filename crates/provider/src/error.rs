// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the execution provider.

/// Errors surfaced by [`crate::ExecutionProvider`].
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Invalid configuration; fatal to provider construction.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The host graph could not be loaded.
    #[error("graph error: {0}")]
    GraphError(#[from] graph_ir::GraphError),

    /// A backend returned a structurally invalid partition.
    #[error("partition error: {0}")]
    PartitionError(#[from] capability::PartitionError),

    /// Context model persistence failed.
    #[error("cache error: {0}")]
    CacheError(#[from] context_cache::CacheError),

    /// A backend failure, passed through unmodified.
    #[error(transparent)]
    Backend(#[from] kernel_state::BackendError),

    /// A fused node names a unit this provider never produced.
    #[error("fused node '{node}' references unknown unit {index} (rank {rank:?})")]
    UnknownUnit {
        node: String,
        rank: Option<i64>,
        index: i64,
    },
}
