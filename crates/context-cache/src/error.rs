// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for context model persistence.

use graph_ir::GraphError;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid embedded artifact: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("context manifest error: {0}")]
    Manifest(#[from] GraphError),

    /// A context node failed structural validation.
    #[error("malformed context node '{node}': {detail}")]
    MalformedContext { node: String, detail: String },

    /// Neither a context path nor a model path is available.
    #[error("graph has no model path and no context model path is configured")]
    MissingModelPath,
}

impl CacheError {
    pub(crate) fn malformed(node: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedContext {
            node: node.into(),
            detail: detail.into(),
        }
    }
}
