// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Graph loading from a JSON manifest file.
//!
//! The loaded graph remembers the path it came from; the context cache
//! derives its file locations from it.

use crate::graph::Validated;
use crate::{Graph, GraphError, GraphManifest};
use std::path::Path;

/// Loads a graph from disk into a validated [`Graph`].
///
/// # Example
/// ```no_run
/// use graph_ir::GraphLoader;
/// use std::path::Path;
///
/// let graph = GraphLoader::load(Path::new("./models/tiny-cnn.json")).unwrap();
/// println!("Loaded {} nodes", graph.num_nodes());
/// ```
pub struct GraphLoader;

impl GraphLoader {
    /// Loads and validates a graph from a manifest file.
    ///
    /// Steps:
    /// 1. Parse the manifest and validate it.
    /// 2. Build the [`Graph`], recording `path` as its model path.
    /// 3. Validate the graph (indices, producers, acyclicity).
    pub fn load(path: &Path) -> Result<Graph<Validated>, GraphError> {
        let manifest = GraphManifest::from_file(path)?;
        Self::from_manifest(manifest, Some(path))
    }

    /// Builds a validated graph from an in-memory manifest.
    pub fn from_manifest(
        manifest: GraphManifest,
        model_path: Option<&Path>,
    ) -> Result<Graph<Validated>, GraphError> {
        manifest.validate()?;
        let mut graph = manifest.into_graph();
        if let Some(path) = model_path {
            graph = graph.with_model_path(path);
        }
        let graph = graph.validate()?;
        tracing::debug!("{}", graph.summary());
        Ok(graph)
    }
}
