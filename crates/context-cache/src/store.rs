// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reading and writing context models on disk.

use crate::{location, CacheEntry, CacheError, ContextCodec, EmbedMode, GraphSignature};
use graph_ir::graph::Validated;
use graph_ir::{Graph, GraphManifest};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Context model persistence for one provider.
#[derive(Debug, Clone)]
pub struct ContextCache {
    codec: ContextCodec,
    configured_path: Option<PathBuf>,
}

impl ContextCache {
    /// `configured_path` overrides the default `<model stem>_ctx.json` location.
    pub fn new(source: impl Into<String>, embed_mode: EmbedMode, configured_path: Option<PathBuf>) -> Self {
        Self {
            codec: ContextCodec::new(source, embed_mode),
            configured_path,
        }
    }

    /// Where the context model for `graph` lives.
    pub fn context_path(&self, graph: &Graph<Validated>) -> Result<PathBuf, CacheError> {
        location::context_model_path(self.configured_path.as_deref(), graph.model_path())
    }

    /// Loads the entry for `graph`.
    ///
    /// Returns `Ok(None)` when no context model exists, when it is
    /// malformed, or when its signature does not match `graph`. Only an
    /// unresolvable location is an error.
    pub fn load(&self, graph: &Graph<Validated>) -> Result<Option<CacheEntry>, CacheError> {
        let path = self.context_path(graph)?;
        if !path.exists() {
            debug!(path = %path.display(), "No context model found");
            return Ok(None);
        }

        let entry = match read_entry(&path) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring malformed context model");
                return Ok(None);
            }
        };

        let signature = GraphSignature::of(graph);
        if entry.signature != signature {
            warn!(
                path = %path.display(),
                cached = %entry.signature,
                current = %signature,
                "Context model was built for a different graph, ignoring"
            );
            return Ok(None);
        }

        info!(
            path = %path.display(),
            partitions = entry.partitions.len(),
            "Loaded context model"
        );
        Ok(Some(entry))
    }

    /// Writes `entry` as the context model for `graph`.
    ///
    /// Returns the path of the written context model.
    pub fn store(&self, graph: &Graph<Validated>, entry: &CacheEntry) -> Result<PathBuf, CacheError> {
        let path = self.context_path(graph)?;
        let encoded = self.codec.encode(entry, &path)?;

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        if let Some(external) = &encoded.external {
            std::fs::write(&external.path, &external.bytes)?;
            debug!(
                path = %external.path.display(),
                bytes = external.bytes.len(),
                "Wrote external artifact"
            );
        }
        encoded.manifest.to_file(&path)?;

        info!(
            path = %path.display(),
            mode = %self.codec.embed_mode(),
            partitions = entry.partitions.len(),
            "Stored context model"
        );
        Ok(path)
    }
}

fn read_entry(path: &Path) -> Result<CacheEntry, CacheError> {
    let manifest = GraphManifest::from_file(path)?;
    ContextCodec::decode(&manifest, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use capability::{Capability, PartitionSet};
    use graph_ir::{Node, NodeIndex};

    fn graph_at(model_path: &Path, last_op: &str) -> Graph<Validated> {
        let nodes = vec![
            Node::new(0, "a", "Add").with_args(["x"], ["a"]),
            Node::new(1, "b", last_op).with_args(["a"], ["y"]),
        ];
        Graph::new("g", nodes)
            .with_io(vec!["x".into()], vec!["y".into()])
            .with_model_path(model_path)
            .validate()
            .unwrap()
    }

    fn entry_for(graph: &Graph<Validated>) -> CacheEntry {
        let partitions = PartitionSet::new(vec![
            Capability::new("xc:0", 0, vec![NodeIndex(0)]),
            Capability::new("xc:1", 0, vec![NodeIndex(1)]),
        ]);
        CacheEntry::for_graph(graph, partitions, b"compiled".to_vec(), "2.0")
    }

    #[test]
    fn test_missing_context_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let graph = graph_at(&dir.path().join("net.json"), "Relu");
        let cache = ContextCache::new("ep", EmbedMode::Embedded, None);
        assert!(cache.load(&graph).unwrap().is_none());
    }

    #[test]
    fn test_embedded_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let graph = graph_at(&dir.path().join("net.json"), "Relu");
        let cache = ContextCache::new("ep", EmbedMode::Embedded, None);

        let path = cache.store(&graph, &entry_for(&graph)).unwrap();
        assert_eq!(path, dir.path().join("net_ctx.json"));
        assert!(!dir.path().join("net_ctx_cache.bin").exists());

        let loaded = cache.load(&graph).unwrap().unwrap();
        assert_eq!(loaded, entry_for(&graph));
    }

    #[test]
    fn test_external_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let graph = graph_at(&dir.path().join("net.json"), "Relu");
        let cache = ContextCache::new("ep", EmbedMode::External, None);

        cache.store(&graph, &entry_for(&graph)).unwrap();
        let artifact = std::fs::read(dir.path().join("net_ctx_cache.bin")).unwrap();
        assert_eq!(artifact, b"compiled");

        let loaded = cache.load(&graph).unwrap().unwrap();
        assert_eq!(loaded.artifact, b"compiled");
        assert_eq!(loaded.partitions, entry_for(&graph).partitions);
    }

    #[test]
    fn test_configured_path_in_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let graph = graph_at(&dir.path().join("net.json"), "Relu");
        let configured = dir.path().join("cache").join("custom.json");
        let cache = ContextCache::new("ep", EmbedMode::External, Some(configured.clone()));

        assert_eq!(cache.store(&graph, &entry_for(&graph)).unwrap(), configured);
        assert!(dir.path().join("cache").join("net_ctx_cache.bin").exists());
        assert!(cache.load(&graph).unwrap().is_some());
    }

    #[test]
    fn test_signature_mismatch_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("net.json");
        let cache = ContextCache::new("ep", EmbedMode::Embedded, None);

        let original = graph_at(&model, "Relu");
        cache.store(&original, &entry_for(&original)).unwrap();

        let changed = graph_at(&model, "Sigmoid");
        assert!(cache.load(&changed).unwrap().is_none());
    }

    #[test]
    fn test_garbage_file_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let graph = graph_at(&dir.path().join("net.json"), "Relu");
        std::fs::write(dir.path().join("net_ctx.json"), "{ not json").unwrap();

        let cache = ContextCache::new("ep", EmbedMode::Embedded, None);
        assert!(cache.load(&graph).unwrap().is_none());
    }

    #[test]
    fn test_missing_external_artifact_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let graph = graph_at(&dir.path().join("net.json"), "Relu");
        let cache = ContextCache::new("ep", EmbedMode::External, None);

        cache.store(&graph, &entry_for(&graph)).unwrap();
        std::fs::remove_file(dir.path().join("net_ctx_cache.bin")).unwrap();
        assert!(cache.load(&graph).unwrap().is_none());
    }

    #[test]
    fn test_no_model_path_is_error() {
        let graph = Graph::new("g", vec![Node::new(0, "a", "Add")])
            .validate()
            .unwrap();
        let cache = ContextCache::new("ep", EmbedMode::Embedded, None);
        assert!(matches!(cache.load(&graph), Err(CacheError::MissingModelPath)));
    }
}
