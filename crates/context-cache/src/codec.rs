// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Encoding of cache entries as EPContext graphs.
//!
//! An entry becomes one context node per accepted partition. The first
//! node is the main node and carries the compiled artifact, either
//! hex-encoded inline or as the name of a file next to the context model.
//! Every node carries its capability and the graph signature in `notes`.

use crate::node::{
    EmbedMode, EMBED_MODE, EP_CACHE_CONTEXT, EP_CONTEXT_DOMAIN, EP_CONTEXT_OP, EP_SDK_VERSION,
    MAIN_CONTEXT, NOTES, ONNX_MODEL_FILENAME, PARTITION_NAME, SOURCE,
};
use crate::{location, CacheError, GraphSignature};
use capability::{Capability, PartitionSet};
use graph_ir::graph::Validated;
use graph_ir::{AttributeValue, Graph, GraphManifest, ManifestNode};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Everything needed to skip discovery for one graph.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Signature of the pre-partition graph.
    pub signature: GraphSignature,
    /// The accepted partitions.
    pub partitions: PartitionSet,
    /// Opaque compiled artifact.
    pub artifact: Vec<u8>,
    /// Compiler version tag.
    pub compiler_version: String,
    /// File name of the original model.
    pub model_file_name: String,
}

impl CacheEntry {
    /// Builds an entry for `graph`, computing its signature.
    pub fn for_graph(
        graph: &Graph<Validated>,
        partitions: PartitionSet,
        artifact: Vec<u8>,
        compiler_version: impl Into<String>,
    ) -> Self {
        let model_file_name = graph
            .model_path()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            signature: GraphSignature::of(graph),
            partitions,
            artifact,
            compiler_version: compiler_version.into(),
            model_file_name,
        }
    }
}

/// An artifact that lives in its own file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalArtifact {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// An encoded entry, ready to be written.
#[derive(Debug, Clone)]
pub struct EncodedContext {
    pub manifest: GraphManifest,
    pub external: Option<ExternalArtifact>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct Notes {
    signature: GraphSignature,
    #[serde(default)]
    capability: Option<Capability>,
}

/// Converts [`CacheEntry`] values to and from context manifests.
#[derive(Debug, Clone)]
pub struct ContextCodec {
    source: String,
    embed_mode: EmbedMode,
}

impl ContextCodec {
    /// `source` names the provider recorded on each node.
    pub fn new(source: impl Into<String>, embed_mode: EmbedMode) -> Self {
        Self {
            source: source.into(),
            embed_mode,
        }
    }

    pub fn embed_mode(&self) -> EmbedMode {
        self.embed_mode
    }

    /// Encodes `entry` for a context model written to `context_path`.
    ///
    /// An empty partition set still produces a main node so the artifact
    /// and signature survive.
    pub fn encode(&self, entry: &CacheEntry, context_path: &Path) -> Result<EncodedContext, CacheError> {
        let (cache_context, external) = match self.embed_mode {
            EmbedMode::Embedded => (hex::encode(&entry.artifact), None),
            EmbedMode::External => {
                let file_name = location::artifact_file_name(Path::new(&entry.model_file_name));
                let path = location::artifact_path(context_path, Path::new(&entry.model_file_name));
                (
                    file_name,
                    Some(ExternalArtifact {
                        path,
                        bytes: entry.artifact.clone(),
                    }),
                )
            }
        };

        let mut nodes = Vec::with_capacity(entry.partitions.len().max(1));
        let capabilities: Vec<Option<&Capability>> = if entry.partitions.is_empty() {
            vec![None]
        } else {
            entry.partitions.iter().map(Some).collect()
        };

        for (i, capability) in capabilities.into_iter().enumerate() {
            let is_main = i == 0;
            let notes = serde_json::to_string(&Notes {
                signature: entry.signature.clone(),
                capability: capability.cloned(),
            })?;

            let mut attributes = BTreeMap::new();
            attributes.insert(MAIN_CONTEXT.to_string(), AttributeValue::Int(i64::from(is_main)));
            attributes.insert(EMBED_MODE.to_string(), AttributeValue::Int(self.embed_mode.as_attr()));
            attributes.insert(
                PARTITION_NAME.to_string(),
                AttributeValue::Str(capability.map(|c| c.id.clone()).unwrap_or_default()),
            );
            attributes.insert(SOURCE.to_string(), AttributeValue::Str(self.source.clone()));
            attributes.insert(NOTES.to_string(), AttributeValue::Str(notes));
            if is_main {
                attributes.insert(
                    EP_CACHE_CONTEXT.to_string(),
                    AttributeValue::Str(cache_context.clone()),
                );
                attributes.insert(
                    EP_SDK_VERSION.to_string(),
                    AttributeValue::Str(entry.compiler_version.clone()),
                );
                attributes.insert(
                    ONNX_MODEL_FILENAME.to_string(),
                    AttributeValue::Str(entry.model_file_name.clone()),
                );
            }

            let (inputs, outputs) = capability
                .and_then(|c| c.sub_graph.meta_def.as_ref())
                .map(|m| (m.inputs.clone(), m.outputs.clone()))
                .unwrap_or_default();

            nodes.push(ManifestNode {
                name: format!("ep_context_{i}"),
                op_type: EP_CONTEXT_OP.to_string(),
                domain: EP_CONTEXT_DOMAIN.to_string(),
                inputs,
                outputs,
                attributes,
            });
        }

        let name = Path::new(&entry.model_file_name)
            .file_stem()
            .map(|s| format!("{}_ctx", s.to_string_lossy()))
            .unwrap_or_else(|| "ctx".to_string());

        Ok(EncodedContext {
            manifest: GraphManifest {
                name,
                is_subgraph: false,
                inputs: Vec::new(),
                outputs: Vec::new(),
                nodes,
            },
            external,
        })
    }

    /// Decodes a context manifest read from `context_path`.
    ///
    /// External artifacts are read from the context model's directory.
    pub fn decode(manifest: &GraphManifest, context_path: &Path) -> Result<CacheEntry, CacheError> {
        validate_context_nodes(&manifest.nodes)?;
        let main = &manifest.nodes[0];

        let embed_mode = EmbedMode::from_attr(int_attr(main, EMBED_MODE)?)
            .ok_or_else(|| CacheError::malformed(&main.name, "unknown embed_mode"))?;
        let cache_context = str_attr(main, EP_CACHE_CONTEXT)?;
        let artifact = match embed_mode {
            EmbedMode::Embedded => hex::decode(cache_context)?,
            EmbedMode::External => {
                let file_name = Path::new(cache_context);
                if file_name.file_name() != Some(file_name.as_os_str()) {
                    return Err(CacheError::malformed(
                        &main.name,
                        format!("artifact reference '{cache_context}' is not a plain file name"),
                    ));
                }
                let path = match context_path.parent() {
                    Some(dir) => dir.join(file_name),
                    None => file_name.to_path_buf(),
                };
                std::fs::read(&path)?
            }
        };

        let mut signature = None;
        let mut capabilities = Vec::new();
        for node in &manifest.nodes {
            let notes: Notes = serde_json::from_str(str_attr(node, NOTES)?)?;
            let expected = signature.get_or_insert_with(|| notes.signature.clone());
            if *expected != notes.signature {
                return Err(CacheError::malformed(&node.name, "signature differs from main node"));
            }
            match notes.capability {
                Some(capability) => capabilities.push(capability),
                None if manifest.nodes.len() == 1 => {}
                None => return Err(CacheError::malformed(&node.name, "missing capability")),
            }
        }

        let signature =
            signature.ok_or_else(|| CacheError::malformed(&main.name, "missing signature"))?;

        Ok(CacheEntry {
            signature,
            partitions: PartitionSet::new(capabilities),
            artifact,
            compiler_version: str_attr(main, EP_SDK_VERSION)?.to_string(),
            model_file_name: str_attr(main, ONNX_MODEL_FILENAME)?.to_string(),
        })
    }
}

/// Checks that `nodes` form a well-formed context node set.
///
/// Every node must be an `EPContext` node in the `com.microsoft` domain
/// with the per-node attributes present. Exactly one node is the main
/// node, it comes first, and it carries the artifact attributes.
pub fn validate_context_nodes(nodes: &[ManifestNode]) -> Result<(), CacheError> {
    let Some(first) = nodes.first() else {
        return Err(CacheError::malformed("<none>", "context model has no nodes"));
    };

    for (i, node) in nodes.iter().enumerate() {
        if node.op_type != EP_CONTEXT_OP || node.domain != EP_CONTEXT_DOMAIN {
            return Err(CacheError::malformed(
                &node.name,
                format!(
                    "expected {EP_CONTEXT_DOMAIN}:{EP_CONTEXT_OP}, found '{}:{}'",
                    node.domain, node.op_type
                ),
            ));
        }
        let is_main = match int_attr(node, MAIN_CONTEXT)? {
            0 => false,
            1 => true,
            other => {
                return Err(CacheError::malformed(
                    &node.name,
                    format!("main_context must be 0 or 1, found {other}"),
                ))
            }
        };
        if is_main != (i == 0) {
            return Err(CacheError::malformed(
                &node.name,
                "exactly one main context node is required and it must come first",
            ));
        }
        int_attr(node, EMBED_MODE)?;
        str_attr(node, SOURCE)?;
        str_attr(node, PARTITION_NAME)?;
        str_attr(node, NOTES)?;
    }

    str_attr(first, EP_CACHE_CONTEXT)?;
    str_attr(first, EP_SDK_VERSION)?;
    str_attr(first, ONNX_MODEL_FILENAME)?;
    Ok(())
}

fn int_attr(node: &ManifestNode, name: &str) -> Result<i64, CacheError> {
    node.attributes
        .get(name)
        .and_then(AttributeValue::as_int)
        .ok_or_else(|| CacheError::malformed(&node.name, format!("missing integer attribute '{name}'")))
}

fn str_attr<'a>(node: &'a ManifestNode, name: &str) -> Result<&'a str, CacheError> {
    node.attributes
        .get(name)
        .and_then(AttributeValue::as_str)
        .ok_or_else(|| CacheError::malformed(&node.name, format!("missing string attribute '{name}'")))
}
