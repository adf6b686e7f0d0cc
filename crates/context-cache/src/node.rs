// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! EPContext node vocabulary.

use std::fmt;
use std::str::FromStr;

/// Operator type of every context node.
pub const EP_CONTEXT_OP: &str = "EPContext";
/// Domain of every context node.
pub const EP_CONTEXT_DOMAIN: &str = "com.microsoft";

/// `1` on the first context node, `0` on the rest.
pub const MAIN_CONTEXT: &str = "main_context";
/// Hex-encoded artifact, or the artifact file name in external mode.
pub const EP_CACHE_CONTEXT: &str = "ep_cache_context";
/// `1` if the artifact is embedded, `0` if it is an external file.
pub const EMBED_MODE: &str = "embed_mode";
/// Identifier of the partition the node stands for.
pub const PARTITION_NAME: &str = "partition_name";
/// Name of the provider that wrote the entry.
pub const SOURCE: &str = "source";
/// Compiler version tag.
pub const EP_SDK_VERSION: &str = "ep_sdk_version";
/// File name of the original (pre-partition) model.
pub const ONNX_MODEL_FILENAME: &str = "onnx_model_filename";
/// JSON payload: graph signature and the serialized capability.
pub const NOTES: &str = "notes";

/// Where the compiled artifact is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedMode {
    /// Hex-encoded inside the main context node.
    #[default]
    Embedded,
    /// In a file next to the context model.
    External,
}

impl EmbedMode {
    /// Value of the `embed_mode` attribute.
    pub fn as_attr(self) -> i64 {
        match self {
            Self::Embedded => 1,
            Self::External => 0,
        }
    }

    pub fn from_attr(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Embedded),
            0 => Some(Self::External),
            _ => None,
        }
    }
}

impl fmt::Display for EmbedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedded => f.write_str("embedded"),
            Self::External => f.write_str("external"),
        }
    }
}

impl FromStr for EmbedMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "embedded" | "embed" | "1" => Ok(Self::Embedded),
            "external" | "0" => Ok(Self::External),
            other => Err(format!(
                "unknown embed mode '{other}'; expected 'embedded' or 'external'"
            )),
        }
    }
}
