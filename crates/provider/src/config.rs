// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Provider configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! name = "fusion-ep"
//!
//! [[compilers]]
//! name = "xc"
//! options = { ops = "Conv,Relu" }
//!
//! [[compilers]]
//! name = "tvm"
//! options = { ops = "Add,Mul", target = "llvm" }
//!
//! [cache]
//! enabled = true
//! embed_mode = "external"
//! context_model_path = "./cache/net_ctx.json"
//! ```
//!
//! Compilers are listed in rank order: the first entry has the highest
//! priority when candidate partitions conflict.

use crate::ProviderError;
use capability::CompilerOptions;
use context_cache::EmbedMode;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Configuration for an execution provider.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProviderConfig {
    /// Provider name, recorded as the `source` of context nodes.
    #[serde(default = "default_name")]
    pub name: String,
    /// Backend compilers in rank order.
    #[serde(default)]
    pub compilers: Vec<CompilerConfig>,
    /// Context model caching.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// One ranked backend compiler.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompilerConfig {
    pub name: String,
    /// Options passed to the compiler as-is.
    #[serde(default)]
    pub options: CompilerOptions,
}

/// Context model caching settings.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub embed_mode: EmbedMode,
    /// Overrides `<model dir>/<model stem>_ctx.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_model_path: Option<PathBuf>,
}

fn default_name() -> String {
    "fusion-ep".to_string()
}

impl CompilerConfig {
    pub fn new(name: impl Into<String>, options: CompilerOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

impl ProviderConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ProviderError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::ConfigError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ProviderError> {
        toml::from_str(toml_str)
            .map_err(|e| ProviderError::ConfigError(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, ProviderError> {
        toml::to_string_pretty(self)
            .map_err(|e| ProviderError::ConfigError(format!("TOML serialise error: {e}")))
    }

    /// Checks that at least one compiler is configured and names are unique.
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.name.trim().is_empty() {
            return Err(ProviderError::ConfigError("provider name is empty".into()));
        }
        if self.compilers.is_empty() {
            return Err(ProviderError::ConfigError(
                "at least one compiler must be configured".into(),
            ));
        }
        let mut seen = HashSet::new();
        for compiler in &self.compilers {
            if compiler.name.trim().is_empty() {
                return Err(ProviderError::ConfigError("compiler name is empty".into()));
            }
            if !seen.insert(compiler.name.as_str()) {
                return Err(ProviderError::ConfigError(format!(
                    "compiler '{}' is configured more than once",
                    compiler.name
                )));
            }
        }
        Ok(())
    }

    /// Compiler names in rank order.
    pub fn compiler_names(&self) -> Vec<&str> {
        self.compilers.iter().map(|c| c.name.as_str()).collect()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            compilers: Vec::new(),
            cache: CacheConfig::default(),
        }
    }
}
