// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! File locations of the context model and the external artifact.
//!
//! ```text
//! models/resnet.json                  original model
//! models/resnet_ctx.json              context model (default location)
//! models/resnet_ctx_cache.bin         external artifact
//! ```

use crate::CacheError;
use std::path::{Path, PathBuf};

const CONTEXT_SUFFIX: &str = "_ctx.json";
const ARTIFACT_SUFFIX: &str = "_ctx_cache.bin";

/// Resolves where the context model lives.
///
/// A configured path wins; otherwise the context model sits next to the
/// original model as `<stem>_ctx.json`.
pub fn context_model_path(
    configured: Option<&Path>,
    model_path: Option<&Path>,
) -> Result<PathBuf, CacheError> {
    if let Some(path) = configured {
        return Ok(path.to_path_buf());
    }
    let model_path = model_path.ok_or(CacheError::MissingModelPath)?;
    Ok(sibling(model_path, &format!("{}{CONTEXT_SUFFIX}", model_stem(model_path))))
}

/// Location of the external artifact: the context model's directory, named
/// after the original model's stem.
pub fn artifact_path(context_model_path: &Path, model_path: &Path) -> PathBuf {
    sibling(
        context_model_path,
        &artifact_file_name(model_path),
    )
}

/// File name of the external artifact for `model_path`.
pub fn artifact_file_name(model_path: &Path) -> String {
    format!("{}{ARTIFACT_SUFFIX}", model_stem(model_path))
}

fn model_stem(model_path: &Path) -> String {
    model_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string())
}

fn sibling(path: &Path, file_name: &str) -> PathBuf {
    match path.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context_path() {
        let path = context_model_path(None, Some(Path::new("models/resnet.json"))).unwrap();
        assert_eq!(path, Path::new("models/resnet_ctx.json"));
    }

    #[test]
    fn test_configured_context_path_wins() {
        let path = context_model_path(
            Some(Path::new("/cache/custom.json")),
            Some(Path::new("models/resnet.json")),
        )
        .unwrap();
        assert_eq!(path, Path::new("/cache/custom.json"));
    }

    #[test]
    fn test_missing_model_path() {
        assert!(matches!(
            context_model_path(None, None),
            Err(CacheError::MissingModelPath)
        ));
    }

    #[test]
    fn test_artifact_follows_context_dir() {
        let path = artifact_path(
            Path::new("/cache/custom.json"),
            Path::new("models/resnet.json"),
        );
        assert_eq!(path, Path::new("/cache/resnet_ctx_cache.bin"));
    }

    #[test]
    fn test_bare_file_name() {
        let path = artifact_path(Path::new("resnet_ctx.json"), Path::new("resnet.json"));
        assert_eq!(path, Path::new("resnet_ctx_cache.bin"));
    }
}
