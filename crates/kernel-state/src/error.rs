// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Backend failure type.

/// An opaque failure raised by a backend compiler or one of its kernels.
///
/// Layers above this crate never translate it; they carry it
/// `#[error(transparent)]` so the host sees the backend's own message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("backend '{backend}' failed: {message}")]
pub struct BackendError {
    /// Name of the backend that raised the failure.
    pub backend: String,
    /// Backend-provided description.
    pub message: String,
}

impl BackendError {
    pub fn new(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            message: message.into(),
        }
    }
}
