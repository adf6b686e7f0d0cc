// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # context-cache
//!
//! Persists accepted partitions and the compiled artifact as an EPContext
//! model, so a later process can skip capability discovery.
//!
//! # Layout
//!
//! ```text
//! <model dir>/
//! ├── net.json                 original model
//! ├── net_ctx.json             context model: one EPContext node per partition
//! └── net_ctx_cache.bin        artifact (external mode only)
//! ```
//!
//! The context model is keyed by a [`GraphSignature`] of the original
//! graph. A missing, malformed or mismatched context model is a cache miss,
//! never an error:
//!
//! ```no_run
//! use context_cache::{ContextCache, EmbedMode};
//! use graph_ir::GraphLoader;
//! use std::path::Path;
//!
//! let graph = GraphLoader::load(Path::new("models/net.json")).unwrap();
//! let cache = ContextCache::new("my-provider", EmbedMode::Embedded, None);
//! match cache.load(&graph).unwrap() {
//!     Some(entry) => println!("{} cached partitions", entry.partitions.len()),
//!     None => println!("cache miss"),
//! }
//! ```

mod codec;
mod error;
pub mod location;
pub mod node;
mod signature;
mod store;

pub use codec::{validate_context_nodes, CacheEntry, ContextCodec, EncodedContext, ExternalArtifact};
pub use error::CacheError;
pub use location::{artifact_path, context_model_path};
pub use node::EmbedMode;
pub use signature::GraphSignature;
pub use store::ContextCache;
