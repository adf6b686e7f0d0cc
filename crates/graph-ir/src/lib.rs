// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # graph-ir
//!
//! A read-only view over the computation graph handed to the partitioning
//! provider by its host runtime.
//!
//! The provider never mutates a graph. It only needs:
//!
//! - [`Node`]: stable index, operator type, argument names and attributes.
//! - [`Edge`]: producer output slot → consumer input slot, derived from
//!   argument names during validation.
//! - [`Graph`]: the full graph with a **type-state pattern**
//!   (`Loaded` → `Validated`), a subgraph flag and an optional model path.
//! - [`GraphManifest`] / [`GraphLoader`]: a JSON description of a graph,
//!   used by tests, the CLI, and the persisted context model.
//!
//! # Example
//! ```no_run
//! use graph_ir::GraphLoader;
//! use std::path::Path;
//!
//! let graph = GraphLoader::load(Path::new("./models/resnet.json")).unwrap();
//! println!("{}", graph.summary());
//! for idx in graph.topological_order() {
//!     println!("  {}", graph.node(idx).unwrap().summary());
//! }
//! ```

mod error;
pub mod graph;
mod loader;
mod manifest;
mod node;

pub use error::GraphError;
pub use graph::{Edge, Graph, GraphId};
pub use loader::GraphLoader;
pub use manifest::{GraphManifest, ManifestNode};
pub use node::{AttributeValue, Node, NodeIndex};
