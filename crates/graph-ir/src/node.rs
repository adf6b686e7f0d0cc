// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Node definitions.
//!
//! A [`Node`] is one operator invocation in the graph: its operator type,
//! the names of the values it consumes and produces, and a small attribute
//! map. Tensor data never lives here.

use std::collections::BTreeMap;
use std::fmt;

/// Stable, dense index of a node within its graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct NodeIndex(pub usize);

impl NodeIndex {
    /// Returns the raw index.
    pub fn get(self) -> usize {
        self.0
    }
}

impl From<usize> for NodeIndex {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node attribute value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeValue {
    Int(i64),
    Ints(Vec<i64>),
    Float(f64),
    Str(String),
}

impl AttributeValue {
    /// Returns the integer payload, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string payload, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// Metadata describing a single node in the graph.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    /// Position of this node in the graph (0-based).
    pub index: NodeIndex,
    /// Unique node name (e.g., `"conv1"`).
    pub name: String,
    /// Operator type (e.g., `"Conv"`, `"Relu"`).
    pub op_type: String,
    /// Operator domain; empty for the default domain.
    #[serde(default)]
    pub domain: String,
    /// Names of the values consumed, in input-slot order.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Names of the values produced, in output-slot order.
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Node attributes, sorted by name.
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Node {
    /// Creates a node with no arguments or attributes.
    pub fn new(index: usize, name: impl Into<String>, op_type: impl Into<String>) -> Self {
        Self {
            index: NodeIndex(index),
            name: name.into(),
            op_type: op_type.into(),
            domain: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Sets the input and output argument names.
    pub fn with_args<I, O>(mut self, inputs: I, outputs: O) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the operator domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Adds or replaces an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Looks up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Looks up an integer attribute by name.
    pub fn attribute_int(&self, name: &str) -> Option<i64> {
        self.attribute(name).and_then(AttributeValue::as_int)
    }

    /// Looks up a string attribute by name.
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(AttributeValue::as_str)
    }

    /// Returns a one-line summary of this node.
    pub fn summary(&self) -> String {
        let op = if self.domain.is_empty() {
            self.op_type.clone()
        } else {
            format!("{}::{}", self.domain, self.op_type)
        };
        format!(
            "[{:>3}] {:<24} {:<20} in={:?} out={:?}",
            self.index, self.name, op, self.inputs, self.outputs,
        )
    }
}
