// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Execution context handed to a kernel by the host executor.

/// Input and output buffers for one compute call.
///
/// Buffers are raw bytes; interpreting them is the kernel's business.
#[derive(Debug, Clone, Default)]
pub struct KernelContext {
    inputs: Vec<Vec<u8>>,
    outputs: Vec<Vec<u8>>,
}

impl KernelContext {
    /// Creates a context with the given inputs and no outputs.
    pub fn new(inputs: Vec<Vec<u8>>) -> Self {
        Self {
            inputs,
            outputs: Vec::new(),
        }
    }

    /// Returns the number of inputs.
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Returns input `i`, if present.
    pub fn input(&self, i: usize) -> Option<&[u8]> {
        self.inputs.get(i).map(Vec::as_slice)
    }

    /// Returns output `i`, if it has been written.
    pub fn output(&self, i: usize) -> Option<&[u8]> {
        self.outputs.get(i).map(Vec::as_slice)
    }

    /// Writes output `i`, growing the output list with empty buffers if needed.
    pub fn set_output(&mut self, i: usize, data: Vec<u8>) {
        if self.outputs.len() <= i {
            self.outputs.resize_with(i + 1, Vec::new);
        }
        self.outputs[i] = data;
    }

    /// Consumes the context and returns the outputs.
    pub fn into_outputs(self) -> Vec<Vec<u8>> {
        self.outputs
    }
}
