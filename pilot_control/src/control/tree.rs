//! Controller tree: the closed set of node kinds an engine can run.

use std::fmt;

use super::io::IoVector;
use super::leaf::{LeafController, LeafParameters};
use super::meta::MetaController;
use super::parallel::ParallelMetaController;
use crate::error::{ParameterError, WiringError};

/// A node in a controller tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Controller {
    Leaf(LeafController),
    Sequential(MetaController),
    Parallel(ParallelMetaController),
}

impl From<LeafController> for Controller {
    fn from(leaf: LeafController) -> Self {
        Controller::Leaf(leaf)
    }
}

impl From<MetaController> for Controller {
    fn from(meta: MetaController) -> Self {
        Controller::Sequential(meta)
    }
}

impl From<ParallelMetaController> for Controller {
    fn from(par: ParallelMetaController) -> Self {
        Controller::Parallel(par)
    }
}

impl Controller {
    pub fn name(&self) -> &str {
        match self {
            Controller::Leaf(c) => c.name(),
            Controller::Sequential(c) => c.name(),
            Controller::Parallel(c) => c.name(),
        }
    }

    pub fn input_len(&self) -> usize {
        match self {
            Controller::Leaf(c) => c.input_len(),
            Controller::Sequential(c) => c.input_len(),
            Controller::Parallel(c) => c.input_len(),
        }
    }

    pub fn output_len(&self) -> usize {
        match self {
            Controller::Leaf(c) => c.output_len(),
            Controller::Sequential(c) => c.output_len(),
            Controller::Parallel(c) => c.output_len(),
        }
    }

    /// # Panics
    /// When `index >= input_len()`.
    pub fn set_input(&mut self, index: usize, value: f64) {
        match self {
            Controller::Leaf(c) => c.set_input(index, value),
            Controller::Sequential(c) => c.set_input(index, value),
            Controller::Parallel(c) => c.set_input(index, value),
        }
    }

    /// # Panics
    /// When `index >= output_len()`.
    pub fn get_output(&self, index: usize) -> f64 {
        self.outputs().get(index)
    }

    /// Overwrite every input. Length must equal `input_len()`.
    pub fn set_inputs(&mut self, values: &[f64]) {
        self.inputs_mut().copy_from(values);
    }

    pub fn inputs_mut(&mut self) -> &mut IoVector {
        match self {
            Controller::Leaf(c) => c.inputs_mut(),
            Controller::Sequential(c) => c.inputs_mut(),
            Controller::Parallel(c) => c.inputs_mut(),
        }
    }

    pub fn outputs(&self) -> &IoVector {
        match self {
            Controller::Leaf(c) => c.outputs(),
            Controller::Sequential(c) => c.outputs(),
            Controller::Parallel(c) => c.outputs(),
        }
    }

    /// Run one cycle of this node and everything below it.
    pub fn compute(&mut self) {
        match self {
            Controller::Leaf(c) => c.compute(),
            Controller::Sequential(c) => c.compute(),
            Controller::Parallel(c) => c.compute(),
        }
    }

    /// Clear PID and filter state plus every io vector below this node.
    pub fn reset(&mut self) {
        match self {
            Controller::Leaf(c) => c.reset(),
            Controller::Sequential(c) => c.reset(),
            Controller::Parallel(c) => c.reset(),
        }
    }

    /// Check the whole subtree: no empty composite, every parallel output
    /// driven exactly once.
    pub fn validate(&self) -> Result<(), WiringError> {
        match self {
            Controller::Leaf(_) => Ok(()),
            Controller::Sequential(c) => c.validate(),
            Controller::Parallel(c) => c.validate(),
        }
    }

    /// Depth-first search by name.
    pub fn find(&self, name: &str) -> Option<&Controller> {
        if self.name() == name {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(name))
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut Controller> {
        if self.name() == name {
            return Some(self);
        }
        match self {
            Controller::Leaf(_) => None,
            Controller::Sequential(c) => c.children_mut().iter_mut().find_map(|c| c.find_mut(name)),
            Controller::Parallel(c) => c.children_mut().iter_mut().find_map(|c| c.find_mut(name)),
        }
    }

    pub fn children(&self) -> &[Controller] {
        match self {
            Controller::Leaf(_) => &[],
            Controller::Sequential(c) => c.children(),
            Controller::Parallel(c) => c.children(),
        }
    }

    /// Replace the parameter block of the leaf called `name`.
    pub fn set_parameters(
        &mut self,
        name: &str,
        params: LeafParameters,
    ) -> Result<(), ParameterError> {
        match self.find_mut(name) {
            Some(Controller::Leaf(leaf)) => leaf.set_parameters(params),
            Some(_) => Err(ParameterError::NotParameterized {
                name: name.to_string(),
            }),
            None => Err(ParameterError::UnknownController(name.to_string())),
        }
    }

    /// Parameter block of the leaf called `name`.
    pub fn parameters(&self, name: &str) -> Option<LeafParameters> {
        match self.find(name) {
            Some(Controller::Leaf(leaf)) => leaf.parameters(),
            _ => None,
        }
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let kind = match self {
            Controller::Leaf(c) => c.law().kind(),
            Controller::Sequential(_) => "sequential",
            Controller::Parallel(_) => "parallel",
        };
        writeln!(
            f,
            "{:indent$}{} [{}] {} -> {}",
            "",
            self.name(),
            kind,
            self.input_len(),
            self.output_len(),
            indent = depth * 2
        )?;
        for child in self.children() {
            child.write_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, 0)
    }
}
