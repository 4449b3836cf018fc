//! Sequential composition: each stage feeds the next.

use super::io::IoVector;
use super::tree::Controller;
use crate::error::WiringError;

/// Ordered cascade of controllers.
///
/// Inputs are the first child's inputs, outputs the last child's outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaController {
    name: String,
    children: Vec<Controller>,
}

impl MetaController {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a stage. Its input count must equal the previous stage's
    /// output count.
    pub fn add_controller(&mut self, child: impl Into<Controller>) -> Result<(), WiringError> {
        let child = child.into();
        if let Some(last) = self.children.last() {
            if last.output_len() != child.input_len() {
                return Err(WiringError::StageMismatch {
                    parent: last.name().to_string(),
                    child: child.name().to_string(),
                    expected: last.output_len(),
                    found: child.input_len(),
                });
            }
        }
        self.children.push(child);
        Ok(())
    }

    pub fn children(&self) -> &[Controller] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Controller] {
        &mut self.children
    }

    pub fn input_len(&self) -> usize {
        self.children.first().map_or(0, Controller::input_len)
    }

    pub fn output_len(&self) -> usize {
        self.children.last().map_or(0, Controller::output_len)
    }

    /// # Panics
    /// When empty or `index >= input_len()`.
    pub fn set_input(&mut self, index: usize, value: f64) {
        self.inputs_mut().set(index, value);
    }

    /// # Panics
    /// When the cascade has no stage.
    pub fn inputs_mut(&mut self) -> &mut IoVector {
        let name = &self.name;
        match self.children.first_mut() {
            Some(first) => first.inputs_mut(),
            None => panic!("sequential controller '{name}' has no children"),
        }
    }

    /// # Panics
    /// When the cascade has no stage.
    pub fn outputs(&self) -> &IoVector {
        match self.children.last() {
            Some(last) => last.outputs(),
            None => panic!("sequential controller '{}' has no children", self.name),
        }
    }

    pub fn compute(&mut self) {
        let count = self.children.len();
        for k in 0..count {
            if k > 0 {
                let (done, rest) = self.children.split_at_mut(k);
                rest[0].set_inputs(done[k - 1].outputs().as_slice());
            }
            self.children[k].compute();
        }
    }

    pub fn reset(&mut self) {
        self.children.iter_mut().for_each(Controller::reset);
    }

    pub fn validate(&self) -> Result<(), WiringError> {
        if self.children.is_empty() {
            return Err(WiringError::Empty {
                name: self.name.clone(),
            });
        }
        self.children.iter().try_for_each(Controller::validate)
    }
}
