//! Parallel composition: fan inputs out to children, gather outputs back.

use super::io::IoVector;
use super::tree::Controller;
use crate::error::WiringError;

#[derive(Debug, Clone, PartialEq)]
struct Mapping {
    /// `child input i <- parent input input_map[i]`
    input_map: Vec<usize>,
    /// `parent output output_map[j] <- child output j`
    output_map: Vec<usize>,
}

/// Children computed side by side over static index mappings.
///
/// Inputs may be shared between children; each parent output is owned by
/// exactly one child, so child order never changes the merged result.
#[derive(Debug, Clone, PartialEq)]
pub struct ParallelMetaController {
    name: String,
    inputs: IoVector,
    outputs: IoVector,
    children: Vec<Controller>,
    /// One entry per child, same order.
    mappings: Vec<Mapping>,
    /// Index of the child driving each parent output.
    owners: Vec<Option<usize>>,
}

impl ParallelMetaController {
    pub fn new(name: impl Into<String>, inputs: usize, outputs: usize) -> Result<Self, WiringError> {
        let name = name.into();
        if inputs == 0 || outputs == 0 {
            return Err(WiringError::InvalidArity {
                name,
                inputs,
                outputs,
            });
        }
        Ok(Self {
            inputs: IoVector::zeroed(inputs)?,
            outputs: IoVector::zeroed(outputs)?,
            name,
            children: Vec::new(),
            mappings: Vec::new(),
            owners: vec![None; outputs],
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn input_len(&self) -> usize {
        self.inputs.len()
    }

    #[inline]
    pub fn output_len(&self) -> usize {
        self.outputs.len()
    }

    /// Attach `child` with its input and output mappings.
    pub fn add_controller(
        &mut self,
        child: impl Into<Controller>,
        input_map: &[usize],
        output_map: &[usize],
    ) -> Result<(), WiringError> {
        let child = child.into();
        self.check_map(&child, "input", input_map, child.input_len(), self.inputs.len())?;
        self.check_map(&child, "output", output_map, child.output_len(), self.outputs.len())?;

        for (j, &index) in output_map.iter().enumerate() {
            let claimed_before = self.owners[index]
                .map(|k| self.children[k].name().to_string())
                .or_else(|| {
                    output_map[..j]
                        .contains(&index)
                        .then(|| child.name().to_string())
                });
            if let Some(owner) = claimed_before {
                return Err(WiringError::OutputClaimed {
                    parent: self.name.clone(),
                    owner,
                    index,
                });
            }
        }

        let slot = self.children.len();
        for &index in output_map {
            self.owners[index] = Some(slot);
        }
        self.children.push(child);
        self.mappings.push(Mapping {
            input_map: input_map.to_vec(),
            output_map: output_map.to_vec(),
        });
        Ok(())
    }

    fn check_map(
        &self,
        child: &Controller,
        side: &'static str,
        map: &[usize],
        expected: usize,
        len: usize,
    ) -> Result<(), WiringError> {
        if map.len() != expected {
            return Err(WiringError::MappingLength {
                child: child.name().to_string(),
                side,
                expected,
                found: map.len(),
            });
        }
        if let Some(&index) = map.iter().find(|&&i| i >= len) {
            return Err(WiringError::IndexOutOfRange {
                parent: self.name.clone(),
                child: child.name().to_string(),
                side,
                index,
                len,
            });
        }
        Ok(())
    }

    /// Every parent output must be driven by some child.
    pub fn check_complete(&self) -> Result<(), WiringError> {
        match self.owners.iter().position(Option::is_none) {
            Some(index) => Err(WiringError::OutputUnclaimed {
                parent: self.name.clone(),
                index,
            }),
            None => Ok(()),
        }
    }

    pub fn validate(&self) -> Result<(), WiringError> {
        if self.children.is_empty() {
            return Err(WiringError::Empty {
                name: self.name.clone(),
            });
        }
        self.check_complete()?;
        self.children.iter().try_for_each(Controller::validate)
    }

    pub fn children(&self) -> &[Controller] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Controller] {
        &mut self.children
    }

    /// # Panics
    /// When `index >= input_len()`.
    #[inline]
    pub fn set_input(&mut self, index: usize, value: f64) {
        self.inputs.set(index, value);
    }

    pub fn inputs_mut(&mut self) -> &mut IoVector {
        &mut self.inputs
    }

    pub fn outputs(&self) -> &IoVector {
        &self.outputs
    }

    /// Distribute parent inputs to every child.
    pub fn set_inputs(&mut self) {
        for (mapping, child) in self.mappings.iter().zip(self.children.iter_mut()) {
            for (i, &src) in mapping.input_map.iter().enumerate() {
                child.set_input(i, self.inputs.get(src));
            }
        }
    }

    /// Gather child outputs into the parent output vector.
    pub fn sort_outputs(&mut self) {
        for (mapping, child) in self.mappings.iter().zip(self.children.iter()) {
            for (j, &dst) in mapping.output_map.iter().enumerate() {
                self.outputs.set(dst, child.get_output(j));
            }
        }
    }

    pub fn compute(&mut self) {
        self.set_inputs();
        self.children.iter_mut().for_each(Controller::compute);
        self.sort_outputs();
    }

    pub fn reset(&mut self) {
        self.inputs.clear();
        self.outputs.clear();
        self.children.iter_mut().for_each(Controller::reset);
    }
}
