//! Leaf controllers: one law with fixed input and output vectors.

use pilot_common::motion::{PidGains, PoseStraightParameters, SpeedFilterParameters};

use super::filters::{self, PoseStraightFilter, SpeedFilter, pose_in, pose_out};
use super::io::IoVector;
use super::pid::Pid;
use crate::error::{ParameterError, WiringError};

/// How a PID leaf reads its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidLayout {
    /// `[target_0, measured_0, target_1, measured_1, ...]`
    SetpointMeasurement,
    /// `[error_0, error_1, ...]`, computed as `compute(error, 0)`.
    Error,
}

/// Bank of independent PID channels sharing one gain set.
#[derive(Debug, Clone, PartialEq)]
pub struct PidBank {
    layout: PidLayout,
    channels: Vec<Pid>,
}

impl PidBank {
    pub fn new(channels: usize, layout: PidLayout, gains: PidGains, dt: f64) -> Self {
        Self {
            layout,
            channels: (0..channels).map(|_| Pid::new(gains, dt)).collect(),
        }
    }

    pub fn layout(&self) -> PidLayout {
        self.layout
    }

    pub fn channels(&self) -> &[Pid] {
        &self.channels
    }

    fn compute(&mut self, inputs: &[f64], outputs: &mut [f64]) {
        for (k, (pid, out)) in self.channels.iter_mut().zip(outputs.iter_mut()).enumerate() {
            *out = match self.layout {
                PidLayout::SetpointMeasurement => pid.compute(inputs[2 * k], inputs[2 * k + 1]),
                PidLayout::Error => pid.compute(inputs[k], 0.0),
            };
        }
    }

    fn arity(&self) -> (usize, usize) {
        let c = self.channels.len();
        match self.layout {
            PidLayout::SetpointMeasurement => (2 * c, c),
            PidLayout::Error => (c, c),
        }
    }
}

/// Computation carried out by a leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Law {
    Pid(PidBank),
    PoseStraight(PoseStraightFilter),
    SpeedRamp(SpeedFilter),
    /// Selector over two blocks of `width` values.
    Switch { width: usize },
    /// Copies `width` inputs to outputs.
    Passthrough { width: usize },
}

impl Law {
    /// `(inputs, outputs)` implied by the law.
    pub fn arity(&self) -> (usize, usize) {
        match self {
            Law::Pid(bank) => bank.arity(),
            Law::PoseStraight(_) => (pose_in::LEN, pose_out::LEN),
            Law::SpeedRamp(_) => (SpeedFilter::INPUTS, SpeedFilter::OUTPUTS),
            Law::Switch { width } => (1 + 2 * width, *width),
            Law::Passthrough { width } => (*width, *width),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Law::Pid(_) => "pid",
            Law::PoseStraight(_) => "pose_straight",
            Law::SpeedRamp(_) => "speed_ramp",
            Law::Switch { .. } => "switch",
            Law::Passthrough { .. } => "passthrough",
        }
    }

    fn compute(&mut self, inputs: &[f64], outputs: &mut [f64]) {
        match self {
            Law::Pid(bank) => bank.compute(inputs, outputs),
            Law::PoseStraight(f) => f.compute(inputs, outputs),
            Law::SpeedRamp(f) => f.compute(inputs, outputs),
            Law::Switch { .. } => filters::switch(inputs, outputs),
            Law::Passthrough { .. } => filters::passthrough(inputs, outputs),
        }
    }

    fn reset(&mut self) {
        match self {
            Law::Pid(bank) => bank.channels.iter_mut().for_each(Pid::reset),
            Law::PoseStraight(f) => f.reset(),
            Law::SpeedRamp(_) | Law::Switch { .. } | Law::Passthrough { .. } => {}
        }
    }
}

/// Typed parameter block accepted by a leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LeafParameters {
    Pid(PidGains),
    PoseStraight(PoseStraightParameters),
    SpeedRamp(SpeedFilterParameters),
}

impl LeafParameters {
    pub fn kind(&self) -> &'static str {
        match self {
            LeafParameters::Pid(_) => "pid",
            LeafParameters::PoseStraight(_) => "pose_straight",
            LeafParameters::SpeedRamp(_) => "speed_ramp",
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            LeafParameters::Pid(g) => g.validate(),
            LeafParameters::PoseStraight(p) => p.validate(),
            LeafParameters::SpeedRamp(p) => p.validate(),
        }
    }
}

/// A named law with its own input and output vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafController {
    name: String,
    law: Law,
    inputs: IoVector,
    outputs: IoVector,
}

impl LeafController {
    /// Wrap `law`, sizing the vectors from its arity.
    pub fn new(name: impl Into<String>, law: Law) -> Result<Self, WiringError> {
        let name = name.into();
        let (n, m) = law.arity();
        if n == 0 || m == 0 {
            return Err(WiringError::InvalidArity {
                name,
                inputs: n,
                outputs: m,
            });
        }
        Ok(Self {
            inputs: IoVector::zeroed(n)?,
            outputs: IoVector::zeroed(m)?,
            name,
            law,
        })
    }

    pub fn pid(
        name: impl Into<String>,
        channels: usize,
        layout: PidLayout,
        gains: PidGains,
        dt: f64,
    ) -> Result<Self, WiringError> {
        let name = name.into();
        check_parameters(&name, LeafParameters::Pid(gains))?;
        Self::new(name, Law::Pid(PidBank::new(channels, layout, gains, dt)))
    }

    pub fn pose_straight(
        name: impl Into<String>,
        params: PoseStraightParameters,
    ) -> Result<Self, WiringError> {
        let name = name.into();
        check_parameters(&name, LeafParameters::PoseStraight(params))?;
        Self::new(name, Law::PoseStraight(PoseStraightFilter::new(params)))
    }

    pub fn speed_ramp(
        name: impl Into<String>,
        params: SpeedFilterParameters,
        dt: f64,
    ) -> Result<Self, WiringError> {
        let name = name.into();
        check_parameters(&name, LeafParameters::SpeedRamp(params))?;
        Self::new(name, Law::SpeedRamp(SpeedFilter::new(params, dt)))
    }

    pub fn switch(name: impl Into<String>, width: usize) -> Result<Self, WiringError> {
        Self::new(name, Law::Switch { width })
    }

    pub fn passthrough(name: impl Into<String>, width: usize) -> Result<Self, WiringError> {
        Self::new(name, Law::Passthrough { width })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn law(&self) -> &Law {
        &self.law
    }

    #[inline]
    pub fn input_len(&self) -> usize {
        self.inputs.len()
    }

    #[inline]
    pub fn output_len(&self) -> usize {
        self.outputs.len()
    }

    /// # Panics
    /// When `index >= input_len()`.
    #[inline]
    pub fn set_input(&mut self, index: usize, value: f64) {
        self.inputs.set(index, value);
    }

    /// # Panics
    /// When `index >= output_len()`.
    #[inline]
    pub fn get_output(&self, index: usize) -> f64 {
        self.outputs.get(index)
    }

    #[inline]
    pub fn inputs(&self) -> &IoVector {
        &self.inputs
    }

    #[inline]
    pub fn inputs_mut(&mut self) -> &mut IoVector {
        &mut self.inputs
    }

    #[inline]
    pub fn outputs(&self) -> &IoVector {
        &self.outputs
    }

    #[inline]
    pub fn compute(&mut self) {
        self.law
            .compute(self.inputs.as_slice(), self.outputs.as_mut_slice());
    }

    /// Clear law state and both vectors.
    pub fn reset(&mut self) {
        self.law.reset();
        self.inputs.clear();
        self.outputs.clear();
    }

    /// Current parameter block, `None` for parameterless laws.
    pub fn parameters(&self) -> Option<LeafParameters> {
        match &self.law {
            Law::Pid(bank) => bank
                .channels
                .first()
                .map(|pid| LeafParameters::Pid(*pid.gains())),
            Law::PoseStraight(f) => Some(LeafParameters::PoseStraight(*f.parameters())),
            Law::SpeedRamp(f) => Some(LeafParameters::SpeedRamp(*f.parameters())),
            Law::Switch { .. } | Law::Passthrough { .. } => None,
        }
    }

    /// Replace the parameter block. Accumulated state is kept.
    pub fn set_parameters(&mut self, params: LeafParameters) -> Result<(), ParameterError> {
        params.validate().map_err(|reason| ParameterError::Invalid {
            name: self.name.clone(),
            reason,
        })?;
        match (&mut self.law, params) {
            (Law::Pid(bank), LeafParameters::Pid(gains)) => {
                bank.channels.iter_mut().for_each(|pid| pid.set_gains(gains));
            }
            (Law::PoseStraight(f), LeafParameters::PoseStraight(p)) => f.set_parameters(p),
            (Law::SpeedRamp(f), LeafParameters::SpeedRamp(p)) => f.set_parameters(p),
            (Law::Switch { .. } | Law::Passthrough { .. }, _) => {
                return Err(ParameterError::NotParameterized {
                    name: self.name.clone(),
                });
            }
            (law, params) => {
                return Err(ParameterError::WrongKind {
                    name: self.name.clone(),
                    expected: law.kind(),
                    found: params.kind(),
                });
            }
        }
        Ok(())
    }
}

fn check_parameters(name: &str, params: LeafParameters) -> Result<(), WiringError> {
    params
        .validate()
        .map_err(|reason| WiringError::InvalidParameters {
            name: name.to_string(),
            reason,
        })
}
