//! Stall detection.
//!
//! A cycle is stalled when the measured speed stays under
//! `speed_threshold` while the order diverges from it by more than
//! `speed_error_threshold`. `cycles_max` consecutive stalled cycles trip
//! the detector; any other cycle clears the count.

use pilot_common::motion::BlockingParameters;

/// Consecutive-cycle stall counter.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockingDetector {
    params: BlockingParameters,
    cycles: u32,
}

impl BlockingDetector {
    pub fn new(params: BlockingParameters) -> Self {
        Self { params, cycles: 0 }
    }

    pub fn parameters(&self) -> &BlockingParameters {
        &self.params
    }

    /// Replace thresholds. The running count is kept.
    pub fn set_parameters(&mut self, params: BlockingParameters) {
        self.params = params;
    }

    /// Stalled cycles counted so far.
    #[inline]
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    #[inline]
    pub fn reset(&mut self) {
        self.cycles = 0;
    }

    /// Whether a single cycle with these speeds counts as stalled.
    #[inline]
    pub fn is_stalled(&self, speed_order: f64, speed_current: f64) -> bool {
        speed_current.abs() < self.params.speed_threshold
            && (speed_order - speed_current).abs() > self.params.speed_error_threshold
    }

    /// Feed one cycle. Returns `true` on every stalled cycle once the
    /// count is at or past `cycles_max`, so lowering the limit mid-stall
    /// trips on the next stalled cycle.
    ///
    /// Always `false` (and the count stays at zero) when
    /// `anti_blocking_on` is off.
    pub fn update(&mut self, speed_order: f64, speed_current: f64) -> bool {
        if !self.params.anti_blocking_on {
            self.cycles = 0;
            return false;
        }
        if self.is_stalled(speed_order, speed_current) {
            self.cycles = self.cycles.saturating_add(1);
            self.cycles >= self.params.cycles_max
        } else {
            self.cycles = 0;
            false
        }
    }
}
