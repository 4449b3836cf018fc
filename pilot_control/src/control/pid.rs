//! PID controller with rectangular integration and an integral clamp.
//!
//! Zero Ki disables the integral contribution; zero Kd disables the
//! derivative contribution.

use pilot_common::motion::PidGains;

/// Internal state of one PID channel.
///
/// Preserves integral accumulator and previous error across cycles.
/// Must be reset (via [`PidState::reset`]) on every engine mode change.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidState {
    /// Clamped integral of the error [error·s].
    integral: f64,
    /// Error seen on the previous cycle.
    prev_error: f64,
}

impl PidState {
    /// Reset all internal state to zero.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn integral(&self) -> f64 {
        self.integral
    }

    #[inline]
    pub fn prev_error(&self) -> f64 {
        self.prev_error
    }
}

/// Compute one PID cycle.
///
/// # Arguments
/// - `state`: Mutable PID internal state.
/// - `gains`: Gains and integral clamp.
/// - `error`: Current error (target − measured).
/// - `dt`: Cycle period [s].
///
/// # Returns
/// Unsaturated command. Returns 0 without touching `state` when `dt <= 0`.
#[inline]
pub fn pid_compute(state: &mut PidState, gains: &PidGains, error: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        return 0.0;
    }

    // ── P term ──────────────────────────────────────────────
    let p_term = gains.kp * error;

    // ── I term (clamped accumulator) ────────────────────────
    let limit = gains.integral_limit;
    state.integral = (state.integral + error * dt).clamp(-limit, limit);
    let i_term = gains.ki * state.integral;

    // ── D term ──────────────────────────────────────────────
    let d_term = gains.kd * (error - state.prev_error) / dt;
    state.prev_error = error;

    p_term + i_term + d_term
}

/// A PID channel bundling gains, state and the cycle period.
#[derive(Debug, Clone, PartialEq)]
pub struct Pid {
    gains: PidGains,
    state: PidState,
    dt: f64,
}

impl Pid {
    pub fn new(gains: PidGains, dt: f64) -> Self {
        Self {
            gains,
            state: PidState::default(),
            dt,
        }
    }

    /// One cycle: `error = target − measured`.
    #[inline]
    pub fn compute(&mut self, target: f64, measured: f64) -> f64 {
        pid_compute(&mut self.state, &self.gains, target - measured, self.dt)
    }

    #[inline]
    pub fn reset(&mut self) {
        self.state.reset();
    }

    #[inline]
    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    /// Replace the gains. Accumulated state is kept.
    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
    }

    #[inline]
    pub fn state(&self) -> &PidState {
        &self.state
    }

    #[inline]
    pub fn dt(&self) -> f64 {
        self.dt
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
