//! Engine run-mode transitions.
//!
//! Stop → Idle ↔ Running / RunningSpeed / Passthrough, with Blocked as the
//! stall trap. Disable reaches Stop from every mode. Recover leaves Blocked
//! for the regulating mode that stalled.

use pilot_common::motion::ControlMode;

/// Result of a mode transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeTransition {
    /// Transition succeeded: previous and new mode.
    Ok {
        from: ControlMode,
        to: ControlMode,
    },
    /// Transition rejected: reason.
    Rejected(&'static str),
}

impl ModeTransition {
    /// The mode actually changed.
    pub fn changed(&self) -> bool {
        matches!(self, ModeTransition::Ok { from, to } if from != to)
    }
}

/// Event that can trigger a mode transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeEvent {
    /// Release the actuators and hold the engine in Stop.
    Disable,
    /// Leave Stop.
    Enable,
    /// A pose target was issued.
    PoseTarget,
    /// A speed-only target was issued.
    SpeedTarget,
    /// Forward speed orders without regulation.
    Passthrough,
    /// Drop the active command and hold zero.
    Release,
    /// Stall detected by the cycle.
    Blocked,
    /// Operator acknowledged a stall; resume the command that stalled.
    Recover,
}

impl ModeEvent {
    /// Mode requested by a caller, as the event that leads there.
    pub fn for_mode(mode: ControlMode) -> Self {
        match mode {
            ControlMode::Stop => ModeEvent::Disable,
            ControlMode::Idle => ModeEvent::Release,
            ControlMode::Blocked => ModeEvent::Blocked,
            ControlMode::Running => ModeEvent::PoseTarget,
            ControlMode::RunningSpeed => ModeEvent::SpeedTarget,
            ControlMode::Passthrough => ModeEvent::Passthrough,
        }
    }
}

/// Run-mode holder.
#[derive(Debug, Clone)]
pub struct ModeMachine {
    mode: ControlMode,
    /// Regulating mode that entered Blocked; where Recover returns.
    resume: ControlMode,
}

impl Default for ModeMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeMachine {
    /// Start in Stop.
    pub const fn new() -> Self {
        Self {
            mode: ControlMode::Stop,
            resume: ControlMode::Running,
        }
    }

    #[inline]
    pub const fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Mode a Recover event returns to.
    #[inline]
    pub const fn resume_mode(&self) -> ControlMode {
        self.resume
    }

    /// Attempt a transition given an event.
    pub fn handle_event(&mut self, event: ModeEvent) -> ModeTransition {
        use ControlMode::*;
        use ModeEvent as E;

        let from = self.mode;
        let next = match (from, event) {
            // any → Stop
            (_, E::Disable) => Stop,

            // Stop → Idle
            (Stop, E::Enable) => Idle,

            // Idle → regulated / forwarded modes
            (Idle, E::PoseTarget) => Running,
            (Idle, E::SpeedTarget) => RunningSpeed,
            (Idle, E::Passthrough) => Passthrough,

            // Retargeting while regulating
            (Running | RunningSpeed, E::PoseTarget) => Running,
            (Running | RunningSpeed, E::SpeedTarget) => RunningSpeed,

            // Stall
            (Running | RunningSpeed, E::Blocked) => {
                self.resume = from;
                Blocked
            }

            // Release back to Idle
            (Running | RunningSpeed | Passthrough, E::Release) => Idle,

            // Recovery: resume the stalled command, or take a new pose
            (Blocked, E::Recover) => self.resume,
            (Blocked, E::PoseTarget) => Running,

            _ => return ModeTransition::Rejected(invalid_transition_reason(from, event)),
        };

        self.mode = next;
        ModeTransition::Ok { from, to: next }
    }

    /// Force Stop regardless of the current mode.
    #[inline]
    pub fn force_stop(&mut self) {
        self.mode = ControlMode::Stop;
    }

    /// Force Idle; used when a command is aborted by timeout.
    #[inline]
    pub fn force_idle(&mut self) {
        if self.mode != ControlMode::Stop {
            self.mode = ControlMode::Idle;
        }
    }
}

fn invalid_transition_reason(mode: ControlMode, event: ModeEvent) -> &'static str {
    use ControlMode::*;
    match (mode, event) {
        (Stop, _) => "Stop: only Enable allowed",
        (Blocked, _) => "Blocked: only Recover, PoseTarget or Disable allowed",
        (Idle, ModeEvent::Blocked) => "Idle: nothing to block",
        (Idle, _) => "Idle: already enabled",
        (Passthrough, _) => "Passthrough: only Release or Disable allowed",
        (Running | RunningSpeed, _) => "Running: invalid event for current mode",
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
