//! Unlock gate: download actions stay hidden until the user has gone
//! through every unlock step and waited out each step's countdown.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GateState {
    Idle,
    Counting { step: u32, remaining: u32 },
    ReadyForNext { step: u32 },
    Unlocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockGate {
    steps: u32,
    countdown: u32,
    state: GateState,
}

impl UnlockGate {
    pub fn new(steps: u32, countdown: u32) -> Self {
        Self {
            steps,
            countdown,
            state: Self::initial_state(steps),
        }
    }

    fn initial_state(steps: u32) -> GateState {
        if steps == 0 {
            GateState::Unlocked
        } else {
            GateState::Idle
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == GateState::Unlocked
    }

    pub fn is_counting(&self) -> bool {
        matches!(self.state, GateState::Counting { .. })
    }

    /// The step whose countdown is running, if any.
    pub fn counting_step(&self) -> Option<u32> {
        match self.state {
            GateState::Counting { step, .. } => Some(step),
            _ => None,
        }
    }

    /// The step a trigger would currently be accepted for.
    pub fn next_step(&self) -> Option<u32> {
        match self.state {
            GateState::Idle => Some(1),
            GateState::ReadyForNext { step } => Some(step),
            GateState::Counting { .. } | GateState::Unlocked => None,
        }
    }

    /// Starts the countdown for `step`. Returns false and leaves the state
    /// untouched unless the gate sits right before `step`.
    pub fn trigger(&mut self, step: u32) -> bool {
        if self.next_step() != Some(step) {
            return false;
        }
        self.state = GateState::Counting {
            step,
            remaining: self.countdown,
        };
        if self.countdown == 0 {
            self.finish_step(step);
        }
        true
    }

    /// One second elapsed. Returns true when the state changed.
    pub fn tick(&mut self) -> bool {
        let GateState::Counting { step, remaining } = self.state else {
            return false;
        };
        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            self.finish_step(step);
        } else {
            self.state = GateState::Counting { step, remaining };
        }
        true
    }

    fn finish_step(&mut self, step: u32) {
        self.state = if step >= self.steps {
            GateState::Unlocked
        } else {
            GateState::ReadyForNext { step: step + 1 }
        };
    }

    pub fn reset(&mut self) {
        self.state = Self::initial_state(self.steps);
    }
}
