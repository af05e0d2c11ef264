// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/seizure-sentinel

//! Alert state machine with strict persistence and cooldown

use serde::{Deserialize, Serialize};
use tracing::debug;

const TIME_EPSILON: f64 = 1e-9;

/// Alert lifecycle of one monitoring session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlertState {
    #[default]
    Idle,
    Suspect,
    /// Transient: entered and left within the same evaluation
    Alert,
    Cooldown,
}

/// Result of one transition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub from: AlertState,
    pub to: AlertState,
    /// Consecutive elevated frames at the end of the step
    pub consecutive: u32,
    /// Passed through `Alert` during this step
    pub alerted: bool,
}

/// Transition function for `AlertState`
#[derive(Debug, Clone)]
pub struct AlertStateMachine {
    state: AlertState,
    consecutive: u32,
    persistence: u32,
    cooldown_secs: f64,
    cooldown_started: Option<f64>,
}

impl AlertStateMachine {
    pub fn new(persistence: u32, cooldown_secs: f64) -> Self {
        Self {
            state: AlertState::Idle,
            consecutive: 0,
            persistence: persistence.max(1),
            cooldown_secs,
            cooldown_started: None,
        }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// Advance one processed frame.
    ///
    /// A single non-elevated frame resets the run; cooldown ends on time alone.
    pub fn step(&mut self, now: f64, elevated: bool) -> StepOutcome {
        let from = self.state;
        let mut alerted = false;
        let mut run = 0;

        match self.state {
            AlertState::Idle | AlertState::Suspect if elevated => {
                self.consecutive += 1;
                run = self.consecutive;
                if self.consecutive >= self.persistence {
                    self.state = AlertState::Alert;
                    alerted = true;
                    self.enter_cooldown(now);
                } else {
                    self.state = AlertState::Suspect;
                }
            }
            AlertState::Idle | AlertState::Suspect => {
                self.state = AlertState::Idle;
                self.consecutive = 0;
            }
            AlertState::Alert => self.enter_cooldown(now),
            AlertState::Cooldown => {
                let started = self.cooldown_started.unwrap_or(now);
                if now - started + TIME_EPSILON >= self.cooldown_secs {
                    self.state = AlertState::Idle;
                    self.consecutive = 0;
                    self.cooldown_started = None;
                }
            }
        }

        if from != self.state || alerted {
            debug!(
                "alert state {:?} -> {:?} at t={:.3} (run={})",
                from, self.state, now, run
            );
        }

        StepOutcome {
            from,
            to: self.state,
            consecutive: if alerted { run } else { self.consecutive },
            alerted,
        }
    }

    fn enter_cooldown(&mut self, now: f64) {
        self.state = AlertState::Cooldown;
        self.consecutive = 0;
        self.cooldown_started = Some(now);
    }

    /// Seconds of cooldown left, if cooling down
    pub fn cooldown_remaining(&self, now: f64) -> Option<f64> {
        match (self.state, self.cooldown_started) {
            (AlertState::Cooldown, Some(started)) => Some((self.cooldown_secs - (now - started)).max(0.0)),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.state = AlertState::Idle;
        self.consecutive = 0;
        self.cooldown_started = None;
    }
}
