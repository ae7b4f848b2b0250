// src/engine/restart.rs

//! Restart decision for one command.
//!
//! This is the only place the retry counter is mutated. It is owned by a
//! single supervisor (or phase runner) and never shared.

use crate::exec::AttemptExit;

/// Remaining-retries counter plus the configured budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartState {
    /// Negative = unlimited, 0 = never restart, N = N restarts after the
    /// first attempt.
    budget: i32,
    remaining: i32,
}

impl RestartState {
    pub fn new(budget: i32) -> Self {
        Self {
            budget,
            remaining: budget.max(0),
        }
    }

    pub fn budget(&self) -> i32 {
        self.budget
    }

    pub fn remaining(&self) -> i32 {
        self.remaining
    }

    pub fn is_unlimited(&self) -> bool {
        self.budget < 0
    }

    /// Decide whether `exit` warrants another attempt.
    pub fn should_restart(&mut self, exit: &AttemptExit) -> bool {
        self.decide(exit.error.is_some(), exit.timed_out)
    }

    /// Same decision on the raw facts.
    ///
    /// Success never restarts; a timeout never restarts regardless of the
    /// budget; an unlimited budget always restarts a failure without touching
    /// the counter; otherwise one retry is consumed if any is left.
    pub fn decide(&mut self, failed: bool, timed_out: bool) -> bool {
        if !failed || timed_out {
            return false;
        }
        if self.is_unlimited() {
            return true;
        }
        if self.remaining > 0 {
            self.remaining -= 1;
            return true;
        }
        false
    }
}
