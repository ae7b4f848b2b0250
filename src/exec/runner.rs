// src/exec/runner.rs

//! Pluggable attempt execution.
//!
//! Supervisors and the setup/shutdown phases run attempts through an
//! [`AttemptRunner`] instead of calling [`run_attempt`] directly, so tests can
//! substitute scripted outcomes for real processes.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::config::CommandSpec;
use crate::termination::StopSignals;

use super::attempt::{AttemptIo, AttemptOutcome, run_attempt};

/// Runs one attempt of a command.
pub trait AttemptRunner: Send + Sync {
    fn run_attempt<'a>(
        &'a self,
        spec: &'a CommandSpec,
        io: &'a AttemptIo,
        signals: &'a StopSignals,
    ) -> Pin<Box<dyn Future<Output = AttemptOutcome> + Send + 'a>>;
}

/// Spawns real OS processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner {
    /// Time between the terminate request and the hard kill.
    pub kill_grace: Duration,
}

impl ProcessRunner {
    pub fn new(kill_grace: Duration) -> Self {
        Self { kill_grace }
    }
}

impl AttemptRunner for ProcessRunner {
    fn run_attempt<'a>(
        &'a self,
        spec: &'a CommandSpec,
        io: &'a AttemptIo,
        signals: &'a StopSignals,
    ) -> Pin<Box<dyn Future<Output = AttemptOutcome> + Send + 'a>> {
        Box::pin(run_attempt(spec, io, signals, self.kill_grace))
    }
}
