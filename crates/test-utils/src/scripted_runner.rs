use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use procmux::config::CommandSpec;
use procmux::exec::{
    AttemptExit, AttemptIo, AttemptOutcome, AttemptRunner, ExitError, Termination,
};
use procmux::termination::StopSignals;

/// What one scripted attempt does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedStep {
    Succeed,
    Fail(i32),
    FailToStart,
    TimeOut,
    /// Keep "running" until the stop broadcast fires.
    UntilStopped,
    /// Run for `Duration` (stoppable), then behave like the inner step.
    After(Duration, Box<ScriptedStep>),
}

impl ScriptedStep {
    pub fn after(delay: Duration, step: ScriptedStep) -> Self {
        ScriptedStep::After(delay, Box::new(step))
    }
}

/// A recorded attempt.
#[derive(Debug, Clone)]
pub struct ScriptedCall {
    pub identifier: String,
    pub at: Instant,
}

/// An `AttemptRunner` that:
/// - records every attempt (identifier + start time)
/// - plays back per-command scripts, falling back to a default step.
pub struct ScriptedRunner {
    scripts: Mutex<HashMap<String, VecDeque<ScriptedStep>>>,
    fallback: ScriptedStep,
    calls: Mutex<Vec<ScriptedCall>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback: ScriptedStep::Succeed,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Steps for successive attempts of the command called `name`.
    pub fn script(self, name: &str, steps: impl IntoIterator<Item = ScriptedStep>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(name.to_string(), steps.into_iter().collect());
        self
    }

    /// Step used once a command's script is exhausted.
    pub fn otherwise(mut self, step: ScriptedStep) -> Self {
        self.fallback = step;
        self
    }

    pub fn calls(&self) -> Vec<ScriptedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.identifier).collect()
    }

    pub fn attempts_for(&self, identifier: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.identifier == identifier)
            .count()
    }

    fn next_step(&self, name: &str) -> ScriptedStep {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(name)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl AttemptRunner for ScriptedRunner {
    fn run_attempt<'a>(
        &'a self,
        spec: &'a CommandSpec,
        io: &'a AttemptIo,
        signals: &'a StopSignals,
    ) -> Pin<Box<dyn Future<Output = AttemptOutcome> + Send + 'a>> {
        self.calls.lock().unwrap().push(ScriptedCall {
            identifier: io.identifier.clone(),
            at: Instant::now(),
        });
        let mut step = self.next_step(&spec.name);

        Box::pin(async move {
            let mut delay = Duration::ZERO;
            loop {
                match step {
                    ScriptedStep::After(d, inner) => {
                        delay += d;
                        step = *inner;
                    }
                    other => {
                        step = other;
                        break;
                    }
                }
            }

            if !delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = signals.stopped() => {
                        io.note("interrupted");
                        return AttemptOutcome::Interrupted(Termination::Graceful);
                    }
                }
            }

            match step {
                ScriptedStep::Succeed => AttemptOutcome::Exited(AttemptExit::success()),
                ScriptedStep::Fail(code) => {
                    AttemptOutcome::Exited(AttemptExit::failed(ExitError::code(code)))
                }
                ScriptedStep::FailToStart => {
                    let err = io::Error::new(io::ErrorKind::NotFound, "scripted launch failure");
                    io.note(&format!("failed to start: {err}"));
                    AttemptOutcome::Exited(AttemptExit::failed(ExitError::Launch(err)))
                }
                ScriptedStep::TimeOut => AttemptOutcome::Exited(AttemptExit::timed_out()),
                ScriptedStep::UntilStopped => {
                    signals.stopped().await;
                    io.note("interrupted");
                    AttemptOutcome::Interrupted(Termination::Graceful)
                }
                ScriptedStep::After(..) => unreachable!("flattened above"),
            }
        })
    }
}
