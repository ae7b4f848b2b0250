// src/engine/supervisor.rs

//! Per-command lifecycle.
//!
//! ```text
//! Idle -> AwaitingStartDelay -> Running -> Terminal
//!                                  |  ^
//!                                  v  |
//!                  RestartScheduled -> AwaitingRestartDelay
//! ```
//!
//! Every suspension point (start delay, restart delay, running attempt) also
//! waits on the stop broadcast, so a stop preempts whichever one is pending.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::CommandSpec;
use crate::exec::{AttemptIo, AttemptOutcome, AttemptRunner, Termination};
use crate::termination::{StopRequester, StopSignals};

use super::restart::RestartState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    AwaitingStartDelay,
    Running,
    RestartScheduled,
    AwaitingRestartDelay,
    Terminal,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SupervisorState::Idle => "idle",
            SupervisorState::AwaitingStartDelay => "awaiting-start-delay",
            SupervisorState::Running => "running",
            SupervisorState::RestartScheduled => "restart-scheduled",
            SupervisorState::AwaitingRestartDelay => "awaiting-restart-delay",
            SupervisorState::Terminal => "terminal",
        };
        f.write_str(s)
    }
}

/// How supervision of one command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorOutcome {
    /// Stop fired during the start delay; nothing was launched.
    AbortedBeforeLaunch,
    /// Stop fired during a restart delay.
    AbortedBeforeRestart,
    Completed,
    /// Last attempt failed and no retries were left.
    Failed,
    TimedOut,
    /// Stop fired while the process was running.
    Interrupted { forced: bool },
}

impl fmt::Display for SupervisorOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorOutcome::AbortedBeforeLaunch => f.write_str("aborted before launch"),
            SupervisorOutcome::AbortedBeforeRestart => f.write_str("aborted before restart"),
            SupervisorOutcome::Completed => f.write_str("completed"),
            SupervisorOutcome::Failed => f.write_str("failed"),
            SupervisorOutcome::TimedOut => f.write_str("timed out"),
            SupervisorOutcome::Interrupted { forced: false } => f.write_str("interrupted"),
            SupervisorOutcome::Interrupted { forced: true } => f.write_str("interrupted (killed)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorReport {
    pub command: String,
    pub outcome: SupervisorOutcome,
    /// Attempts actually launched.
    pub attempts: u32,
}

pub struct Supervisor {
    spec: CommandSpec,
    io: AttemptIo,
    runner: Arc<dyn AttemptRunner>,
    signals: StopSignals,
    kill_others: Option<StopRequester>,
    restarts: RestartState,
    state: SupervisorState,
    attempts: u32,
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("command", &self.spec.name)
            .field("state", &self.state)
            .field("attempts", &self.attempts)
            .field("restarts", &self.restarts)
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    pub fn new(
        spec: CommandSpec,
        io: AttemptIo,
        runner: Arc<dyn AttemptRunner>,
        signals: StopSignals,
    ) -> Self {
        let restarts = RestartState::new(spec.restart_tries);
        Self {
            spec,
            io,
            runner,
            signals,
            kill_others: None,
            restarts,
            state: SupervisorState::Idle,
            attempts: 0,
        }
    }

    /// Fire the global stop through `requester` when this command exits
    /// without restarting.
    pub fn with_kill_others(mut self, requester: StopRequester) -> Self {
        self.kill_others = Some(requester);
        self
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Drive the command to a terminal state.
    pub async fn run(mut self) -> SupervisorReport {
        self.transition(SupervisorState::AwaitingStartDelay);
        if self.signals.sleep(self.spec.start_after).await {
            return self.finish(SupervisorOutcome::AbortedBeforeLaunch);
        }

        loop {
            self.transition(SupervisorState::Running);
            self.attempts += 1;

            let outcome = self
                .runner
                .run_attempt(&self.spec, &self.io, &self.signals)
                .await;

            let exit = match outcome {
                AttemptOutcome::Interrupted(termination) => {
                    let forced = termination == Termination::Killed;
                    return self.finish(SupervisorOutcome::Interrupted { forced });
                }
                AttemptOutcome::Exited(exit) => exit,
            };

            if self.restarts.should_restart(&exit) {
                self.transition(SupervisorState::RestartScheduled);
                self.log_restart(exit.error.as_ref().map(ToString::to_string));

                self.transition(SupervisorState::AwaitingRestartDelay);
                if self.signals.sleep(self.spec.restart_after).await {
                    return self.finish(SupervisorOutcome::AbortedBeforeRestart);
                }
                continue;
            }

            let outcome = if exit.timed_out {
                SupervisorOutcome::TimedOut
            } else if exit.is_success() {
                SupervisorOutcome::Completed
            } else {
                SupervisorOutcome::Failed
            };

            info!(
                command = %self.spec.name,
                attempt = self.attempts,
                timed_out = exit.timed_out,
                kill_others = self.kill_others.is_some(),
                "will not restart"
            );

            if let Some(requester) = &self.kill_others {
                info!(
                    command = %self.spec.name,
                    "Stopping all processes due to killOthers triggered by '{}'",
                    self.spec.name
                );
                if !requester.request_stop() {
                    debug!(command = %self.spec.name, "stop was already requested");
                }
            }

            return self.finish(outcome);
        }
    }

    fn transition(&mut self, next: SupervisorState) {
        info!(
            command = %self.spec.name,
            from = %self.state,
            to = %next,
            attempt = self.attempts,
            "supervisor transition"
        );
        self.state = next;
    }

    fn log_restart(&self, reason: Option<String>) {
        let next = self.attempts + 1;
        let reason = reason.unwrap_or_default();
        if self.restarts.is_unlimited() {
            warn!(
                command = %self.spec.name,
                attempt = next,
                reason = %reason,
                "scheduling restart (attempt {next})"
            );
        } else {
            let total = i64::from(self.restarts.budget()) + 1;
            let remaining = self.restarts.remaining();
            warn!(
                command = %self.spec.name,
                attempt = next,
                remaining,
                reason = %reason,
                "scheduling restart (attempt {next} of {total}, remaining retries {remaining})"
            );
        }
    }

    fn finish(mut self, outcome: SupervisorOutcome) -> SupervisorReport {
        self.transition(SupervisorState::Terminal);
        info!(
            command = %self.spec.name,
            attempts = self.attempts,
            outcome = %outcome,
            "supervision finished"
        );
        SupervisorReport {
            command: self.spec.name,
            outcome,
            attempts: self.attempts,
        }
    }
}
