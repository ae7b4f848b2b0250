// src/engine/phases.rs

//! Sequential setup and shutdown phases.
//!
//! Each command runs to completion (including its retries) before the next
//! one starts. These phases never observe the stop broadcast: a setup
//! command that hangs is only bounded by its own `duration`.

use std::fmt;

use tracing::{info, warn};

use crate::config::CommandSpec;
use crate::errors::{ProcmuxError, Result};
use crate::exec::{AttemptIo, AttemptOutcome, AttemptRunner};
use crate::output::{BASE_PANEL_NAME, OutputRouter};
use crate::termination::StopSignals;

use super::restart::RestartState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Shutdown,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Output wiring for a phase command: both streams land in the base region,
/// prefixed with the phase and command name.
pub fn phase_io(phase: Phase, spec: &CommandSpec, router: &OutputRouter) -> AttemptIo {
    let label = phase.label();
    let name = &spec.name;
    let stdout = router.line_writer(BASE_PANEL_NAME, None, &format!("[{label}:{name}] "));
    let stderr = router.line_writer(BASE_PANEL_NAME, None, &format!("[{label}:{name} stderr] "));
    AttemptIo::new(format!("{label}:{name}"))
        .with_stdout(stdout)
        .with_stderr(stderr)
}

/// Run every setup command in order. The first one that exhausts its retries
/// aborts the whole run.
pub async fn run_setup(
    commands: &[CommandSpec],
    router: &OutputRouter,
    runner: &dyn AttemptRunner,
) -> Result<()> {
    if commands.is_empty() {
        return Ok(());
    }
    info!(count = commands.len(), "running setup commands");

    for spec in commands {
        let io = phase_io(Phase::Setup, spec, router);
        if !run_to_completion(spec, &io, runner).await {
            return Err(ProcmuxError::SetupFailure {
                command: spec.name.clone(),
            });
        }
    }

    info!("setup finished");
    Ok(())
}

/// Run every shutdown command in order. Failures are logged and skipped.
pub async fn run_shutdown(commands: &[CommandSpec], router: &OutputRouter, runner: &dyn AttemptRunner) {
    if commands.is_empty() {
        return;
    }
    info!(count = commands.len(), "running shutdown commands");

    for spec in commands {
        let io = phase_io(Phase::Shutdown, spec, router);
        if !run_to_completion(spec, &io, runner).await {
            warn!(command = %spec.name, "shutdown command failed; continuing");
        }
    }

    info!("shutdown finished");
}

/// One command with its start delay and retries.
///
/// Returns `true` on success. Hitting the deadline counts as finished.
async fn run_to_completion(spec: &CommandSpec, io: &AttemptIo, runner: &dyn AttemptRunner) -> bool {
    let signals = StopSignals::never();
    let mut restarts = RestartState::new(spec.restart_tries);
    let mut attempt = 0u32;

    if !spec.start_after.is_zero() {
        tokio::time::sleep(spec.start_after).await;
    }

    loop {
        attempt += 1;
        info!(command = %io.identifier, attempt, "running");

        let exit = match runner.run_attempt(spec, io, &signals).await {
            AttemptOutcome::Exited(exit) => exit,
            AttemptOutcome::Interrupted(_) => {
                warn!(command = %io.identifier, "interrupted");
                return false;
            }
        };

        if exit.timed_out {
            info!(command = %io.identifier, "deadline reached; treating as finished");
            return true;
        }
        if exit.is_success() {
            return true;
        }

        if restarts.should_restart(&exit) {
            warn!(
                command = %io.identifier,
                attempt = attempt + 1,
                remaining = restarts.remaining(),
                "retrying after failure"
            );
            if !spec.restart_after.is_zero() {
                tokio::time::sleep(spec.restart_after).await;
            }
            continue;
        }

        let reason = exit.error.map(|e| e.to_string()).unwrap_or_default();
        warn!(command = %io.identifier, attempts = attempt, reason = %reason, "giving up");
        return false;
    }
}
