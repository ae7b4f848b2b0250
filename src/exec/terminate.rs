// src/exec/terminate.rs

//! Two-step process termination: terminate request, then a timed hard kill.

use std::time::Duration;

use tokio::process::Child;
use tracing::{debug, warn};

use crate::termination::StopSignals;

/// How an interrupted process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Exited on its own within the grace period.
    Graceful,
    /// Hard-killed (grace expired, force fired, or no grace configured).
    Killed,
}

/// Ask `child` to exit, then race `kill_grace` and the force broadcast
/// against its exit. A zero grace kills immediately.
pub async fn terminate_child(
    child: &mut Child,
    kill_grace: Duration,
    signals: &StopSignals,
) -> Termination {
    request_exit(child);

    if kill_grace.is_zero() {
        hard_kill(child).await;
        return Termination::Killed;
    }

    tokio::select! {
        status = child.wait() => {
            debug!(?status, "process exited within grace period");
            Termination::Graceful
        }
        _ = signals.forced() => {
            debug!("force requested during grace period; killing");
            hard_kill(child).await;
            Termination::Killed
        }
        _ = tokio::time::sleep(kill_grace) => {
            debug!(grace_ms = kill_grace.as_millis() as u64, "grace period expired; killing");
            hard_kill(child).await;
            Termination::Killed
        }
    }
}

#[cfg(unix)]
fn request_exit(child: &Child) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };
    #[allow(clippy::cast_possible_wrap)]
    let target = Pid::from_raw(pid as i32);
    if let Err(e) = kill(target, Signal::SIGTERM) {
        debug!(pid, error = %e, "SIGTERM delivery failed");
    }
}

#[cfg(not(unix))]
fn request_exit(_child: &Child) {}

async fn hard_kill(child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill child process");
    }
}
