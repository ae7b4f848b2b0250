// src/exec/attempt.rs

//! A single run of one command.
//!
//! An attempt spawns the process, streams its output, and then waits on
//! three things at once: the process exiting, the optional deadline, and the
//! shared stop broadcast. Only the stop broadcast leads to the two-step
//! termination in [`super::terminate`].

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::CommandSpec;
use crate::output::LineWriter;
use crate::termination::StopSignals;

use super::stream::spawn_line_stream;
use super::terminate::{Termination, terminate_child};

/// How long to wait for output tasks to flush after the process has exited.
const OUTPUT_DRAIN: Duration = Duration::from_millis(250);

/// Why an attempt did not succeed.
#[derive(Debug, Error)]
pub enum ExitError {
    #[error("failed to start: {0}")]
    Launch(#[source] io::Error),

    #[error("{}", describe_status(.code, .signal))]
    Status {
        code: Option<i32>,
        signal: Option<i32>,
    },

    #[error("waiting for process failed: {0}")]
    Wait(#[source] io::Error),
}

impl ExitError {
    /// A plain non-zero exit, mostly for fakes and tests.
    pub fn code(code: i32) -> Self {
        ExitError::Status {
            code: Some(code),
            signal: None,
        }
    }

    fn from_status(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        ExitError::Status {
            code: status.code(),
            signal,
        }
    }
}

fn describe_status(code: &Option<i32>, signal: &Option<i32>) -> String {
    match (*code, *signal) {
        (Some(code), _) => format!("exit status {code}"),
        (None, Some(signal)) => format!("terminated by signal {signal}"),
        (None, None) => "exited abnormally".to_string(),
    }
}

/// Result of an attempt that ran to its own end (or its deadline).
#[derive(Debug, Default)]
pub struct AttemptExit {
    pub error: Option<ExitError>,
    /// The deadline, not a normal failure, ended the process.
    pub timed_out: bool,
}

impl AttemptExit {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn failed(error: ExitError) -> Self {
        Self {
            error: Some(error),
            timed_out: false,
        }
    }

    pub fn timed_out() -> Self {
        Self {
            error: Some(ExitError::Status {
                code: None,
                signal: None,
            }),
            timed_out: true,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug)]
pub enum AttemptOutcome {
    Exited(AttemptExit),
    /// The stop broadcast fired while the process was running.
    Interrupted(Termination),
}

/// Output wiring and diagnostic identity for one attempt.
#[derive(Clone, Default)]
pub struct AttemptIo {
    pub identifier: String,
    pub stdout: Option<LineWriter>,
    pub stderr: Option<LineWriter>,
}

impl AttemptIo {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Self::default()
        }
    }

    pub fn with_stdout(mut self, writer: LineWriter) -> Self {
        self.stdout = Some(writer);
        self
    }

    pub fn with_stderr(mut self, writer: LineWriter) -> Self {
        self.stderr = Some(writer);
        self
    }

    /// Write a note about the command where its output goes: stderr writer,
    /// then stdout writer, then the system log.
    pub fn note(&self, message: &str) {
        if let Some(writer) = self.stderr.as_ref().or(self.stdout.as_ref()) {
            writer(message);
        } else {
            warn!(command = %self.identifier, "{message}");
        }
    }
}

impl std::fmt::Debug for AttemptIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttemptIo")
            .field("identifier", &self.identifier)
            .field("stdout", &self.stdout.is_some())
            .field("stderr", &self.stderr.is_some())
            .finish()
    }
}

/// Run `spec` once.
///
/// Spawn failures come back as an `Exited` outcome carrying
/// [`ExitError::Launch`], so they go through the same restart decision as
/// any other failure.
pub async fn run_attempt(
    spec: &CommandSpec,
    io: &AttemptIo,
    signals: &StopSignals,
    kill_grace: Duration,
) -> AttemptOutcome {
    let mut child = match spawn(spec) {
        Ok(child) => child,
        Err(e) => {
            io.note(&format!("failed to start: {e}"));
            warn!(command = %io.identifier, program = %spec.program, error = %e, "failed to start process");
            return AttemptOutcome::Exited(AttemptExit::failed(ExitError::Launch(e)));
        }
    };

    info!(
        command = %io.identifier,
        pid = child.id(),
        program = %spec.program,
        args = ?spec.args,
        "process started"
    );

    let streams = if spec.silent {
        Vec::new()
    } else {
        attach_streams(&mut child, io)
    };
    let deadline = spec.deadline().map(|d| Instant::now() + d);

    tokio::select! {
        status = child.wait() => {
            drain_output(streams, &io.identifier).await;
            AttemptOutcome::Exited(classify(&io.identifier, status, false))
        }

        _ = until(deadline) => {
            debug!(command = %io.identifier, "deadline exceeded; killing process");
            if let Err(e) = child.start_kill() {
                debug!(command = %io.identifier, error = %e, "kill after deadline failed");
            }
            let status = child.wait().await;
            drain_output(streams, &io.identifier).await;
            AttemptOutcome::Exited(classify(&io.identifier, status, true))
        }

        _ = signals.stopped() => {
            io.note("interrupted");
            info!(command = %io.identifier, "stop requested; terminating process");
            let termination = terminate_child(&mut child, kill_grace, signals).await;
            debug!(command = %io.identifier, ?termination, "process terminated");
            AttemptOutcome::Interrupted(termination)
        }
    }
}

fn spawn(spec: &CommandSpec) -> io::Result<Child> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .envs(&spec.env)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    if spec.silent {
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
    } else {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    }

    cmd.spawn()
}

fn attach_streams(child: &mut Child, io: &AttemptIo) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        handles.push(spawn_line_stream(
            stdout,
            io.stdout.clone(),
            io.identifier.clone(),
            "stdout",
        ));
    }
    if let Some(stderr) = child.stderr.take() {
        handles.push(spawn_line_stream(
            stderr,
            io.stderr.clone(),
            io.identifier.clone(),
            "stderr",
        ));
    }
    handles
}

/// Give output tasks a short window to flush trailing lines. A grandchild
/// holding the pipe open must not block the attempt, so stragglers are left
/// to finish on their own.
async fn drain_output(handles: Vec<JoinHandle<()>>, identifier: &str) {
    let joined = tokio::time::timeout(OUTPUT_DRAIN, async {
        for handle in handles {
            let _ = handle.await;
        }
    })
    .await;
    if joined.is_err() {
        debug!(command = %identifier, "output still open after exit; detaching readers");
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn classify(identifier: &str, status: io::Result<ExitStatus>, timed_out: bool) -> AttemptExit {
    let error = match status {
        Ok(status) if status.success() => None,
        Ok(status) => Some(ExitError::from_status(status)),
        Err(e) => Some(ExitError::Wait(e)),
    };

    match &error {
        None => info!(command = %identifier, timed_out, "process exited successfully"),
        Some(e) => info!(command = %identifier, timed_out, error = %e, "process exited with error"),
    }

    AttemptExit { error, timed_out }
}
