// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`attempt`] runs one command once: spawn, stream output, enforce the
//!   deadline, react to the stop broadcast.
//! - [`stream`] forwards a child's stdout/stderr line by line.
//! - [`terminate`] implements terminate-request-then-hard-kill.
//! - [`runner`] provides the [`AttemptRunner`] seam used by the engine, with
//!   the real [`ProcessRunner`] implementation.

pub mod attempt;
pub mod runner;
pub mod stream;
pub mod terminate;

pub use attempt::{AttemptExit, AttemptIo, AttemptOutcome, ExitError, run_attempt};
pub use runner::{AttemptRunner, ProcessRunner};
pub use terminate::Termination;
