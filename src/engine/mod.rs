// src/engine/mod.rs

//! Supervision engine.
//!
//! - [`restart`]: the per-command retry decision.
//! - [`supervisor`]: the per-command lifecycle state machine.
//! - [`phases`]: strictly sequential setup and shutdown commands.
//! - [`orchestrator`]: setup, then one supervisor per main command running
//!   concurrently, the global join, then shutdown.

pub mod orchestrator;
pub mod phases;
pub mod restart;
pub mod supervisor;

pub use orchestrator::Orchestrator;
pub use phases::{Phase, run_setup, run_shutdown};
pub use restart::RestartState;
pub use supervisor::{Supervisor, SupervisorOutcome, SupervisorReport, SupervisorState};
