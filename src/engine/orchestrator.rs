// src/engine/orchestrator.rs

//! Top-level driver: setup, concurrent main phase, shutdown.

use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{CommandSpec, Config};
use crate::errors::Result;
use crate::exec::{AttemptIo, AttemptRunner, ProcessRunner};
use crate::output::{OutputRouter, Palette};
use crate::termination::TerminationCoordinator;

use super::phases::{run_setup, run_shutdown};
use super::supervisor::{Supervisor, SupervisorReport};

pub struct Orchestrator {
    config: Config,
    router: OutputRouter,
    runner: Arc<dyn AttemptRunner>,
    palette: Palette,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("commands", &self.config.commands.len())
            .field("multi_pane", &self.router.is_multi_pane())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Run real processes, with `killTimeout` as the kill grace period.
    pub fn new(config: Config, router: OutputRouter) -> Self {
        let runner = Arc::new(ProcessRunner::new(config.kill_timeout));
        let palette = Palette::new(config.no_colors);
        Self {
            config,
            router,
            runner,
            palette,
        }
    }

    /// Replace the attempt runner (tests use scripted outcomes).
    pub fn with_runner(mut self, runner: Arc<dyn AttemptRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Run every phase.
    ///
    /// Returns the main-phase reports in declaration order. Only a setup
    /// failure is an error.
    pub async fn run(&self, coordinator: &TerminationCoordinator) -> Result<Vec<SupervisorReport>> {
        info!(
            commands = self.config.commands.len(),
            setup = self.config.setup_commands.len(),
            shutdown = self.config.shutdown_commands.len(),
            kill_others = self.config.kill_others,
            "starting"
        );

        run_setup(&self.config.setup_commands, &self.router, self.runner.as_ref()).await?;

        let handles = self.spawn_supervisors(coordinator);

        // Console: every supervisor has finished. Multi-pane: the display was closed.
        self.router.wait().await;
        if coordinator.request_stop() {
            debug!("output finished; stopping any remaining processes");
        }

        let reports = join_all(handles).await;

        run_shutdown(&self.config.shutdown_commands, &self.router, self.runner.as_ref()).await;
        Ok(reports)
    }

    fn spawn_supervisors(
        &self,
        coordinator: &TerminationCoordinator,
    ) -> Vec<(String, JoinHandle<SupervisorReport>)> {
        self.config
            .commands
            .iter()
            .enumerate()
            .map(|(idx, spec)| {
                let mut supervisor = Supervisor::new(
                    spec.clone(),
                    self.command_io(idx, spec),
                    Arc::clone(&self.runner),
                    coordinator.signals(),
                );
                if self.config.kill_others {
                    supervisor = supervisor.with_kill_others(coordinator.stop_requester());
                }

                let guard = self.router.track();
                let handle = tokio::spawn(async move {
                    let _guard = guard;
                    supervisor.run().await
                });
                (spec.name.clone(), handle)
            })
            .collect()
    }

    fn command_io(&self, idx: usize, spec: &CommandSpec) -> AttemptIo {
        let color = self.palette.color_for(idx);
        let (out_prefix, err_prefix) = self.router.command_prefixes(&spec.name);
        AttemptIo::new(spec.name.clone())
            .with_stdout(self.router.line_writer(&spec.name, color, &out_prefix))
            .with_stderr(self.router.line_writer(&spec.name, color, &err_prefix))
    }
}

async fn join_all(handles: Vec<(String, JoinHandle<SupervisorReport>)>) -> Vec<SupervisorReport> {
    let mut reports = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        match handle.await {
            Ok(report) => reports.push(report),
            Err(e) => warn!(command = %name, error = %e, "supervisor task failed"),
        }
    }
    reports
}
