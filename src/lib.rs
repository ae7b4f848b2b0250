// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod output;
pub mod termination;

use std::io::Read;
use std::sync::Arc;

use anyhow::Result;
use tracing::{error, warn};

use crate::config::load_and_validate;
use crate::engine::Orchestrator;
use crate::errors::ProcmuxError;
use crate::output::{OutputRouter, Palette};
use crate::termination::{InterruptHandler, TerminationCoordinator};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading from `input`
/// - the output router and the log subscriber on top of it
/// - the termination coordinator (SIGINT/SIGTERM)
/// - the orchestrator (setup, main commands, shutdown)
///
/// The router is always torn down before returning so the terminal is
/// restored before any error is printed.
pub async fn run(input: impl Read) -> Result<()> {
    let config = load_and_validate(input)?;

    let palette = Palette::new(config.no_colors);
    let router = OutputRouter::new(config.enable_tui, &config.commands, &palette)
        .map_err(ProcmuxError::OutputInit)?;

    let ansi = !config.no_colors && !router.is_multi_pane();
    if let Err(e) = logging::init_logging(router.base_writer(), ansi) {
        close_router(&router).await;
        return Err(e);
    }

    let coordinator = TerminationCoordinator::new(Some(interrupt_handler(router.clone())));

    let result = Orchestrator::new(config, router.clone())
        .run(&coordinator)
        .await;

    coordinator.shutdown().await;
    close_router(&router).await;

    result.map(|_| ()).map_err(Into::into)
}

fn interrupt_handler(router: OutputRouter) -> InterruptHandler {
    Arc::new(move |signal, immediate| {
        if immediate {
            error!(%signal, "forcing termination");
            router.stop();
        } else {
            warn!(%signal, "interrupt received, stopping all processes");
        }
    })
}

async fn close_router(router: &OutputRouter) {
    router.stop();
    router.wait().await;
}
