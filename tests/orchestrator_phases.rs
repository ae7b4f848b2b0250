// tests/orchestrator_phases.rs

use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::Instant;

use procmux::config::CommandSpec;
use procmux::engine::{Orchestrator, SupervisorOutcome};
use procmux::errors::ProcmuxError;
use procmux::termination::{Interrupt, TerminationCoordinator};
use procmux_test_utils::builders::{CommandSpecBuilder, ConfigBuilder};
use procmux_test_utils::scripted_runner::{ScriptedRunner, ScriptedStep};
use procmux_test_utils::{CaptureBuffer, capture_router, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn coordinator() -> (TerminationCoordinator, mpsc::Sender<Interrupt>) {
    let (tx, rx) = mpsc::channel(4);
    (TerminationCoordinator::with_source(rx, None), tx)
}

/// `sh -c 'echo <word> >> <log>'` named `name`.
fn append(name: &str, word: &str, log: &Path) -> CommandSpec {
    CommandSpecBuilder::new(name, "sh")
        .args(&["-c", &format!("echo {word} >> '{}'", log.display())])
        .build()
}

fn read_log(log: &Path) -> Vec<String> {
    std::fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[cfg(unix)]
#[tokio::test]
async fn setup_then_main_then_shutdown() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let log = dir.path().join("order.log");

    let config = ConfigBuilder::new()
        .setup(append("prep-1", "setup-1", &log))
        .setup(append("prep-2", "setup-2", &log))
        .command(
            CommandSpecBuilder::new("main", "sh")
                .args(&["-c", &format!("sleep 0.05; echo main >> '{}'", log.display())])
                .build(),
        )
        .shutdown(append("cleanup", "shutdown", &log))
        .build();

    let out = CaptureBuffer::new();
    let err = CaptureBuffer::new();
    let (coordinator, _tx) = coordinator();

    let reports = with_timeout(Orchestrator::new(config, capture_router(&out, &err)).run(&coordinator)).await?;
    coordinator.shutdown().await;

    assert_eq!(read_log(&log), vec!["setup-1", "setup-2", "main", "shutdown"]);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].outcome, SupervisorOutcome::Completed);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn failed_setup_aborts_before_main_phase() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let log = dir.path().join("order.log");

    let config = ConfigBuilder::new()
        .setup(CommandSpecBuilder::new("broken", "false").restart_tries(1).build())
        .command(append("main", "main", &log))
        .shutdown(append("cleanup", "shutdown", &log))
        .build();

    let out = CaptureBuffer::new();
    let err = CaptureBuffer::new();
    let (coordinator, _tx) = coordinator();

    let result = with_timeout(Orchestrator::new(config, capture_router(&out, &err)).run(&coordinator)).await;
    coordinator.shutdown().await;

    match result {
        Err(ProcmuxError::SetupFailure { command }) => assert_eq!(command, "broken"),
        other => panic!("expected setup failure, got {other:?}"),
    }
    assert!(read_log(&log).is_empty(), "nothing may run after a failed setup");
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn failed_shutdown_command_does_not_stop_the_rest() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let log = dir.path().join("order.log");

    let config = ConfigBuilder::new()
        .command(append("main", "main", &log))
        .shutdown(CommandSpecBuilder::new("broken", "false").build())
        .shutdown(append("cleanup", "shutdown", &log))
        .build();

    let out = CaptureBuffer::new();
    let err = CaptureBuffer::new();
    let (coordinator, _tx) = coordinator();

    with_timeout(Orchestrator::new(config, capture_router(&out, &err)).run(&coordinator)).await?;
    coordinator.shutdown().await;

    assert_eq!(read_log(&log), vec!["main", "shutdown"]);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn console_output_is_prefixed_per_command_and_phase() -> TestResult {
    init_tracing();
    let config = ConfigBuilder::new()
        .setup(CommandSpecBuilder::new("prep", "echo").arg("ready").build())
        .command(
            CommandSpecBuilder::new("web", "sh")
                .args(&["-c", "echo up; echo warn >&2"])
                .build(),
        )
        .build();

    let out = CaptureBuffer::new();
    let err = CaptureBuffer::new();
    let (coordinator, _tx) = coordinator();

    with_timeout(Orchestrator::new(config, capture_router(&out, &err)).run(&coordinator)).await?;
    coordinator.shutdown().await;

    let lines = out.lines();
    assert!(lines.contains(&"[setup:prep] ready".to_string()), "{lines:?}");
    assert!(lines.contains(&"[web] up".to_string()), "{lines:?}");
    assert!(lines.contains(&"[web stderr] warn".to_string()), "{lines:?}");
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn kill_others_ends_long_running_sibling_within_grace() -> TestResult {
    init_tracing();
    let config = ConfigBuilder::new()
        .command(CommandSpecBuilder::new("oneshot", "sleep").arg("0.2").build())
        .command(CommandSpecBuilder::new("server", "sleep").arg("10").build())
        .kill_others(true)
        .kill_timeout(Duration::from_secs(5))
        .build();

    let out = CaptureBuffer::new();
    let err = CaptureBuffer::new();
    let (coordinator, _tx) = coordinator();

    let started = Instant::now();
    let reports = with_timeout(Orchestrator::new(config, capture_router(&out, &err)).run(&coordinator)).await?;
    coordinator.shutdown().await;

    assert!(started.elapsed() < Duration::from_secs(4), "sibling was not stopped gracefully");
    let server = reports.iter().find(|r| r.command == "server").expect("server report");
    assert_eq!(server.outcome, SupervisorOutcome::Interrupted { forced: false });
    let oneshot = reports.iter().find(|r| r.command == "oneshot").expect("oneshot report");
    assert_eq!(oneshot.outcome, SupervisorOutcome::Completed);
    Ok(())
}

#[tokio::test]
async fn scripted_run_records_phase_identifiers_in_order() -> TestResult {
    init_tracing();
    let runner = Arc::new(
        ScriptedRunner::new()
            .script("db", [ScriptedStep::Fail(1), ScriptedStep::Succeed])
            .script("api", [ScriptedStep::TimeOut]),
    );
    let config = ConfigBuilder::new()
        .setup(CommandSpecBuilder::new("db", "db").restart_tries(1).build())
        .setup(CommandSpecBuilder::new("api", "api").build())
        .command(CommandSpecBuilder::new("app", "app").build())
        .shutdown(CommandSpecBuilder::new("teardown", "teardown").build())
        .build();

    let out = CaptureBuffer::new();
    let err = CaptureBuffer::new();
    let (coordinator, _tx) = coordinator();

    let reports = with_timeout(
        Orchestrator::new(config, capture_router(&out, &err))
            .with_runner(runner.clone())
            .run(&coordinator),
    )
    .await?;
    coordinator.shutdown().await;

    // A timed-out setup command counts as finished.
    assert_eq!(
        runner.identifiers(),
        vec!["setup:db", "setup:db", "setup:api", "app", "shutdown:teardown"]
    );
    assert_eq!(reports[0].outcome, SupervisorOutcome::Completed);
    Ok(())
}

#[tokio::test]
async fn interrupt_stops_main_phase_then_shutdown_still_runs() -> TestResult {
    init_tracing();
    let runner = Arc::new(ScriptedRunner::new().script("server", [ScriptedStep::UntilStopped]));
    let config = ConfigBuilder::new()
        .command(CommandSpecBuilder::new("server", "server").restart_tries(-1).build())
        .shutdown(CommandSpecBuilder::new("teardown", "teardown").build())
        .build();

    let out = CaptureBuffer::new();
    let err = CaptureBuffer::new();
    let (coordinator, tx) = coordinator();
    let orchestrator = Orchestrator::new(config, capture_router(&out, &err)).with_runner(runner.clone());

    let interrupter = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(Interrupt::Interrupt).await.ok();
    };
    let (reports, ()) = with_timeout(async { tokio::join!(orchestrator.run(&coordinator), interrupter) }).await;
    let reports = reports?;
    coordinator.shutdown().await;

    assert_eq!(reports[0].outcome, SupervisorOutcome::Interrupted { forced: false });
    assert_eq!(runner.identifiers(), vec!["server", "shutdown:teardown"]);
    assert!(out.lines().contains(&"[server stderr] interrupted".to_string()));
    Ok(())
}
