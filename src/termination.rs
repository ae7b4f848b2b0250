// src/termination.rs

//! Process-wide stop/force broadcasts and the interrupt escalation listener.
//!
//! A [`TerminationCoordinator`] owns two one-shot broadcasts:
//!
//! - **stop**: graceful; supervisors stop launching, running processes get
//!   a terminate request.
//! - **force**: immediate; any process still inside its grace period is
//!   hard-killed.
//!
//! Both are [`CancellationToken`]s: fired at most once, observed by any number
//! of waiters, and never reopened. Supervisors only ever see the read-only
//! [`StopSignals`] view; anything that must *request* a stop (e.g. `killOthers`)
//! holds a [`StopRequester`].
//!
//! The first external interrupt fires **stop**, the second fires **force**.
//! Any interrupt after that runs the abort hook, which by default exits the
//! process with status 130.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// An external interrupt as seen by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interrupt::Interrupt => f.write_str("SIGINT"),
            Interrupt::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Callback invoked as `(interrupt, immediate)` on every handled interrupt.
///
/// Runs on the listener task and must return quickly.
pub type InterruptHandler = Arc<dyn Fn(Interrupt, bool) + Send + Sync>;

/// Invoked for every interrupt that arrives once force has fired.
pub type AbortHook = Arc<dyn Fn(Interrupt) + Send + Sync>;

/// Exit status used when an interrupt arrives after force.
pub const ABORT_EXIT_CODE: i32 = 130;

fn exit_process(sig: Interrupt) {
    error!(signal = %sig, "interrupted again after forcing termination; exiting");
    std::process::exit(ABORT_EXIT_CODE);
}

/// Where interrupts come from.
///
/// Production uses [`OsInterrupts`]; tests feed an `mpsc::Receiver<Interrupt>`.
pub trait InterruptSource: Send + 'static {
    /// Wait for the next interrupt. `None` means the source is exhausted.
    fn next_interrupt(&mut self) -> Pin<Box<dyn Future<Output = Option<Interrupt>> + Send + '_>>;
}

impl InterruptSource for mpsc::Receiver<Interrupt> {
    fn next_interrupt(&mut self) -> Pin<Box<dyn Future<Output = Option<Interrupt>> + Send + '_>> {
        Box::pin(self.recv())
    }
}

/// SIGINT + SIGTERM on Unix, Ctrl-C elsewhere.
pub struct OsInterrupts {
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
}

impl OsInterrupts {
    /// Register the OS handlers. Must be called inside a Tokio runtime.
    #[cfg(unix)]
    pub fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {})
    }
}

impl InterruptSource for OsInterrupts {
    #[cfg(unix)]
    fn next_interrupt(&mut self) -> Pin<Box<dyn Future<Output = Option<Interrupt>> + Send + '_>> {
        Box::pin(async move {
            tokio::select! {
                sig = self.sigint.recv() => sig.map(|_| Interrupt::Interrupt),
                sig = self.sigterm.recv() => sig.map(|_| Interrupt::Terminate),
            }
        })
    }

    #[cfg(not(unix))]
    fn next_interrupt(&mut self) -> Pin<Box<dyn Future<Output = Option<Interrupt>> + Send + '_>> {
        Box::pin(async move {
            tokio::signal::ctrl_c().await.ok().map(|_| Interrupt::Interrupt)
        })
    }
}

/// A source that never yields; used when OS registration fails.
struct NoInterrupts;

impl InterruptSource for NoInterrupts {
    fn next_interrupt(&mut self) -> Pin<Box<dyn Future<Output = Option<Interrupt>> + Send + '_>> {
        Box::pin(std::future::pending())
    }
}

/// Shared state behind the two broadcasts.
#[derive(Debug, Default)]
struct Broadcast {
    stop: CancellationToken,
    force: CancellationToken,
    stop_fired: AtomicBool,
    force_fired: AtomicBool,
}

impl Broadcast {
    /// Returns `true` for exactly one caller, however many race.
    fn fire_stop(&self) -> bool {
        if self.stop_fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.stop.cancel();
        true
    }

    /// Fires force (once) and makes sure stop is fired too.
    fn fire_force(&self) -> bool {
        let first = !self.force_fired.swap(true, Ordering::AcqRel);
        if first {
            self.force.cancel();
        }
        self.fire_stop();
        first
    }
}

/// Read-only view of the stop/force broadcasts.
#[derive(Debug, Clone)]
pub struct StopSignals {
    stop: CancellationToken,
    force: CancellationToken,
}

impl StopSignals {
    /// Signals that are never fired (setup/shutdown phases).
    pub fn never() -> Self {
        Self {
            stop: CancellationToken::new(),
            force: CancellationToken::new(),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    pub fn is_forced(&self) -> bool {
        self.force.is_cancelled()
    }

    /// Resolves once the graceful stop has been fired.
    pub async fn stopped(&self) {
        self.stop.cancelled().await
    }

    /// Resolves once the force broadcast has been fired.
    pub async fn forced(&self) {
        self.force.cancelled().await
    }

    /// Sleep for `delay` unless stop fires first.
    ///
    /// Returns `true` if the sleep was preempted by the stop broadcast.
    pub async fn sleep(&self, delay: Duration) -> bool {
        if delay.is_zero() {
            return self.is_stopped();
        }
        tokio::select! {
            _ = self.stop.cancelled() => true,
            _ = tokio::time::sleep(delay) => false,
        }
    }
}

/// Cloneable handle that can fire the graceful stop.
#[derive(Debug, Clone)]
pub struct StopRequester {
    inner: Arc<Broadcast>,
}

impl StopRequester {
    /// Fire the stop broadcast. Returns `true` only for the call that fired it.
    pub fn request_stop(&self) -> bool {
        self.inner.fire_stop()
    }
}

/// Signal escalation manager; one per run.
pub struct TerminationCoordinator {
    inner: Arc<Broadcast>,
    shutdown: CancellationToken,
    done: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for TerminationCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminationCoordinator")
            .field("stopped", &self.inner.stop.is_cancelled())
            .field("forced", &self.inner.force.is_cancelled())
            .field("listening", &!self.done.is_cancelled())
            .finish()
    }
}

impl TerminationCoordinator {
    /// Listen for SIGINT/SIGTERM.
    ///
    /// If the OS handlers cannot be registered the coordinator still works
    /// for explicit stop requests; the failure is logged.
    pub fn new(handler: Option<InterruptHandler>) -> Self {
        match OsInterrupts::new() {
            Ok(source) => Self::with_source(source, handler),
            Err(e) => {
                warn!(error = %e, "failed to register signal handlers; interrupts will not be handled");
                Self::with_source(NoInterrupts, handler)
            }
        }
    }

    /// Listen on an arbitrary interrupt source. Must be called inside a Tokio
    /// runtime; the listener is spawned immediately.
    pub fn with_source<S: InterruptSource>(source: S, handler: Option<InterruptHandler>) -> Self {
        Self::with_abort_hook(source, handler, Arc::new(exit_process))
    }

    /// Like [`with_source`](Self::with_source), with a custom action for
    /// interrupts arriving after force.
    pub fn with_abort_hook<S: InterruptSource>(
        source: S,
        handler: Option<InterruptHandler>,
        abort: AbortHook,
    ) -> Self {
        let inner = Arc::new(Broadcast::default());
        let shutdown = CancellationToken::new();
        let done = CancellationToken::new();

        let handle = tokio::spawn(listen(
            source,
            handler,
            abort,
            Arc::clone(&inner),
            shutdown.clone(),
            done.clone(),
        ));

        Self {
            inner,
            shutdown,
            done,
            listener: Mutex::new(Some(handle)),
        }
    }

    pub fn signals(&self) -> StopSignals {
        StopSignals {
            stop: self.inner.stop.clone(),
            force: self.inner.force.clone(),
        }
    }

    pub fn stop_requester(&self) -> StopRequester {
        StopRequester {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Fire the graceful stop. Idempotent; `true` only for the firing call.
    pub fn request_stop(&self) -> bool {
        self.inner.fire_stop()
    }

    /// Fire force (and stop) without an external interrupt.
    pub fn force(&self) -> bool {
        self.inner.fire_force()
    }

    /// Request stop, tear the listener down and wait for it to finish.
    ///
    /// Safe to call more than once and from several tasks.
    pub async fn shutdown(&self) {
        self.request_stop();
        self.shutdown.cancel();

        let handle = match self.listener.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "termination listener ended abnormally");
            }
        }

        self.done.cancelled().await;
    }
}

async fn listen<S: InterruptSource>(
    mut source: S,
    handler: Option<InterruptHandler>,
    abort: AbortHook,
    inner: Arc<Broadcast>,
    shutdown: CancellationToken,
    done: CancellationToken,
) {
    let _finished = done.drop_guard();
    let mut first_handled = false;

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                debug!("termination listener shutting down");
                return;
            }

            next = source.next_interrupt() => {
                let Some(sig) = next else {
                    debug!("interrupt source closed; waiting for shutdown");
                    shutdown.cancelled().await;
                    return;
                };

                if inner.force.is_cancelled() {
                    abort(sig);
                } else if !first_handled {
                    if let Some(handler) = &handler {
                        handler(sig, false);
                    }
                    inner.fire_stop();
                    first_handled = true;
                } else {
                    if let Some(handler) = &handler {
                        handler(sig, true);
                    }
                    inner.fire_force();
                }
            }
        }
    }
}
