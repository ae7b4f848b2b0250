// src/output/mod.rs

//! Output routing.
//!
//! Every command's stdout/stderr lines and the process-wide system log go
//! through an [`OutputRouter`]. Two backends exist:
//!
//! - [`console`]: one shared stdout stream, prefixed lines; stderr for the
//!   system log. Completion is a join counter over running producers.
//! - [`multipane`]: one scrolling region per command plus a base region for
//!   the system log, driven by a dedicated render thread fed through a
//!   single update queue.
//!
//! The backends differ in what `wait` means: the console waits for every
//! producer to call `done`; the multi-pane display waits for its render loop
//! to end and ignores `add`/`done`.

pub mod console;
pub mod multipane;
pub mod palette;

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use colored::Color;
use tracing_subscriber::fmt::MakeWriter;

use crate::config::CommandSpec;

pub use console::ConsoleRouter;
pub use multipane::MultiPaneRouter;
pub use palette::{PanelAppearance, Palette};

/// Name of the base region that carries the system log.
pub const BASE_PANEL_NAME: &str = "procmux";

/// Appends one already-terminated line (without the trailing newline).
pub type LineWriter = Arc<dyn Fn(&str) + Send + Sync>;

/// A writable stream shared between producers; each write holds the lock for
/// the whole buffer so lines never tear.
#[derive(Clone)]
pub struct SharedStream(Arc<Mutex<Box<dyn Write + Send>>>);

impl SharedStream {
    pub fn new(inner: Box<dyn Write + Send>) -> Self {
        Self(Arc::new(Mutex::new(inner)))
    }

    /// Write `buf` in one locked call and flush.
    pub fn write_atomic(&self, buf: &[u8]) -> io::Result<()> {
        let mut guard = match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.write_all(buf)?;
        guard.flush()
    }
}

impl Write for SharedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_atomic(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The process-wide system-log sink.
///
/// Implements [`MakeWriter`] so it can back the `tracing` subscriber.
#[derive(Clone)]
pub enum BaseWriter {
    Console(SharedStream),
    Pane(multipane::PaneWriter),
}

impl Write for BaseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            BaseWriter::Console(stream) => stream.write(buf),
            BaseWriter::Pane(pane) => pane.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            BaseWriter::Console(stream) => stream.flush(),
            BaseWriter::Pane(pane) => pane.flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for BaseWriter {
    type Writer = BaseWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Closed set of output backends behind one capability surface.
#[derive(Clone)]
pub enum OutputRouter {
    Console(Arc<ConsoleRouter>),
    MultiPane(Arc<MultiPaneRouter>),
}

impl OutputRouter {
    /// Build the backend selected by `enableTUI`.
    ///
    /// The multi-pane backend takes over the terminal immediately; failure to
    /// do so is an initialization error.
    pub fn new(enable_tui: bool, commands: &[CommandSpec], palette: &Palette) -> io::Result<Self> {
        if !enable_tui {
            return Ok(OutputRouter::Console(Arc::new(ConsoleRouter::new())));
        }
        let names: Vec<String> = commands.iter().map(|c| c.name.clone()).collect();
        let styles = palette.panel_styles(&names, BASE_PANEL_NAME);
        let router = MultiPaneRouter::start(BASE_PANEL_NAME, &names, &styles)?;
        Ok(OutputRouter::MultiPane(Arc::new(router)))
    }

    pub fn is_multi_pane(&self) -> bool {
        matches!(self, OutputRouter::MultiPane(_))
    }

    pub fn base_writer(&self) -> BaseWriter {
        match self {
            OutputRouter::Console(c) => c.base_writer(),
            OutputRouter::MultiPane(m) => m.base_writer(),
        }
    }

    /// A writer appending `prefix + line` to the display target of `name`.
    ///
    /// The prefix is colourised when `color` is given.
    pub fn line_writer(&self, name: &str, color: Option<Color>, prefix: &str) -> LineWriter {
        match self {
            OutputRouter::Console(c) => c.line_writer(name, color, prefix),
            OutputRouter::MultiPane(m) => m.line_writer(name, color, prefix),
        }
    }

    /// `(stdout_prefix, stderr_prefix)` for a main command.
    ///
    /// Panes are titled with the command name, so the multi-pane backend only
    /// marks stderr.
    pub fn command_prefixes(&self, name: &str) -> (String, String) {
        match self {
            OutputRouter::Console(_) => (format!("[{name}] "), format!("[{name} stderr] ")),
            OutputRouter::MultiPane(_) => (String::new(), "[stderr] ".to_string()),
        }
    }

    pub fn add(&self) {
        match self {
            OutputRouter::Console(c) => c.add(),
            OutputRouter::MultiPane(m) => m.add(),
        }
    }

    pub fn done(&self) {
        match self {
            OutputRouter::Console(c) => c.done(),
            OutputRouter::MultiPane(m) => m.done(),
        }
    }

    /// Console: until every `add` has a matching `done`.
    /// MultiPane: until the render loop has terminated.
    pub async fn wait(&self) {
        match self {
            OutputRouter::Console(c) => c.wait().await,
            OutputRouter::MultiPane(m) => m.wait().await,
        }
    }

    pub fn stop(&self) {
        match self {
            OutputRouter::Console(c) => c.stop(),
            OutputRouter::MultiPane(m) => m.stop(),
        }
    }

    /// `add` now, `done` when the guard drops.
    pub fn track(&self) -> ProducerGuard {
        self.add();
        ProducerGuard {
            router: self.clone(),
        }
    }
}

/// Calls [`OutputRouter::done`] on drop, including on panic unwind.
pub struct ProducerGuard {
    router: OutputRouter,
}

impl Drop for ProducerGuard {
    fn drop(&mut self) {
        self.router.done();
    }
}
